use crate::client::{DeviceDescriptor, PoolDescriptor, PoolService};
use crate::error::ServiceError;
use crate::measurement::MeasurementRecord;
use crate::session::Credentials;
use crate::sigv4;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.riiotlabs.com/prod/";
pub const DEFAULT_API_REGION: &str = "eu-west-1";
const API_SERVICE: &str = "execute-api";
const MEASUREMENT_MODE: &str = "blue_and_strip";
const ERROR_BODY_LIMIT: usize = 256;

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    credentials: Option<CredentialsPayload>,
}

#[derive(Deserialize)]
struct CredentialsPayload {
    access_key: String,
    secret_key: String,
    session_token: String,
    #[serde(default)]
    expiration: Option<String>,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

#[derive(Deserialize)]
struct NamedEntry {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct PoolEntry {
    swimming_pool_id: String,
    #[serde(default)]
    swimming_pool: Option<NamedEntry>,
}

#[derive(Deserialize)]
struct DeviceEntry {
    blue_device_serial: String,
    #[serde(default)]
    blue_device: Option<NamedEntry>,
}

/// Blue Riiot cloud API: JSON login, then SigV4-signed GETs.
pub struct BlueRiiotApi {
    http: Client,
    base_url: Url,
    region: String,
}

impl BlueRiiotApi {
    pub fn new(http: Client, base_url: Url, region: impl Into<String>) -> Self {
        Self {
            http,
            base_url,
            region: region.into(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ServiceError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn signed_get(
        &self,
        credentials: &Credentials,
        mut url: Url,
        query: &[(&str, &str)],
    ) -> Result<String, ServiceError> {
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        let headers = sigv4::sign_get(&url, credentials, &self.region, API_SERVICE, Utc::now());

        let mut request = self.http.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }
        let response = request.send().await?;
        read_body(response).await
    }
}

#[async_trait]
impl PoolService for BlueRiiotApi {
    async fn login(&self, email: &str, password: &str) -> Result<Credentials, ServiceError> {
        let url = self.endpoint(&["user", "login"])?;
        let response = self
            .http
            .post(url)
            .json(&LoginRequest { email, password })
            .send()
            .await?;
        let body = read_body(response).await?;
        decode_credentials(body)
    }

    async fn list_pools(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PoolDescriptor>, ServiceError> {
        let url = self.endpoint(&["swimming_pool"])?;
        let body = self.signed_get(credentials, url, &[]).await?;
        decode_pools(body)
    }

    async fn list_devices(
        &self,
        credentials: &Credentials,
        pool_id: &str,
    ) -> Result<Vec<DeviceDescriptor>, ServiceError> {
        let url = self.endpoint(&["swimming_pool", pool_id, "blue"])?;
        let body = self.signed_get(credentials, url, &[]).await?;
        decode_devices(body)
    }

    async fn latest_measurements(
        &self,
        credentials: &Credentials,
        pool_id: &str,
        device_serial: &str,
    ) -> Result<Vec<MeasurementRecord>, ServiceError> {
        let url = self.endpoint(&[
            "swimming_pool",
            pool_id,
            "blue",
            device_serial,
            "lastMeasurements",
        ])?;
        let body = self
            .signed_get(credentials, url, &[("mode", MEASUREMENT_MODE)])
            .await?;
        decode_measurements(body)
    }
}

async fn read_body(response: Response) -> Result<String, ServiceError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        let mut body = body;
        if body.len() > ERROR_BODY_LIMIT {
            let mut cut = ERROR_BODY_LIMIT;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(ServiceError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

fn decode<T: DeserializeOwned>(what: &'static str, body: String) -> Result<T, ServiceError> {
    let mut bytes = body.into_bytes();
    simd_json::serde::from_slice(&mut bytes).map_err(|err| ServiceError::Decode {
        what,
        message: err.to_string(),
    })
}

fn decode_credentials(body: String) -> Result<Credentials, ServiceError> {
    let payload: LoginResponse = decode("login", body)?;
    let credentials = payload
        .credentials
        .ok_or_else(|| ServiceError::Login("response carried no credentials".to_string()))?;
    let expires_at = credentials.expiration.as_deref().and_then(parse_timestamp);
    Ok(Credentials {
        access_key: credentials.access_key,
        secret_key: credentials.secret_key,
        session_token: credentials.session_token,
        expires_at,
    })
}

fn decode_pools(body: String) -> Result<Vec<PoolDescriptor>, ServiceError> {
    let envelope: DataEnvelope<PoolEntry> = decode("swimming pools", body)?;
    Ok(envelope
        .data
        .into_iter()
        .map(|entry| PoolDescriptor {
            pool_id: entry.swimming_pool_id,
            name: entry.swimming_pool.and_then(|pool| non_empty(pool.name)),
        })
        .collect())
}

fn decode_devices(body: String) -> Result<Vec<DeviceDescriptor>, ServiceError> {
    let envelope: DataEnvelope<DeviceEntry> = decode("blue devices", body)?;
    Ok(envelope
        .data
        .into_iter()
        .map(|entry| DeviceDescriptor {
            serial: entry.blue_device_serial,
            name: entry.blue_device.and_then(|device| non_empty(device.name)),
        })
        .collect())
}

fn decode_measurements(body: String) -> Result<Vec<MeasurementRecord>, ServiceError> {
    let envelope: DataEnvelope<MeasurementRecord> = decode("last measurements", body)?;
    Ok(envelope.data)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
