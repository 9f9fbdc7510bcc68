//! AWS Signature Version 4 for the GET requests the Blue Riiot API gateway
//! accepts with the temporary credentials handed out at login.

use crate::session::Credentials;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SIGNED_HEADERS: &str = "host;x-amz-date;x-amz-security-token";

pub const HEADER_AMZ_DATE: &str = "x-amz-date";
pub const HEADER_SECURITY_TOKEN: &str = "x-amz-security-token";
pub const HEADER_AUTHORIZATION: &str = "authorization";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub security_token: String,
    pub authorization: String,
}

impl SignedHeaders {
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (HEADER_AMZ_DATE, self.amz_date.as_str()),
            (HEADER_SECURITY_TOKEN, self.security_token.as_str()),
            (HEADER_AUTHORIZATION, self.authorization.as_str()),
        ]
        .into_iter()
    }
}

pub fn sign_get(
    url: &Url,
    credentials: &Credentials,
    region: &str,
    service: &str,
    now: DateTime<Utc>,
) -> SignedHeaders {
    let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = now.format("%Y%m%d").to_string();
    let scope = format!("{date}/{region}/{service}/aws4_request");

    let canonical_request = canonical_request(url, &amz_date, &credentials.session_token);
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );
    let key = signing_key(&credentials.secret_key, &date, region, service);
    let signature = hex::encode(hmac_sha256(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={SIGNED_HEADERS}, Signature={signature}",
            credentials.access_key
        ),
        amz_date,
        security_token: credentials.session_token.clone(),
    }
}

fn canonical_request(url: &Url, amz_date: &str, session_token: &str) -> String {
    let path = canonical_path(url);
    let payload_hash = hex::encode(Sha256::digest(b""));
    format!(
        "GET\n{path}\n{}\nhost:{}\nx-amz-date:{amz_date}\nx-amz-security-token:{session_token}\n\n{SIGNED_HEADERS}\n{payload_hash}",
        canonical_query(url),
        canonical_host(url),
    )
}

/// Each segment of the request path, as sent, is encoded once more: a `:` in
/// a device serial goes out raw and signs as `%3A`, a space goes out as `%20`
/// and signs as `%2520`.
fn canonical_path(url: &Url) -> String {
    match url.path() {
        "" | "/" => "/".to_string(),
        path => path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/"),
    }
}

fn canonical_host(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn canonical_query(url: &Url) -> String {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            (
                urlencoding::encode(&key).into_owned(),
                urlencoding::encode(&value).into_owned(),
            )
        })
        .collect();
    pairs.sort();
    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

pub(crate) fn signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(format!("AWS4{secret_key}").as_bytes(), date.as_bytes());
    let region_key = hmac_sha256(&date_key, region.as_bytes());
    let service_key = hmac_sha256(&region_key, service.as_bytes());
    hmac_sha256(&service_key, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
