use crate::client::{DeviceDescriptor, PoolDescriptor, PoolService};
use crate::error::ServiceError;
use crate::measurement::MeasurementRecord;
use crate::session::Credentials;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn record(
    name: &str,
    value: f64,
    ok_min: f64,
    ok_max: f64,
    warning_low: f64,
    warning_high: f64,
) -> MeasurementRecord {
    MeasurementRecord {
        name: name.to_string(),
        value,
        ok_min,
        ok_max,
        warning_low,
        warning_high,
    }
}

/// Everything inside its ok band, temperature outside the excellent window.
pub fn healthy_records() -> Vec<MeasurementRecord> {
    vec![
        record("temperature", 25.0, 18.0, 28.0, 15.0, 30.0),
        record("ph", 7.0, 6.8, 7.6, 6.5, 7.8),
        record("orp", 700.0, 650.0, 750.0, 600.0, 780.0),
        record("salinity", 3.0, 2.5, 4.0, 2.0, 4.5),
    ]
}

/// A heated pool whose temperature band contains the excellent window.
pub fn warm_records(temperature: f64, ph: f64) -> Vec<MeasurementRecord> {
    vec![
        record("temperature", temperature, 26.0, 32.0, 20.0, 35.0),
        record("ph", ph, 6.8, 7.6, 6.5, 7.8),
        record("orp", 700.0, 650.0, 750.0, 600.0, 780.0),
        record("salinity", 3.0, 2.5, 4.0, 2.0, 4.5),
    ]
}

pub fn credentials_expiring_at(expires_at: Option<DateTime<Utc>>) -> Credentials {
    Credentials {
        access_key: "AKIDEXAMPLE".to_string(),
        secret_key: "secret-key-example".to_string(),
        session_token: "session-token-example".to_string(),
        expires_at,
    }
}

/// Scripted in-memory service that counts calls per operation.
pub struct FakeService {
    login_failure: Option<String>,
    fetch_failure: Option<String>,
    pools: Vec<String>,
    devices: Vec<String>,
    records: Vec<MeasurementRecord>,
    login_calls: AtomicUsize,
    pool_calls: AtomicUsize,
    device_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
}

impl FakeService {
    pub fn new() -> Self {
        Self {
            login_failure: None,
            fetch_failure: None,
            pools: vec!["pool-a".to_string()],
            devices: vec!["serial-a".to_string()],
            records: healthy_records(),
            login_calls: AtomicUsize::new(0),
            pool_calls: AtomicUsize::new(0),
            device_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_login_failure(mut self, message: &str) -> Self {
        self.login_failure = Some(message.to_string());
        self
    }

    pub fn with_fetch_failure(mut self, message: &str) -> Self {
        self.fetch_failure = Some(message.to_string());
        self
    }

    pub fn with_pools(mut self, pools: &[&str]) -> Self {
        self.pools = pools.iter().map(|pool| pool.to_string()).collect();
        self
    }

    pub fn with_devices(mut self, devices: &[&str]) -> Self {
        self.devices = devices.iter().map(|device| device.to_string()).collect();
        self
    }

    pub fn with_records(mut self, records: Vec<MeasurementRecord>) -> Self {
        self.records = records;
        self
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn pool_calls(&self) -> usize {
        self.pool_calls.load(Ordering::SeqCst)
    }

    pub fn device_calls(&self) -> usize {
        self.device_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PoolService for FakeService {
    async fn login(&self, _email: &str, _password: &str) -> Result<Credentials, ServiceError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        // Let overlapping reads reach the login gate.
        tokio::task::yield_now().await;
        match &self.login_failure {
            Some(message) => Err(ServiceError::Login(message.clone())),
            None => Ok(credentials_expiring_at(None)),
        }
    }

    async fn list_pools(
        &self,
        _credentials: &Credentials,
    ) -> Result<Vec<PoolDescriptor>, ServiceError> {
        self.pool_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .pools
            .iter()
            .map(|pool_id| PoolDescriptor {
                pool_id: pool_id.clone(),
                name: Some("Backyard".to_string()),
            })
            .collect())
    }

    async fn list_devices(
        &self,
        _credentials: &Credentials,
        _pool_id: &str,
    ) -> Result<Vec<DeviceDescriptor>, ServiceError> {
        self.device_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .devices
            .iter()
            .map(|serial| DeviceDescriptor {
                serial: serial.clone(),
                name: None,
            })
            .collect())
    }

    async fn latest_measurements(
        &self,
        _credentials: &Credentials,
        _pool_id: &str,
        _device_serial: &str,
    ) -> Result<Vec<MeasurementRecord>, ServiceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        match &self.fetch_failure {
            Some(message) => Err(ServiceError::Status {
                status: 504,
                body: message.clone(),
            }),
            None => Ok(self.records.clone()),
        }
    }
}
