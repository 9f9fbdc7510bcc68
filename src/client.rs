use crate::error::ServiceError;
use crate::measurement::{MeasurementRecord, MeasurementSet};
use crate::session::{Credentials, Session};
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolDescriptor {
    pub pool_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub serial: String,
    pub name: Option<String>,
}

/// The remote measurement service as the client sees it. Implementations
/// own transport, signing and payload decoding.
#[async_trait]
pub trait PoolService: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Credentials, ServiceError>;

    async fn list_pools(
        &self,
        credentials: &Credentials,
    ) -> Result<Vec<PoolDescriptor>, ServiceError>;

    async fn list_devices(
        &self,
        credentials: &Credentials,
        pool_id: &str,
    ) -> Result<Vec<DeviceDescriptor>, ServiceError>;

    /// Ordered temperature, pH, ORP, salinity; the service may append more.
    async fn latest_measurements(
        &self,
        credentials: &Credentials,
        pool_id: &str,
        device_serial: &str,
    ) -> Result<Vec<MeasurementRecord>, ServiceError>;
}

pub struct MeasurementClient {
    service: Arc<dyn PoolService>,
    session: Arc<Session>,
}

impl MeasurementClient {
    pub fn new(service: Arc<dyn PoolService>, session: Arc<Session>) -> Self {
        Self { service, session }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Logs in unless the session already holds valid credentials. Failures
    /// are recorded on the session rather than returned; check
    /// [`Self::is_authenticated`] afterwards.
    pub async fn ensure_authenticated(&self, email: &str, password: &str) {
        if self.session.is_authenticated() {
            return;
        }

        let _gate = self.session.login_gate().await;
        // Another read may have finished logging in while this one waited.
        if self.session.is_authenticated() {
            return;
        }

        match self.service.login(email, password).await {
            Ok(credentials) => {
                tracing::info!(
                    expires_at = ?credentials.expires_at,
                    "authenticated against Blue Riiot"
                );
                self.session.mark_authenticated(credentials);
            }
            Err(err) => {
                tracing::warn!(error = %err, "Blue Riiot login failed");
                self.session.mark_failed(err.to_string());
            }
        }
    }

    /// First pool on the account. Discovery aid only; the caller persists it.
    pub async fn discover_pool_id(&self) -> Result<PoolDescriptor, ServiceError> {
        let credentials = self.credentials()?;
        self.service
            .list_pools(&credentials)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::Empty("swimming pools"))
    }

    /// First Blue device attached to the pool.
    pub async fn discover_device_serial(
        &self,
        pool_id: &str,
    ) -> Result<DeviceDescriptor, ServiceError> {
        let credentials = self.credentials()?;
        self.service
            .list_devices(&credentials, pool_id)
            .await?
            .into_iter()
            .next()
            .ok_or(ServiceError::Empty("blue devices"))
    }

    pub async fn fetch_latest_measurements(
        &self,
        pool_id: &str,
        device_serial: &str,
    ) -> Result<MeasurementSet, ServiceError> {
        let credentials = self.credentials()?;
        let records = self
            .service
            .latest_measurements(&credentials, pool_id, device_serial)
            .await?;
        MeasurementSet::from_records(records)
    }

    fn credentials(&self) -> Result<Credentials, ServiceError> {
        self.session
            .credentials()
            .ok_or(ServiceError::NotAuthenticated)
    }
}
