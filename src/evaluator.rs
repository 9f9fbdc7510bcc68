use crate::client::MeasurementClient;
use crate::error::{ReadFailure, ServiceError};
use crate::measurement::{MeasurementSet, MetricKind};
use crate::quality::{classify, QualityLevel};
use crate::reading::{PendingIdentifier, Reading};
use std::sync::Arc;

#[derive(Clone)]
pub struct Account {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Configured identifiers. Unset ones are rediscovered on every read; the
/// evaluator never caches a discovered value.
#[derive(Debug, Clone, Default)]
pub struct Identifiers {
    pub pool_id: Option<String>,
    pub device_serial: Option<String>,
}

/// Answers characteristic reads: one scaled metric, or the air-quality
/// classification of all four.
pub struct QualityEvaluator {
    client: Arc<MeasurementClient>,
    account: Account,
    identifiers: Identifiers,
    debug: bool,
}

impl QualityEvaluator {
    pub fn new(
        client: Arc<MeasurementClient>,
        account: Account,
        identifiers: Identifiers,
        debug: bool,
    ) -> Self {
        Self {
            client,
            account,
            identifiers,
            debug,
        }
    }

    pub async fn read_metric(&self, kind: MetricKind) -> Reading<f64> {
        if self.debug {
            tracing::info!(metric = %kind, pool_id = ?self.identifiers.pool_id, "metric read requested");
        }
        let debug = self.debug;
        self.read_measurements().await.map(|set| {
            let record = set.get(kind);
            if debug {
                tracing::info!(
                    position = kind.position(),
                    name = %record.name,
                    value = record.value,
                    "metric read"
                );
            }
            set.scaled_value(kind)
        })
    }

    pub async fn read_air_quality(&self) -> Reading<QualityLevel> {
        if self.debug {
            tracing::info!(pool_id = ?self.identifiers.pool_id, "air quality read requested");
        }
        self.read_measurements().await.map(|set| classify(&set))
    }

    /// Scaled metric value, or the sentinel 0 on any failure or pending
    /// discovery.
    pub async fn metric(&self, kind: MetricKind) -> f64 {
        self.read_metric(kind).await.value_or_sentinel()
    }

    /// Air-quality characteristic code, or the sentinel 0 (unknown).
    pub async fn air_quality(&self) -> u8 {
        self.read_air_quality().await.code_or_sentinel()
    }

    async fn read_measurements(&self) -> Reading<MeasurementSet> {
        self.client
            .ensure_authenticated(&self.account.email, &self.account.password)
            .await;
        if !self.client.is_authenticated() {
            let reason = self
                .client
                .session()
                .last_error()
                .unwrap_or_else(|| "login did not complete".to_string());
            tracing::error!(error = %reason, "not signed in to Blue Riiot; returning sentinel");
            return Reading::Unavailable(ReadFailure::Authentication(reason));
        }

        let Some(pool_id) = self.identifiers.pool_id.as_deref() else {
            tracing::warn!("no swimming pool id configured; discovering");
            return match self.client.discover_pool_id().await {
                Ok(pool) => {
                    tracing::warn!(
                        pool_id = %pool.pool_id,
                        name = ?pool.name,
                        "add to config: \"swimmingpoolid\": \"{}\"",
                        pool.pool_id
                    );
                    Reading::Pending(PendingIdentifier::PoolId {
                        discovered: pool.pool_id,
                    })
                }
                Err(err) => fetch_failed("swimming pool discovery", err),
            };
        };

        let Some(device_serial) = self.identifiers.device_serial.as_deref() else {
            tracing::warn!(pool_id = %pool_id, "no Blue device serial configured; discovering");
            return match self.client.discover_device_serial(pool_id).await {
                Ok(device) => {
                    tracing::warn!(
                        serial = %device.serial,
                        name = ?device.name,
                        "add to config: \"bluedeviceserial\": \"{}\"",
                        device.serial
                    );
                    Reading::Pending(PendingIdentifier::DeviceSerial {
                        discovered: device.serial,
                    })
                }
                Err(err) => fetch_failed("Blue device discovery", err),
            };
        };

        match self
            .client
            .fetch_latest_measurements(pool_id, device_serial)
            .await
        {
            Ok(set) => Reading::Value(set),
            Err(err) => fetch_failed("latest measurements", err),
        }
    }
}

fn fetch_failed<T>(stage: &'static str, err: ServiceError) -> Reading<T> {
    tracing::error!(stage, error = %err, "Blue Riiot request failed; returning sentinel");
    Reading::Unavailable(ReadFailure::Fetch(format!("{stage}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reading::SENTINEL_CODE;
    use crate::session::Session;
    use crate::test_support::{healthy_records, record, warm_records, FakeService};

    fn evaluator(fake: &Arc<FakeService>, identifiers: Identifiers) -> QualityEvaluator {
        let client = Arc::new(MeasurementClient::new(fake.clone(), Arc::new(Session::new())));
        QualityEvaluator::new(
            client,
            Account {
                email: "me@example.com".to_string(),
                password: "secret".to_string(),
            },
            identifiers,
            true,
        )
    }

    fn configured() -> Identifiers {
        Identifiers {
            pool_id: Some("pool-a".to_string()),
            device_serial: Some("serial-a".to_string()),
        }
    }

    #[tokio::test]
    async fn metrics_scale_ph_and_salinity() {
        let fake = Arc::new(FakeService::new().with_records(healthy_records()));
        let evaluator = evaluator(&fake, configured());

        assert_eq!(evaluator.metric(MetricKind::Temperature).await, 25.0);
        assert_eq!(evaluator.metric(MetricKind::Ph).await, 70.0);
        assert_eq!(
            evaluator
                .metric(MetricKind::OxidationReductionPotential)
                .await,
            700.0
        );
        assert_eq!(evaluator.metric(MetricKind::Salinity).await, 30.0);
        assert_eq!(fake.login_calls(), 1);
        assert_eq!(fake.fetch_calls(), 4);
    }

    #[tokio::test]
    async fn air_quality_scenarios() {
        let poor = vec![
            record("temperature", 14.0, 18.0, 28.0, 15.0, 30.0),
            record("ph", 7.0, 6.8, 7.6, 6.5, 7.8),
            record("orp", 700.0, 650.0, 750.0, 600.0, 780.0),
            record("salinity", 3.0, 2.5, 4.0, 2.0, 4.5),
        ];
        let fake = Arc::new(FakeService::new().with_records(poor));
        assert_eq!(
            evaluator(&fake, configured()).read_air_quality().await,
            Reading::Value(QualityLevel::Poor)
        );

        let fake = Arc::new(FakeService::new().with_records(warm_records(30.0, 7.2)));
        assert_eq!(
            evaluator(&fake, configured()).read_air_quality().await,
            Reading::Value(QualityLevel::Excellent)
        );

        let fake = Arc::new(FakeService::new().with_records(healthy_records()));
        let evaluator = evaluator(&fake, configured());
        assert_eq!(
            evaluator.read_air_quality().await,
            Reading::Value(QualityLevel::Good)
        );
        assert_eq!(evaluator.air_quality().await, 2);
    }

    #[tokio::test]
    async fn failed_login_returns_sentinel_without_fetching() {
        let fake = Arc::new(
            FakeService::new()
                .with_login_failure("invalid credentials")
                .with_records(healthy_records()),
        );
        let evaluator = evaluator(&fake, configured());

        for kind in MetricKind::ALL {
            assert_eq!(evaluator.metric(kind).await, 0.0);
        }
        assert_eq!(evaluator.air_quality().await, SENTINEL_CODE);
        assert!(matches!(
            evaluator.read_air_quality().await,
            Reading::Unavailable(ReadFailure::Authentication(_))
        ));
        assert_eq!(fake.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn missing_pool_id_discovers_and_defers() {
        let fake = Arc::new(
            FakeService::new()
                .with_pools(&["pool-z"])
                .with_records(healthy_records()),
        );
        let evaluator = evaluator(
            &fake,
            Identifiers {
                pool_id: None,
                device_serial: Some("serial-a".to_string()),
            },
        );

        let reading = evaluator.read_metric(MetricKind::Temperature).await;
        assert_eq!(
            reading,
            Reading::Pending(PendingIdentifier::PoolId {
                discovered: "pool-z".to_string()
            })
        );
        assert_eq!(reading.value_or_sentinel(), 0.0);
        assert_eq!(fake.pool_calls(), 1);
        assert_eq!(fake.fetch_calls(), 0);

        // Discovery is not cached: the next read discovers again.
        evaluator.read_air_quality().await;
        assert_eq!(fake.pool_calls(), 2);
    }

    #[tokio::test]
    async fn missing_device_serial_discovers_and_defers() {
        let fake = Arc::new(
            FakeService::new()
                .with_devices(&["serial-z"])
                .with_records(healthy_records()),
        );
        let evaluator = evaluator(
            &fake,
            Identifiers {
                pool_id: Some("pool-a".to_string()),
                device_serial: None,
            },
        );

        assert_eq!(
            evaluator.read_air_quality().await,
            Reading::Pending(PendingIdentifier::DeviceSerial {
                discovered: "serial-z".to_string()
            })
        );
        assert_eq!(evaluator.air_quality().await, SENTINEL_CODE);
        assert_eq!(fake.pool_calls(), 0);
        assert_eq!(fake.device_calls(), 2);
        assert_eq!(fake.fetch_calls(), 0);
    }

    #[tokio::test]
    async fn failed_discovery_is_unavailable() {
        let fake = Arc::new(FakeService::new().with_pools(&[]));
        let evaluator = evaluator(&fake, Identifiers::default());

        assert!(matches!(
            evaluator.read_metric(MetricKind::Ph).await,
            Reading::Unavailable(ReadFailure::Fetch(_))
        ));
    }

    #[tokio::test]
    async fn fetch_errors_return_sentinel() {
        let fake = Arc::new(FakeService::new().with_fetch_failure("gateway timeout"));
        let evaluator = evaluator(&fake, configured());

        assert_eq!(evaluator.metric(MetricKind::Salinity).await, 0.0);
        assert_eq!(evaluator.air_quality().await, SENTINEL_CODE);
        assert!(evaluator.client.is_authenticated());
    }

    #[tokio::test]
    async fn short_or_inverted_measurements_return_sentinel() {
        let mut short = healthy_records();
        short.pop();
        let fake = Arc::new(FakeService::new().with_records(short));
        assert_eq!(
            evaluator(&fake, configured())
                .metric(MetricKind::Temperature)
                .await,
            0.0
        );

        let mut inverted = healthy_records();
        inverted[0].warning_low = 40.0;
        let fake = Arc::new(FakeService::new().with_records(inverted));
        let reading = evaluator(&fake, configured()).read_air_quality().await;
        assert!(matches!(reading, Reading::Unavailable(ReadFailure::Fetch(_))));
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_login() {
        let fake = Arc::new(FakeService::new().with_records(healthy_records()));
        let evaluator = evaluator(&fake, configured());

        let (quality, ph, orp) = tokio::join!(
            evaluator.air_quality(),
            evaluator.metric(MetricKind::Ph),
            evaluator.metric(MetricKind::OxidationReductionPotential),
        );

        assert_eq!(quality, 2);
        assert_eq!(ph, 70.0);
        assert_eq!(orp, 700.0);
        assert_eq!(fake.login_calls(), 1);
        assert_eq!(fake.fetch_calls(), 3);
    }
}
