use anyhow::{Context, Result};
use blueconnect_sidecar::blueriiot::BlueRiiotApi;
use blueconnect_sidecar::cli::{Args, ReadTarget};
use blueconnect_sidecar::client::MeasurementClient;
use blueconnect_sidecar::config::Config;
use blueconnect_sidecar::evaluator::QualityEvaluator;
use blueconnect_sidecar::http::{router, HttpState};
use blueconnect_sidecar::poller;
use blueconnect_sidecar::session::Session;
use clap::Parser;
use std::sync::Arc;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let default_filter = if config.debug {
        "info,blueconnect_sidecar=debug"
    } else {
        "info,blueconnect_sidecar=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "blueconnect-sidecar"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

async fn discover(client: &MeasurementClient, config: &Config) -> Result<()> {
    client
        .ensure_authenticated(&config.email, &config.password)
        .await;
    if !client.is_authenticated() {
        anyhow::bail!(
            "Blue Riiot login failed: {}",
            client
                .session()
                .last_error()
                .unwrap_or_else(|| "unknown error".to_string())
        );
    }

    let pool_id = match &config.swimming_pool_id {
        Some(pool_id) => pool_id.clone(),
        None => {
            let pool = client
                .discover_pool_id()
                .await
                .context("failed to discover swimming pool")?;
            tracing::info!(name = ?pool.name, "discovered swimming pool");
            pool.pool_id
        }
    };
    let device_serial = match &config.device_serial {
        Some(serial) => serial.clone(),
        None => {
            let device = client
                .discover_device_serial(&pool_id)
                .await
                .context("failed to discover Blue device")?;
            tracing::info!(name = ?device.name, "discovered Blue device");
            device.serial
        }
    };

    println!("\"swimmingpoolid\": \"{pool_id}\"");
    println!("\"bluedeviceserial\": \"{device_serial}\"");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_env(args.config.as_deref())?;
    init_tracing(&config)?;

    tracing::info!(
        swimming_pool_id = ?config.swimming_pool_id,
        device_serial = ?config.device_serial,
        "blueconnect-sidecar configured"
    );

    let http = reqwest::Client::builder()
        .timeout(config.request_timeout())
        .build()
        .context("failed to build HTTP client")?;
    let service = Arc::new(BlueRiiotApi::new(
        http,
        config.api_base.clone(),
        config.api_region.clone(),
    ));
    let client = Arc::new(MeasurementClient::new(service, Arc::new(Session::new())));

    if args.discover {
        return discover(&client, &config).await;
    }

    let evaluator = Arc::new(QualityEvaluator::new(
        client,
        config.account(),
        config.identifiers(),
        config.debug,
    ));

    if let Some(target) = args.once {
        match target {
            ReadTarget::AirQuality => println!("{}", evaluator.air_quality().await),
            ReadTarget::Metric(kind) => println!("{}", evaluator.metric(kind).await),
        }
        return Ok(());
    }

    let poller_handle = config.poll_interval().map(|interval| {
        let evaluator = evaluator.clone();
        tokio::spawn(async move { poller::run(evaluator, interval).await })
    });

    let app = router(HttpState {
        evaluator: evaluator.clone(),
    });
    let listener = tokio::net::TcpListener::bind(&config.http_bind)
        .await
        .with_context(|| format!("failed to bind {}", config.http_bind))?;
    tracing::info!(bind = %config.http_bind, "blueconnect-sidecar HTTP listening");
    let http_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        res = http_handle => {
            match res {
                Ok(Err(err)) => tracing::error!(error = %err, "HTTP server exited"),
                Err(err) => tracing::error!(error = %err, "HTTP task failed"),
                Ok(Ok(())) => {}
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(handle) = poller_handle {
        handle.abort();
    }

    Ok(())
}
