use crate::error::UnknownMetric;
use crate::measurement::MetricKind;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "blueconnect-sidecar",
    version,
    about = "Blue Connect pool water-quality sidecar"
)]
pub struct Args {
    /// Setup config JSON (swimmingpoolid, bluedeviceserial, email, password, debug).
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Read once, print the value and exit: quality, temperature, ph, orp or salinity.
    #[arg(long)]
    pub once: Option<ReadTarget>,
    /// Resolve the pool id and device serial, print them as config lines and exit.
    #[arg(long, default_value_t = false)]
    pub discover: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadTarget {
    AirQuality,
    Metric(MetricKind),
}

impl FromStr for ReadTarget {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "quality" | "air-quality" | "air_quality" => Ok(ReadTarget::AirQuality),
            other => other.parse().map(ReadTarget::Metric),
        }
    }
}
