use crate::measurement::{MeasurementSet, MetricKind};
use serde::Serialize;
use std::fmt;

pub const EXCELLENT_TEMPERATURE_MIN: f64 = 29.0;
pub const EXCELLENT_TEMPERATURE_MAX: f64 = 31.0;
/// Matched with exact float equality. A reading the service reports as
/// 7.199999 classifies as GOOD, not EXCELLENT.
pub const EXCELLENT_PH: f64 = 7.2;

/// Declared worst to best, so the derived `Ord` is the quality order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityLevel {
    Poor,
    Inferior,
    Good,
    Excellent,
}

impl QualityLevel {
    /// Air-quality characteristic code. 0 (unknown) is never produced here;
    /// it is the sentinel.
    pub fn characteristic_code(self) -> u8 {
        match self {
            QualityLevel::Excellent => 1,
            QualityLevel::Good => 2,
            QualityLevel::Inferior => 4,
            QualityLevel::Poor => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            QualityLevel::Poor => "POOR",
            QualityLevel::Inferior => "INFERIOR",
            QualityLevel::Good => "GOOD",
            QualityLevel::Excellent => "EXCELLENT",
        }
    }
}

impl fmt::Display for QualityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First match wins: any warning-band hit, then any ok-band hit, then the
/// excellent window, then GOOD.
pub fn classify(set: &MeasurementSet) -> QualityLevel {
    if set.iter().any(|(_, record)| record.outside_warning_band()) {
        return QualityLevel::Poor;
    }
    if set.iter().any(|(_, record)| record.outside_ok_band()) {
        return QualityLevel::Inferior;
    }

    let temperature = set.get(MetricKind::Temperature).value;
    let ph = set.get(MetricKind::Ph).value;
    #[allow(clippy::float_cmp)]
    let ph_is_ideal = ph == EXCELLENT_PH;
    if (EXCELLENT_TEMPERATURE_MIN..=EXCELLENT_TEMPERATURE_MAX).contains(&temperature) && ph_is_ideal
    {
        return QualityLevel::Excellent;
    }

    QualityLevel::Good
}
