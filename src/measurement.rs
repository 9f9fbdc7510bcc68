use crate::error::{ServiceError, UnknownMetric};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Temperature,
    Ph,
    #[serde(rename = "orp")]
    OxidationReductionPotential,
    Salinity,
}

impl MetricKind {
    /// Order of the last-measurements response. Position is the contract;
    /// the record names are only cross-checked.
    pub const ALL: [MetricKind; 4] = [
        MetricKind::Temperature,
        MetricKind::Ph,
        MetricKind::OxidationReductionPotential,
        MetricKind::Salinity,
    ];

    pub fn position(self) -> usize {
        match self {
            MetricKind::Temperature => 0,
            MetricKind::Ph => 1,
            MetricKind::OxidationReductionPotential => 2,
            MetricKind::Salinity => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::Temperature => "temperature",
            MetricKind::Ph => "ph",
            MetricKind::OxidationReductionPotential => "orp",
            MetricKind::Salinity => "salinity",
        }
    }

    /// The host rounds characteristic values to integers, so pH and salinity
    /// are served in tenths.
    pub fn display_scale(self) -> f64 {
        match self {
            MetricKind::Ph | MetricKind::Salinity => 10.0,
            MetricKind::Temperature | MetricKind::OxidationReductionPotential => 1.0,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = UnknownMetric;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(MetricKind::Temperature),
            "ph" => Ok(MetricKind::Ph),
            "orp" | "redox" | "oxidation_reduction_potential" => {
                Ok(MetricKind::OxidationReductionPotential)
            }
            "salinity" | "salt" => Ok(MetricKind::Salinity),
            _ => Err(UnknownMetric(value.trim().to_string())),
        }
    }
}

/// One entry of the last-measurements response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeasurementRecord {
    #[serde(default)]
    pub name: String,
    pub value: f64,
    pub ok_min: f64,
    pub ok_max: f64,
    pub warning_low: f64,
    pub warning_high: f64,
}

impl MeasurementRecord {
    pub fn outside_warning_band(&self) -> bool {
        self.value <= self.warning_low || self.value >= self.warning_high
    }

    pub fn outside_ok_band(&self) -> bool {
        self.value <= self.ok_min || self.value >= self.ok_max
    }

    pub fn band_is_ordered(&self) -> bool {
        self.warning_low <= self.ok_min
            && self.ok_min <= self.ok_max
            && self.ok_max <= self.warning_high
    }
}

/// The four metrics of one fetch, keyed by identity instead of position.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementSet {
    temperature: MeasurementRecord,
    ph: MeasurementRecord,
    orp: MeasurementRecord,
    salinity: MeasurementRecord,
}

impl MeasurementSet {
    /// Builds the set from the service's ordered sequence. Entries past the
    /// fourth are ignored. Fewer than four entries, or a band that is not
    /// ordered, is rejected.
    pub fn from_records(records: Vec<MeasurementRecord>) -> Result<Self, ServiceError> {
        let expected = MetricKind::ALL.len();
        let found = records.len();
        if found < expected {
            return Err(ServiceError::MissingRecords { expected, found });
        }

        let mut slots = records.into_iter();
        let mut take = |kind: MetricKind| -> Result<MeasurementRecord, ServiceError> {
            let record = slots
                .next()
                .ok_or(ServiceError::MissingRecords { expected, found })?;
            if !record.name.is_empty() && !record.name.eq_ignore_ascii_case(kind.as_str()) {
                tracing::warn!(
                    position = kind.position(),
                    expected = kind.as_str(),
                    name = %record.name,
                    "measurement name does not match its position; using position"
                );
            }
            if !record.band_is_ordered() {
                return Err(ServiceError::InvalidBand { metric: kind });
            }
            Ok(record)
        };

        Ok(Self {
            temperature: take(MetricKind::Temperature)?,
            ph: take(MetricKind::Ph)?,
            orp: take(MetricKind::OxidationReductionPotential)?,
            salinity: take(MetricKind::Salinity)?,
        })
    }

    pub fn get(&self, kind: MetricKind) -> &MeasurementRecord {
        match kind {
            MetricKind::Temperature => &self.temperature,
            MetricKind::Ph => &self.ph,
            MetricKind::OxidationReductionPotential => &self.orp,
            MetricKind::Salinity => &self.salinity,
        }
    }

    /// Records in service order.
    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, &MeasurementRecord)> {
        MetricKind::ALL.into_iter().map(move |kind| (kind, self.get(kind)))
    }

    /// Value as served to the host, with the tenths scaling applied.
    pub fn scaled_value(&self, kind: MetricKind) -> f64 {
        self.get(kind).value * kind.display_scale()
    }
}
