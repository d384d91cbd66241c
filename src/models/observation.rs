use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::measurement::Measurement;

/// Number of measurements carried by every observation.
pub const FIELD_COUNT: usize = 20;

/// The measurements of one observation, indexed by [`Field::index`].
pub type Measurements = [Measurement; FIELD_COUNT];

/// SwissMetNet parameters in their fixed record order.
///
/// The discriminant is the position of the field in the binary record and
/// must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    AirTemperature = 0,
    Precipitation = 1,
    SunshineDuration = 2,
    GlobalRadiation = 3,
    RelativeAirHumidity = 4,
    DewPointTemperature = 5,
    WindDirection = 6,
    WindSpeed = 7,
    GustPeak = 8,
    PressureQfe = 9,
    PressureQff = 10,
    PressureQnh = 11,
    GeopotentialHeight850 = 12,
    GeopotentialHeight700 = 13,
    WindDirectionVectorial = 14,
    WindSpeedTower = 15,
    GustPeakTower = 16,
    AirTemperatureTower = 17,
    RelativeAirHumidityTower = 18,
    DewPointTower = 19,
}

impl Field {
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::AirTemperature,
        Field::Precipitation,
        Field::SunshineDuration,
        Field::GlobalRadiation,
        Field::RelativeAirHumidity,
        Field::DewPointTemperature,
        Field::WindDirection,
        Field::WindSpeed,
        Field::GustPeak,
        Field::PressureQfe,
        Field::PressureQff,
        Field::PressureQnh,
        Field::GeopotentialHeight850,
        Field::GeopotentialHeight700,
        Field::WindDirectionVectorial,
        Field::WindSpeedTower,
        Field::GustPeakTower,
        Field::AirTemperatureTower,
        Field::RelativeAirHumidityTower,
        Field::DewPointTower,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name used by the MeteoSwiss CSV feed.
    pub fn column(self) -> &'static str {
        match self {
            Field::AirTemperature => "tre200s0",
            Field::Precipitation => "rre150z0",
            Field::SunshineDuration => "sre000z0",
            Field::GlobalRadiation => "gre000z0",
            Field::RelativeAirHumidity => "ure200s0",
            Field::DewPointTemperature => "tde200s0",
            Field::WindDirection => "dkl010z0",
            Field::WindSpeed => "fu3010z0",
            Field::GustPeak => "fu3010z1",
            Field::PressureQfe => "prestas0",
            Field::PressureQff => "pp0qffs0",
            Field::PressureQnh => "pp0qnhs0",
            Field::GeopotentialHeight850 => "ppz850s0",
            Field::GeopotentialHeight700 => "ppz700s0",
            Field::WindDirectionVectorial => "dv1towz0",
            Field::WindSpeedTower => "fu3towz0",
            Field::GustPeakTower => "fu3towz1",
            Field::AirTemperatureTower => "ta1tows0",
            Field::RelativeAirHumidityTower => "uretows0",
            Field::DewPointTower => "tdetows0",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Field::AirTemperature
            | Field::DewPointTemperature
            | Field::AirTemperatureTower
            | Field::DewPointTower => "°C",
            Field::Precipitation => "mm",
            Field::SunshineDuration => "min",
            Field::GlobalRadiation => "W/m²",
            Field::RelativeAirHumidity | Field::RelativeAirHumidityTower => "%",
            Field::WindDirection | Field::WindDirectionVectorial => "°",
            Field::WindSpeed | Field::GustPeak | Field::WindSpeedTower | Field::GustPeakTower => {
                "km/h"
            }
            Field::PressureQfe | Field::PressureQff | Field::PressureQnh => "hPa",
            Field::GeopotentialHeight850 | Field::GeopotentialHeight700 => "gpm",
        }
    }

    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.column() == column)
    }
}

/// One ten-minute reading of a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub station: String,
    pub epoch_seconds: i64,
    measurements: Measurements,
}

impl Observation {
    /// Observation with every measurement absent.
    pub fn new(station: impl Into<String>, epoch_seconds: i64) -> Self {
        Self::from_measurements(station, epoch_seconds, [Measurement::ABSENT; FIELD_COUNT])
    }

    pub fn from_measurements(
        station: impl Into<String>,
        epoch_seconds: i64,
        measurements: Measurements,
    ) -> Self {
        Self {
            station: station.into(),
            epoch_seconds,
            measurements,
        }
    }

    pub fn with(mut self, field: Field, measurement: Measurement) -> Self {
        self.set(field, measurement);
        self
    }

    pub fn get(&self, field: Field) -> Measurement {
        self.measurements[field.index()]
    }

    pub fn set(&mut self, field: Field, measurement: Measurement) {
        self.measurements[field.index()] = measurement;
    }

    pub fn measurements(&self) -> &Measurements {
        &self.measurements
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.epoch_seconds, 0)
    }

    pub fn present_count(&self) -> usize {
        self.measurements.iter().filter(|m| m.is_present()).count()
    }
}
