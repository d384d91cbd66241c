pub mod measurement;
pub mod observation;

pub use measurement::{Measurement, MISSING_MARKER};
pub use observation::{Field, Measurements, Observation, FIELD_COUNT};
