//! Data model for reconciled recording metadata

pub mod notice;
pub mod provenance;
pub mod recording;

pub use notice::{codes, Notice};
pub use provenance::{Provenance, Sourced};
pub use recording::{Checksum, Location, Recording, Sensor};
