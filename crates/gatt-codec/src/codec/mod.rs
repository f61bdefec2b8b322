//! Binary encoding/decoding for GATT records.
//!
//! [`primitives`] and [`float`] are the building blocks record codecs are
//! written with; [`pipeline`] wraps a codec call with validation and error
//! capture.

pub mod float;
pub mod pipeline;
pub mod primitives;

pub use float::{sfloat_from_raw, sfloat_to_raw, MedFloat};
pub use pipeline::{decode_record, encode_record};
pub use primitives::{Reader, Writer};
