//! GRIB2 decoding boundary (WMO FM 92 GRIB Edition 2).
//!
//! The loader only needs two things from a downloaded message: the grid
//! geometry from Section 3 and the unpacked values from Section 7. Geometry
//! is read directly from the section bytes; value unpacking is delegated to
//! the `grib` crate behind the [`GridDecoder`] trait so callers can swap in
//! a fake during tests.

mod decoder;
mod error;
pub mod sections;

pub use decoder::{DecodedMessage, GribCrateDecoder, GridDecoder};
pub use error::{DecodeError, DecodeResult};
pub use sections::{GridDefinition, LatLonGrid};
