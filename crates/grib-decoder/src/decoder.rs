use std::io::Cursor;

use tracing::debug;

use crate::error::{DecodeError, DecodeResult};
use crate::sections::{parse_grid_definition, split_messages, GridDefinition};

/// One decoded GRIB2 (sub)message.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMessage {
    pub grid: GridDefinition,
    /// Unpacked values in scan order; bitmap holes are NaN.
    pub values: Vec<f32>,
}

/// Turns the raw bytes of a downloaded GRIB2 slice into grids and values.
pub trait GridDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> DecodeResult<Vec<DecodedMessage>>;
}

/// Decoder backed by the `grib` crate for value unpacking.
#[derive(Debug, Clone, Copy, Default)]
pub struct GribCrateDecoder;

impl GribCrateDecoder {
    pub fn new() -> Self {
        Self
    }

    fn decode_message(&self, message: &[u8]) -> DecodeResult<Vec<DecodedMessage>> {
        let grid = parse_grid_definition(message)?;

        let grib_file = grib::from_reader(Cursor::new(message))
            .map_err(|e| DecodeError::InvalidFormat(e.to_string()))?;

        let mut decoded = Vec::new();
        for (_index, submsg) in grib_file.iter() {
            let decoder = grib::Grib2SubmessageDecoder::from(submsg)
                .map_err(|e| DecodeError::Unpack(e.to_string()))?;
            let values: Vec<f32> = decoder
                .dispatch()
                .map_err(|e| DecodeError::Unpack(e.to_string()))?
                .collect();

            if let GridDefinition::LatLon(latlon) = &grid {
                if values.len() != latlon.num_points() {
                    return Err(DecodeError::ValueCount {
                        expected: latlon.num_points(),
                        found: values.len(),
                    });
                }
            }

            decoded.push(DecodedMessage {
                grid: grid.clone(),
                values,
            });
        }

        Ok(decoded)
    }
}

impl GridDecoder for GribCrateDecoder {
    fn decode(&self, data: &[u8]) -> DecodeResult<Vec<DecodedMessage>> {
        let mut decoded = Vec::new();
        for message in split_messages(data)? {
            decoded.extend(self.decode_message(message)?);
        }
        debug!(bytes = data.len(), messages = decoded.len(), "Decoded GRIB2 data");
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_has_no_messages() {
        let decoded = GribCrateDecoder::new().decode(&[]).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_html_error_page_is_rejected() {
        let page = b"<html><body>404 Not Found</body></html>";
        let err = GribCrateDecoder::new().decode(page).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidFormat(_)));
    }
}
