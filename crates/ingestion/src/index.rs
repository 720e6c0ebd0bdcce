//! Offset index (`.idx`) parsing.
//!
//! NOAA publishes a plain-text catalog next to every GRIB2 file, one line
//! per message:
//!
//! ```text
//! 1:0:d=2024092900:PRMSL:mean sea level:anl:
//! 2:990253:d=2024092900:CLMR:1 hybrid level:anl:
//! ```
//!
//! Field 1 is the byte offset of the message, fields 3 and 4 name the
//! parameter and level. A message ends one byte before the next larger
//! offset; the last message runs to the end of the file. Submessages
//! (`3.1`, `3.2`) repeat the offset of their parent message and share its
//! range.

use std::collections::HashMap;
use std::path::Path;

use crate::error::IndexError;

/// Inclusive byte range of one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub from: u64,
    /// Last byte, or `None` to read to the end of the resource.
    pub to: Option<u64>,
}

impl ByteRange {
    /// The whole resource.
    pub const FULL: ByteRange = ByteRange { from: 0, to: None };

    pub fn new(from: u64, to: Option<u64>) -> Self {
        Self { from, to }
    }

    pub fn is_full(&self) -> bool {
        self.from == 0 && self.to.is_none()
    }

    /// `Range` header value, or `None` when the whole resource is wanted.
    pub fn header_value(&self) -> Option<String> {
        if self.is_full() {
            return None;
        }
        Some(match self.to {
            Some(to) => format!("bytes={}-{}", self.from, to),
            None => format!("bytes={}-", self.from),
        })
    }
}

/// Lookup from `(parameter, layer)` to the byte range of its message.
#[derive(Debug, Clone, Default)]
pub struct OffsetIndex {
    entries: HashMap<(String, String), ByteRange>,
}

impl OffsetIndex {
    /// Parse catalog text. Any malformed line fails the whole index.
    pub fn parse(text: &str) -> Result<Self, IndexError> {
        let mut lines: Vec<(usize, u64, String, String)> = Vec::new();

        for (n, line) in text.lines().enumerate() {
            let line_no = n + 1;
            if line.trim().is_empty() {
                continue;
            }

            let cols: Vec<&str> = line.split(':').collect();
            if cols.len() < 5 {
                return Err(IndexError::Parse {
                    line: line_no,
                    reason: format!("expected at least 5 fields, got {}", cols.len()),
                });
            }

            let offset: u64 = cols[1].trim().parse().map_err(|_| IndexError::Parse {
                line: line_no,
                reason: format!("offset '{}' is not a number", cols[1]),
            })?;

            if let Some((_, previous, _, _)) = lines.last() {
                // Equal offsets are submessages of one GRIB message.
                if offset < *previous {
                    return Err(IndexError::Parse {
                        line: line_no,
                        reason: format!(
                            "offset {} does not follow previous offset {}",
                            offset, previous
                        ),
                    });
                }
            }

            lines.push((line_no, offset, cols[3].to_string(), cols[4].to_string()));
        }

        // Walk backwards so each line knows where the following message starts.
        let mut ranges = Vec::with_capacity(lines.len());
        let mut following: Option<ByteRange> = None;
        for (_, from, _, _) in lines.iter().rev() {
            let to = match following {
                Some(next) if next.from == *from => next.to,
                Some(next) => Some(next.from - 1),
                None => None,
            };
            let range = ByteRange::new(*from, to);
            ranges.push(range);
            following = Some(range);
        }
        ranges.reverse();

        let mut entries = HashMap::with_capacity(lines.len());
        for ((_, _, parameter, layer), range) in lines.iter().zip(ranges) {
            // Later duplicates replace earlier ones.
            entries.insert((parameter.clone(), layer.clone()), range);
        }

        Ok(Self { entries })
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, IndexError> {
        let text = tokio::fs::read_to_string(path).await?;
        Self::parse(&text)
    }

    pub fn get_offset(&self, parameter: &str, layer: &str) -> Result<ByteRange, IndexError> {
        self.entries
            .get(&(parameter.to_string(), layer.to_string()))
            .copied()
            .ok_or_else(|| IndexError::OffsetNotFound {
                parameter: parameter.to_string(),
                layer: layer.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
