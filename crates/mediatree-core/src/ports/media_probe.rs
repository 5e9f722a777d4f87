//! Media metadata port (driven/secondary port)

use chrono::{DateTime, Utc};

/// Port trait for embedded-metadata timestamp extraction
///
/// Implementations parse container metadata (creation or last modification
/// date) out of raw file bytes. Extraction is best effort: `None` makes the
/// caller fall back to the filesystem modification time.
pub trait IMediaProbe: Send + Sync {
    /// Returns the most recent embedded timestamp found in `data`
    fn extract_timestamp(&self, data: &[u8]) -> Option<DateTime<Utc>>;
}

/// Probe that never finds metadata
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMediaProbe;

impl IMediaProbe for NoopMediaProbe {
    fn extract_timestamp(&self, _data: &[u8]) -> Option<DateTime<Utc>> {
        None
    }
}
