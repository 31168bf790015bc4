use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::error::AppError;

/// Parse an RFC3339 timestamp and re-emit it in UTC.
///
/// Only RFC3339 is accepted here; chat and cache timestamps come from the
/// application clock, never from user-typed text.
pub fn canonical_rfc3339_utc(raw: &str) -> Result<String, AppError> {
    let trimmed = raw.trim();
    let dt = OffsetDateTime::parse(trimmed, &Rfc3339).map_err(|e| {
        AppError::new("TS_INVALID", "Timestamp must be RFC3339")
            .with_details(format!("value={trimmed}; err={e}"))
    })?;
    dt.to_offset(UtcOffset::UTC).format(&Rfc3339).map_err(|e| {
        AppError::new("TS_INVALID", "Failed to format timestamp")
            .with_details(format!("value={trimmed}; err={e}"))
    })
}
