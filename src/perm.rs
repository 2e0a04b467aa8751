//! Textual permission modes, as written in scenario steps.

use crate::error::{Error, Result};

/// Parses a permission written in a step.
///
/// A leading `0` selects octal (`"0755"` is `0o755`), anything else is read as decimal
/// (`"755"` is `755`). Only ASCII digits are accepted and the value must fit a `u32`.
pub fn parse_permission(text: &str) -> Result<u32> {
    let radix = if text.starts_with('0') { 8 } else { 10 };

    // from_str_radix accepts a leading `+`
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidPermission {
            text: text.to_string(),
            reason: "invalid syntax".to_string(),
        });
    }

    u32::from_str_radix(text, radix).map_err(|err| Error::InvalidPermission {
        text: text.to_string(),
        reason: err.to_string(),
    })
}
