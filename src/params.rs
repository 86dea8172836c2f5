//! Validation of raw crafting-parameter input.
//!
//! The store accepts any key string; numeric constraints are only checked
//! here, before a command reaches the registry.

use thiserror::Error;

use crate::key::MacroKey;

/// Input that violates the crafting-parameter constraints.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{field} is required")]
    Missing {
        /// Field name.
        field: &'static str,
    },
    /// A field is not a base-10 integer.
    #[error("{field} must be a number, got {value:?}")]
    NotANumber {
        /// Field name.
        field: &'static str,
        /// Raw input.
        value: String,
    },
    /// A field is below its minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Field name.
        field: &'static str,
        /// Smallest accepted value.
        min: i64,
        /// Parsed input.
        value: i64,
    },
    /// Initial quality is above maximum quality.
    #[error("initial quality {initial_quality} exceeds max quality {max_quality}")]
    InitialExceedsMax {
        /// Parsed initial quality.
        initial_quality: i64,
        /// Parsed max quality.
        max_quality: i64,
    },
    /// A mission link was requested without a name.
    #[error("mission name is required")]
    EmptyMissionName,
}

/// Checks numeric parameters and builds a [`MacroKey`].
pub fn validate(
    progress: i64,
    max_quality: i64,
    initial_quality: i64,
    durability: i64,
) -> Result<MacroKey, ValidationError> {
    let progress = at_least("progress", progress, 0)?;
    let max_quality = at_least("max_quality", max_quality, 0)?;
    let initial_quality = at_least("initial_quality", initial_quality, 0)?;
    let durability = at_least("durability", durability, 1)?;

    if initial_quality > max_quality {
        return Err(ValidationError::InitialExceedsMax {
            initial_quality: i64::from(initial_quality),
            max_quality: i64::from(max_quality),
        });
    }

    Ok(MacroKey {
        progress,
        max_quality,
        initial_quality,
        durability,
    })
}

/// Parses form fields and validates them.
///
/// A blank initial quality means 0; the other three fields are required.
pub fn parse_inputs(
    progress: &str,
    max_quality: &str,
    initial_quality: &str,
    durability: &str,
) -> Result<MacroKey, ValidationError> {
    let progress = required("progress", progress)?;
    let max_quality = required("max_quality", max_quality)?;
    let initial_quality = optional("initial_quality", initial_quality)?.unwrap_or(0);
    let durability = required("durability", durability)?;
    validate(progress, max_quality, initial_quality, durability)
}

/// Parses an optional numeric field; blank input yields `None`.
pub fn optional(field: &'static str, raw: &str) -> Result<Option<i64>, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|_| ValidationError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

fn required(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    optional(field, raw)?.ok_or(ValidationError::Missing { field })
}

fn at_least(field: &'static str, value: i64, min: i64) -> Result<u32, ValidationError> {
    if value < min {
        return Err(ValidationError::BelowMinimum { field, min, value });
    }
    u32::try_from(value).map_err(|_| ValidationError::NotANumber {
        field,
        value: value.to_string(),
    })
}
