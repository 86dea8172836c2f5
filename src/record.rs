//! Macro record and stored value shapes.

use serde::{Deserialize, Deserializer, Serialize};

/// Fully materialized macro record.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacroRecord {
    /// Action sequence, one action per line.
    #[serde(deserialize_with = "null_as_default")]
    pub text: String,
    /// Food buff used with this macro.
    #[serde(deserialize_with = "null_as_default")]
    pub food: String,
    /// Free-form note.
    #[serde(deserialize_with = "null_as_default")]
    pub memo: String,
    /// True when the macro assumes a master potion.
    #[serde(deserialize_with = "null_as_default")]
    pub master_potion: bool,
}

impl MacroRecord {
    /// Record holding only action text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Absent fields take the container default; explicit `null` lands here.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Value as it sits in the snapshot.
///
/// Older snapshots stored the action text directly; the shape is kept as-is
/// so exports reproduce it, and normalized by [`MacroValue::to_record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MacroValue {
    /// Bare action text.
    Legacy(String),
    /// Structured record.
    Structured(MacroRecord),
}

impl MacroValue {
    /// Normalized record view.
    pub fn to_record(&self) -> MacroRecord {
        match self {
            MacroValue::Legacy(text) => MacroRecord::from_text(text.clone()),
            MacroValue::Structured(rec) => rec.clone(),
        }
    }

    /// Action text without cloning the whole record.
    pub fn text(&self) -> &str {
        match self {
            MacroValue::Legacy(text) => text,
            MacroValue::Structured(rec) => &rec.text,
        }
    }

    /// True for the bare-string shape.
    pub fn is_legacy(&self) -> bool {
        matches!(self, MacroValue::Legacy(_))
    }
}

impl From<MacroRecord> for MacroValue {
    fn from(rec: MacroRecord) -> Self {
        MacroValue::Structured(rec)
    }
}
