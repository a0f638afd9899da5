use crate::vector::Vector;
use serde::{Deserialize, Serialize};

/// Text standing in for a missing date when records are compared.
pub const UNKNOWN_DATE: &str = "fecha desconocida";

/// A historical accident with its description embedding.
///
/// Records inside the store always carry an embedding. Copies handed to
/// callers have it cleared, and serialization then omits the field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccidentRecord {
    pub date: Option<String>,
    pub address: String,
    #[serde(rename = "type")]
    pub accident_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vector>,
}

impl AccidentRecord {
    #[inline]
    #[must_use]
    pub fn new(
        date: Option<String>,
        address: impl Into<String>,
        accident_type: impl Into<String>,
        embedding: Vector,
    ) -> Self {
        Self {
            date,
            address: address.into(),
            accident_type: accident_type.into(),
            embedding: Some(embedding),
        }
    }

    /// Date as display text, with the unknown-date sentinel for `None`.
    pub fn date_text(&self) -> &str {
        self.date.as_deref().unwrap_or(UNKNOWN_DATE)
    }

    /// Whether `other` describes the same accident: same address, same type
    /// and same date text.
    pub fn same_accident(&self, other: &AccidentRecord) -> bool {
        self.address == other.address
            && self.accident_type == other.accident_type
            && self.date_text() == other.date_text()
    }

    /// Copy without the embedding, safe to return to callers.
    #[must_use]
    pub fn stripped(&self) -> Self {
        Self {
            date: self.date.clone(),
            address: self.address.clone(),
            accident_type: self.accident_type.clone(),
            embedding: None,
        }
    }

    /// One-line summary used when building advisory prompts.
    pub fn summary_line(&self) -> String {
        format!(
            "📅 {} | 📍 {} | 🚗 {}",
            self.date_text(),
            self.address,
            self.accident_type
        )
    }
}
