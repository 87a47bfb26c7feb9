// src/models/facility.rs

//! Facility and court roster structures.

use serde::{Deserialize, Serialize};

/// Shape of the availability response an upstream portal returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    /// JSON schedule descriptor plus a reserved list
    Tabular,
    /// JSON blocks wrapping an HTML fragment of checkbox controls
    EmbeddedMarkup,
}

/// A physical venue with bookable courts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Facility {
    /// Stable upstream facility identifier
    pub id: String,

    /// Display name used in exported rows
    pub name: String,

    /// Prefix for court labels (e.g. "Indoor " vs "Outdoor ")
    #[serde(default)]
    pub label_prefix: String,

    /// Ordered court roster
    #[serde(default)]
    pub courts: Vec<Court>,
}

impl Facility {
    /// Full display label for a court of this facility.
    pub fn court_label(&self, court: &Court) -> String {
        format!("{}{}", self.label_prefix, court.label)
    }

    /// Label for a court name reported by the upstream itself.
    pub fn prefixed(&self, label: &str) -> String {
        format!("{}{}", self.label_prefix, label.trim())
    }
}

/// A bookable unit inside a facility.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Court {
    /// Display label, without the facility prefix
    pub label: String,

    /// Upstream sequence identifier used in reserved keys
    pub sequence_id: String,
}

impl Court {
    pub fn new(label: impl Into<String>, sequence_id: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sequence_id: sequence_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn court_label_uses_prefix() {
        let facility = Facility {
            id: "FAC02".into(),
            name: "Riverside".into(),
            label_prefix: "Indoor ".into(),
            courts: vec![Court::new("1", "41")],
        };
        assert_eq!(facility.court_label(&facility.courts[0]), "Indoor 1");
        assert_eq!(facility.prefixed(" 3 "), "Indoor 3");
    }

    #[test]
    fn format_deserializes_snake_case() {
        let format: ResponseFormat = serde_json::from_str("\"embedded_markup\"").unwrap();
        assert_eq!(format, ResponseFormat::EmbeddedMarkup);
    }
}
