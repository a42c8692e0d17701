//! Licensed broadcasters.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filled;

/// A licensed broadcaster and its contact person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Broadcaster {
    /// Identifier assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Registered name.
    pub name: String,
    /// P.O. box.
    pub po_box: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Town.
    pub town: Option<String>,
    /// Physical location.
    pub location: Option<String>,
    /// Street.
    pub street: Option<String>,
    /// Phone numbers, free text.
    pub phone_numbers: Option<String>,
    /// Contact person's name.
    pub contact_name: Option<String>,
    /// Contact person's address.
    pub contact_address: Option<String>,
    /// Contact person's phone.
    pub contact_phone: Option<String>,
    /// Contact person's email.
    pub contact_email: Option<String>,
    /// When the record was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Broadcaster {
    /// Create a broadcaster with just a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Single-line postal address, skipping blank parts.
    #[must_use]
    pub fn postal_address(&self) -> String {
        let po_box = filled(self.po_box.as_deref()).map(|b| format!("P.O. Box {b}"));
        [
            po_box.as_deref(),
            filled(self.postal_code.as_deref()),
            filled(self.town.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_broadcaster() {
        let b = Broadcaster::new("Radio Citizen");
        assert_eq!(b.name, "Radio Citizen");
        assert!(b.id.is_none());
    }

    #[test]
    fn test_postal_address_skips_blanks() {
        let mut b = Broadcaster::new("Radio Citizen");
        b.po_box = Some("7468".to_string());
        b.postal_code = Some(" ".to_string());
        b.town = Some("Nairobi".to_string());
        assert_eq!(b.postal_address(), "P.O. Box 7468, Nairobi");
    }

    #[test]
    fn test_deserialize_partial() {
        let b: Broadcaster = serde_json::from_str(r#"{"name": "Kiss FM"}"#).unwrap();
        assert_eq!(b.name, "Kiss FM");
        assert!(b.contact_email.is_none());
    }
}
