use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use utoipa::ToSchema;

use crate::Id;
use crate::channel::ValidationError;

#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    EnumIter,
    Eq,
    Hash,
    PartialEq,
    Serialize,
    Deserialize,
    ToSchema,
)]
pub enum ContactType {
    #[default]
    Group,
    Private,
    AllCall,
}

/// A user-defined talkgroup or private-call destination.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct Contact {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    #[serde(rename = "DMRID")]
    pub dmr_id: i64,
    #[serde(rename = "Type")]
    pub contact_type: ContactType,
}

impl Contact {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.dmr_id <= 0 {
            return Err(ValidationError::DmrId(self.dmr_id));
        }

        Ok(())
    }
}

/// An entry of the global DMR user directory.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct DigitalContact {
    #[serde(rename = "ID")]
    pub id: Id,
    #[serde(rename = "DMRID")]
    pub dmr_id: i64,
    pub callsign: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub remarks: String,
}

impl DigitalContact {
    /// Case-insensitive match against name, callsign or the decimal DMR ID.
    pub fn matches(&self, term: &str) -> bool {
        let term = term.to_lowercase();

        self.name.to_lowercase().contains(&term)
            || self.callsign.to_lowercase().contains(&term)
            || self.dmr_id.to_string().contains(&term)
    }
}

/// A named set of DMR IDs used to filter directory exports.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContactList {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub entries: Vec<ContactListEntry>,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct ContactListEntry {
    #[serde(rename = "ID")]
    pub id: Id,
    #[serde(rename = "DMRID")]
    pub dmr_id: i64,
}

/// A contact list without its entries, as listed in overviews.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct ContactListSummary {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub description: String,
    pub entry_count: usize,
}

impl From<&ContactList> for ContactListSummary {
    fn from(value: &ContactList) -> Self {
        Self {
            id: value.id,
            name: value.name.clone(),
            description: value.description.clone(),
            entry_count: value.entries.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_contact_validation() {
        for contact_type in ContactType::iter() {
            let contact = Contact {
                name: "Test".to_string(),
                dmr_id: 1,
                contact_type,
                ..Default::default()
            };

            assert_eq!(contact.validate(), Ok(()));
        }

        let missing_id = Contact {
            name: "Test".to_string(),
            ..Default::default()
        };

        assert_eq!(missing_id.validate(), Err(ValidationError::DmrId(0)));
    }

    #[test]
    fn test_contact_type_from_json() {
        let contact: Contact =
            serde_json::from_str(r#"{"Name": "Local", "DMRID": 9, "Type": "AllCall"}"#).unwrap();

        assert_eq!(contact.contact_type, ContactType::AllCall);
        assert!(serde_json::from_str::<Contact>(r#"{"Type": "Broadcast"}"#).is_err());
    }

    #[test]
    fn test_directory_search() {
        let contact = DigitalContact {
            dmr_id: 3_106_123,
            callsign: "W1AW".to_string(),
            name: "Hiram Maxim".to_string(),
            ..Default::default()
        };

        assert!(contact.matches("w1aw"));
        assert!(contact.matches("maxim"));
        assert!(contact.matches("3106"));
        assert!(!contact.matches("K1ABC"));
    }
}
