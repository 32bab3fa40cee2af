//! Codeplug data model and the membership editing core shared by the server
//! and its clients.

pub mod channel;
pub mod contact;
pub mod editor;
pub mod group;
pub mod interchange;
pub mod maintenance;
pub mod membership;
pub mod page;

pub use channel::{Channel, ChannelType, Protocol};
pub use contact::{Contact, ContactList, ContactType, DigitalContact};
pub use editor::{MembershipEditor, Selection, Side};
pub use group::{Aggregate, RoamingChannel, RoamingZone, ScanList, Zone};
pub use page::{Page, PageMeta, PageRequest};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a persisted record.
pub type Id = u32;

/// Anything that can be placed in an ordered membership.
pub trait Member {
    fn id(&self) -> Id;
}

impl Member for Id {
    fn id(&self) -> Id {
        *self
    }
}

/// The minimal selectable entity: an id and a display name.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct Item {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
}

impl Item {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl Member for Item {
    fn id(&self) -> Id {
        self.id
    }
}
