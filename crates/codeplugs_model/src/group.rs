use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::channel::Channel;
use crate::{Id, Member};

/// A named, ordered group of members owned by the caller of an editor.
pub trait Aggregate: Clone {
    type Member: Member + Clone;

    fn new(id: Id, name: String, members: Vec<Self::Member>) -> Self;

    fn id(&self) -> Id;

    fn name(&self) -> &str;

    fn members(&self) -> &[Self::Member];

    fn set_members(&mut self, members: Vec<Self::Member>);
}

macro_rules! aggregate {
    ($ty:ident, $member:ty) => {
        impl Aggregate for $ty {
            type Member = $member;

            fn new(id: Id, name: String, channels: Vec<$member>) -> Self {
                Self { id, name, channels }
            }

            fn id(&self) -> Id {
                self.id
            }

            fn name(&self) -> &str {
                &self.name
            }

            fn members(&self) -> &[$member] {
                &self.channels
            }

            fn set_members(&mut self, members: Vec<$member>) {
                self.channels = members;
            }
        }
    };
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct Zone {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub channels: Vec<Channel>,
}

aggregate!(Zone, Channel);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct ScanList {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub channels: Vec<Channel>,
}

aggregate!(ScanList, Channel);

/// A repeater the radio may roam to when the current one fades.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct RoamingChannel {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub rx_frequency: f64,
    pub tx_frequency: f64,
    pub color_code: u8,
    pub time_slot: u8,
}

impl Member for RoamingChannel {
    fn id(&self) -> Id {
        self.id
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct RoamingZone {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub channels: Vec<RoamingChannel>,
}

aggregate!(RoamingZone, RoamingChannel);
