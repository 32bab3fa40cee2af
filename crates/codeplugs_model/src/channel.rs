use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};
use thiserror::Error;
use utoipa::ToSchema;

use crate::{Id, Member};

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid color code {0}")]
    ColorCode(u8),

    #[error("invalid time slot {0}")]
    TimeSlot(u8),

    #[error("invalid DMR ID {0}")]
    DmrId(i64),

    #[error("name must not be empty")]
    EmptyName,
}

#[derive(
    Copy, Clone, Debug, Default, Display, EnumIter, Eq, PartialEq, Serialize, Deserialize, ToSchema,
)]
pub enum ChannelType {
    #[default]
    Analog,

    #[serde(rename = "Digital (DMR)")]
    #[strum(serialize = "Digital (DMR)")]
    DigitalDmr,

    #[serde(rename = "Digital (YSF)")]
    #[strum(serialize = "Digital (YSF)")]
    DigitalYsf,

    #[serde(rename = "Digital (D-Star)")]
    #[strum(serialize = "Digital (D-Star)")]
    DigitalDStar,

    #[serde(rename = "Digital (NXDN)")]
    #[strum(serialize = "Digital (NXDN)")]
    DigitalNxdn,

    #[serde(rename = "Digital (P25)")]
    #[strum(serialize = "Digital (P25)")]
    DigitalP25,

    Mixed,
}

impl ChannelType {
    pub fn is_digital(self) -> bool {
        matches!(
            self,
            Self::DigitalDmr
                | Self::DigitalYsf
                | Self::DigitalDStar
                | Self::DigitalNxdn
                | Self::DigitalP25
        )
    }
}

#[derive(
    Copy, Clone, Debug, Default, Display, EnumIter, Eq, PartialEq, Serialize, Deserialize, ToSchema,
)]
pub enum Protocol {
    #[default]
    #[serde(rename = "FM")]
    #[strum(serialize = "FM")]
    Fm,

    #[serde(rename = "DMR")]
    #[strum(serialize = "DMR")]
    Dmr,

    Fusion,

    #[serde(rename = "D-Star")]
    #[strum(serialize = "D-Star")]
    DStar,

    #[serde(rename = "NXDN")]
    #[strum(serialize = "NXDN")]
    Nxdn,

    #[serde(rename = "AM")]
    #[strum(serialize = "AM")]
    Am,

    P25,
}

pub const ANALOG_BANDWIDTH: &str = "25";
pub const DIGITAL_BANDWIDTH: &str = "12.5";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default, rename_all = "PascalCase")]
pub struct Channel {
    #[serde(rename = "ID")]
    pub id: Id,
    pub name: String,
    pub sort_order: i32,

    /// Receive frequency in MHz.
    pub rx_frequency: f64,
    /// Transmit frequency in MHz.
    pub tx_frequency: f64,

    pub mode: String,
    pub power: String,
    pub bandwidth: String,

    #[serde(rename = "Type")]
    pub channel_type: ChannelType,
    pub protocol: Protocol,

    // DMR
    pub color_code: u8,
    pub time_slot: u8,
    pub rx_group: String,
    pub tx_contact: String,
    #[serde(rename = "ContactID")]
    pub contact_id: Option<Id>,

    // Squelch
    pub squelch_type: String,
    pub rx_tone: String,
    pub tx_tone: String,
    #[serde(rename = "RxDCS")]
    pub rx_dcs: String,
    #[serde(rename = "TxDCS")]
    pub tx_dcs: String,
    pub rx_squelch_mode: String,

    pub scan_list: String,
    pub tx_permit: String,
    pub talk_around: bool,
    pub work_alone: bool,
    pub skip: bool,
    pub notes: String,
}

impl Channel {
    pub fn is_digital(&self) -> bool {
        self.channel_type.is_digital()
    }

    /// Bandwidth (kHz) a channel of this type is programmed with unless
    /// explicitly overridden.
    pub fn default_bandwidth(&self) -> &'static str {
        match self.channel_type {
            ChannelType::Analog => ANALOG_BANDWIDTH,
            _ => DIGITAL_BANDWIDTH,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }

        if self.protocol == Protocol::Dmr {
            // Zero is a legal colour code on air, but here it means "unset".
            if !(1..=15).contains(&self.color_code) {
                return Err(ValidationError::ColorCode(self.color_code));
            }

            if self.time_slot != 0 && !(1..=2).contains(&self.time_slot) {
                return Err(ValidationError::TimeSlot(self.time_slot));
            }
        }

        Ok(())
    }
}

impl Member for Channel {
    fn id(&self) -> Id {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn dmr(color_code: u8, time_slot: u8) -> Channel {
        Channel {
            name: "DMR Local".to_string(),
            channel_type: ChannelType::DigitalDmr,
            protocol: Protocol::Dmr,
            color_code,
            time_slot,
            ..Default::default()
        }
    }

    #[test]
    fn test_digital_types() {
        let digital = ChannelType::iter()
            .filter(|t| t.is_digital())
            .collect::<Vec<_>>();

        assert_eq!(digital.len(), 5);
        assert!(!ChannelType::Analog.is_digital());
        assert!(!ChannelType::Mixed.is_digital());
    }

    #[test]
    fn test_dmr_validation() {
        assert_eq!(dmr(1, 1).validate(), Ok(()));
        assert_eq!(dmr(15, 2).validate(), Ok(()));
        assert_eq!(dmr(0, 1).validate(), Err(ValidationError::ColorCode(0)));
        assert_eq!(dmr(16, 1).validate(), Err(ValidationError::ColorCode(16)));
        assert_eq!(dmr(1, 3).validate(), Err(ValidationError::TimeSlot(3)));
    }

    #[test]
    fn test_analog_ignores_color_code() {
        let channel = Channel {
            name: "Simplex".to_string(),
            ..Default::default()
        };

        assert_eq!(channel.validate(), Ok(()));
        assert_eq!(channel.default_bandwidth(), ANALOG_BANDWIDTH);
    }

    #[test]
    fn test_json_field_names() {
        let channel = Channel {
            id: 7,
            name: "Repeater".to_string(),
            channel_type: ChannelType::DigitalNxdn,
            protocol: Protocol::Nxdn,
            contact_id: Some(3),
            ..Default::default()
        };

        let value = serde_json::to_value(&channel).unwrap();

        assert_eq!(value["ID"], 7);
        assert_eq!(value["Name"], "Repeater");
        assert_eq!(value["Type"], "Digital (NXDN)");
        assert_eq!(value["Protocol"], "NXDN");
        assert_eq!(value["ContactID"], 3);
        assert_eq!(ChannelType::DigitalNxdn.to_string(), "Digital (NXDN)");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let channel: Channel =
            serde_json::from_str(r#"{"Name": "Calling", "RxFrequency": 146.52}"#).unwrap();

        assert_eq!(channel.id, 0);
        assert_eq!(channel.rx_frequency, 146.52);
        assert_eq!(channel.channel_type, ChannelType::Analog);
        assert_eq!(channel.contact_id, None);
    }
}
