//! Bulk clean-up passes over codeplug data.

use tracing::{debug, info};

use crate::channel::Channel;
use crate::contact::{Contact, ContactType};
use crate::Id;

/// Resets every channel's bandwidth to the default of its type and returns
/// how many channels were changed.
pub fn fix_bandwidths(channels: &mut [Channel]) -> usize {
    let mut updated = 0;

    for channel in channels.iter_mut() {
        let bandwidth = channel.default_bandwidth();

        if channel.bandwidth != bandwidth {
            debug!(
                channel = %channel.name,
                from = %channel.bandwidth,
                to = bandwidth,
                "Fixing bandwidth"
            );
            channel.bandwidth = bandwidth.to_string();
            updated += 1;
        }
    }

    info!(updated, "Fixed channel bandwidths");

    updated
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Resolution {
    Existing(Id),
    Created(Contact),
}

fn normalize(name: &str) -> String {
    name.trim().to_uppercase()
}

/// Links a channel's free-text TX contact to a talkgroup.
///
/// Names are compared ignoring case and surrounding whitespace. When no
/// talkgroup matches, a group contact is proposed under `new_id` with a
/// synthetic negative DMR ID below every existing one, so it cannot collide
/// with a real talkgroup. Channels that name no contact are left alone.
pub fn resolve_contact(contacts: &[Contact], channel: &Channel, new_id: Id) -> Option<Resolution> {
    if channel.tx_contact.trim().is_empty() {
        return None;
    }

    let name = normalize(&channel.tx_contact);

    if let Some(contact) = contacts.iter().find(|contact| normalize(&contact.name) == name) {
        return Some(Resolution::Existing(contact.id));
    }

    let lowest = contacts
        .iter()
        .map(|contact| contact.dmr_id)
        .min()
        .unwrap_or(0)
        .min(0);

    Some(Resolution::Created(Contact {
        id: new_id,
        name: channel.tx_contact.trim().to_string(),
        dmr_id: lowest - 1,
        contact_type: ContactType::Group,
    }))
}

/// Re-links every channel that names a TX contact, creating placeholder
/// talkgroups for unknown names. Returns how many channels changed.
pub fn resolve_contacts(contacts: &mut Vec<Contact>, channels: &mut [Channel]) -> usize {
    let mut updated = 0;

    for channel in channels.iter_mut() {
        let new_id = contacts.iter().map(|contact| contact.id).max().unwrap_or(0) + 1;

        let contact_id = match resolve_contact(contacts, channel, new_id) {
            Some(Resolution::Existing(id)) => id,
            Some(Resolution::Created(contact)) => {
                info!(
                    name = %contact.name,
                    dmr_id = contact.dmr_id,
                    "Created a placeholder contact"
                );
                contacts.push(contact);
                new_id
            }
            None => continue,
        };

        if channel.contact_id != Some(contact_id) {
            debug!(channel = %channel.name, contact_id, "Linking contact");
            channel.contact_id = Some(contact_id);
            updated += 1;
        }
    }

    info!(updated, "Resolved channel contacts");

    updated
}
