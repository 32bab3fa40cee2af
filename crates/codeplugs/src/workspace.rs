use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use codeplugs_model::channel::ValidationError;
use codeplugs_model::contact::{ContactListEntry, ContactListSummary};
use codeplugs_model::interchange::{ImportError, ImportSummary};
use codeplugs_model::maintenance;
use codeplugs_model::{
    Aggregate, Channel, Contact, ContactList, DigitalContact, Id, Member, Page, PageRequest,
    RoamingChannel, RoamingZone, ScanList, Zone, membership,
};

#[derive(Debug)]
pub enum WorkspaceError {
    NotFound(&'static str),
    Conflict(String),
    Invalid(String),
    Internal(anyhow::Error),
}

impl From<ValidationError> for WorkspaceError {
    fn from(value: ValidationError) -> Self {
        Self::Invalid(value.to_string())
    }
}

impl From<ImportError> for WorkspaceError {
    fn from(value: ImportError) -> Self {
        Self::Invalid(value.to_string())
    }
}

/// A zone-like group as stored: members are kept by id so that edits to a
/// channel show up in every group that contains it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GroupRecord {
    pub id: Id,
    pub name: String,
    pub members: Vec<Id>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    pub saved_at: Option<DateTime<Utc>>,
    pub channels: Vec<Channel>,
    pub contacts: Vec<Contact>,
    pub digital_contacts: Vec<DigitalContact>,
    pub zones: Vec<GroupRecord>,
    pub scan_lists: Vec<GroupRecord>,
    pub roaming_channels: Vec<RoamingChannel>,
    pub roaming_zones: Vec<GroupRecord>,
    pub contact_lists: Vec<ContactList>,
}

/// Aggregates whose membership is stored as a [`GroupRecord`].
pub trait Grouping: Aggregate {
    const KIND: &'static str;

    fn records(snapshot: &Snapshot) -> &Vec<GroupRecord>;

    fn records_mut(snapshot: &mut Snapshot) -> &mut Vec<GroupRecord>;

    fn universe(snapshot: &Snapshot) -> &[Self::Member];
}

impl Grouping for Zone {
    const KIND: &'static str = "zone";

    fn records(snapshot: &Snapshot) -> &Vec<GroupRecord> {
        &snapshot.zones
    }

    fn records_mut(snapshot: &mut Snapshot) -> &mut Vec<GroupRecord> {
        &mut snapshot.zones
    }

    fn universe(snapshot: &Snapshot) -> &[Channel] {
        &snapshot.channels
    }
}

impl Grouping for ScanList {
    const KIND: &'static str = "scan list";

    fn records(snapshot: &Snapshot) -> &Vec<GroupRecord> {
        &snapshot.scan_lists
    }

    fn records_mut(snapshot: &mut Snapshot) -> &mut Vec<GroupRecord> {
        &mut snapshot.scan_lists
    }

    fn universe(snapshot: &Snapshot) -> &[Channel] {
        &snapshot.channels
    }
}

impl Grouping for RoamingZone {
    const KIND: &'static str = "roaming zone";

    fn records(snapshot: &Snapshot) -> &Vec<GroupRecord> {
        &snapshot.roaming_zones
    }

    fn records_mut(snapshot: &mut Snapshot) -> &mut Vec<GroupRecord> {
        &mut snapshot.roaming_zones
    }

    fn universe(snapshot: &Snapshot) -> &[RoamingChannel] {
        &snapshot.roaming_channels
    }
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> Id) -> Id {
    items.iter().map(id).max().unwrap_or(0) + 1
}

fn view<G: Grouping>(snapshot: &Snapshot, record: &GroupRecord) -> G {
    let (members, _) = membership::resolve(G::universe(snapshot), &record.members);

    G::new(record.id, record.name.clone(), members)
}

pub struct ContactQuery<'a> {
    pub search: Option<&'a str>,
    pub sort: Option<&'a str>,
    pub descending: bool,
    pub page: PageRequest,
}

type Compare<T> = fn(&T, &T) -> Ordering;

fn sort_by<T>(items: &mut [T], compare: Compare<T>, descending: bool) {
    items.sort_by(|a, b| match descending {
        true => compare(a, b).reverse(),
        _ => compare(a, b),
    });
}

fn unsupported_sort(field: &str) -> WorkspaceError {
    WorkspaceError::Invalid(format!("unsupported sort field {field}"))
}

pub struct Workspace {
    path: Option<PathBuf>,
    state: RwLock<Snapshot>,
}

impl Workspace {
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            path: None,
            state: RwLock::new(snapshot),
        }
    }

    /// Loads the snapshot at `path`, or starts empty when there is none yet.
    /// Every later mutation is written back to `path`.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();

        let snapshot = if path.exists() {
            let file = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let snapshot: Snapshot = serde_json::from_slice(&file)
                .with_context(|| format!("failed to parse {}", path.display()))?;

            info!(
                path = %path.display(),
                channels = snapshot.channels.len(),
                zones = snapshot.zones.len(),
                "Loaded codeplug"
            );

            snapshot
        } else {
            info!(path = %path.display(), "Starting with an empty codeplug");
            Snapshot::default()
        };

        Ok(Self {
            path: Some(path.to_path_buf()),
            state: RwLock::new(snapshot),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&Snapshot) -> T) -> T {
        let state = self.state.read().unwrap();
        f(&state)
    }

    /// Applies `f` to a copy of the snapshot. The copy replaces the live
    /// snapshot only after it has been persisted, so a failing `f` or a
    /// failed save leaves the state as it was.
    fn write<T>(
        &self,
        f: impl FnOnce(&mut Snapshot) -> Result<T, WorkspaceError>,
    ) -> Result<T, WorkspaceError> {
        let mut state = self.state.write().unwrap();
        let mut next = state.clone();
        let result = f(&mut next)?;

        self.persist(&mut next).map_err(|e| {
            error!("Failed to save codeplug: {:#}", e);
            WorkspaceError::Internal(e)
        })?;

        *state = next;

        Ok(result)
    }

    fn persist(&self, snapshot: &mut Snapshot) -> anyhow::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        snapshot.saved_at = Some(Utc::now());

        let json = serde_json::to_vec_pretty(&*snapshot)?;
        let temp = path.with_extension("json.tmp");

        std::fs::write(&temp, json)
            .with_context(|| format!("failed to write {}", temp.display()))?;
        std::fs::rename(&temp, path)
            .with_context(|| format!("failed to replace {}", path.display()))?;

        debug!(path = %path.display(), "Saved codeplug");

        Ok(())
    }

    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = self.read(|state| state.channels.clone());
        channels.sort_by_key(|channel| channel.sort_order);
        channels
    }

    /// Creates the channel when its id is zero, otherwise replaces the
    /// stored channel with the same id. The TX contact is stored as given;
    /// linking it is left to [`Workspace::resolve_contacts`].
    pub fn save_channel(&self, mut channel: Channel) -> Result<Channel, WorkspaceError> {
        channel.validate()?;

        self.write(|state| {
            if channel.id != 0 && !membership::contains(&state.channels, channel.id) {
                return Err(WorkspaceError::NotFound("channel"));
            }

            if let Some(contact_id) = channel.contact_id
                && !state.contacts.iter().any(|contact| contact.id == contact_id)
            {
                return Err(WorkspaceError::Invalid(format!(
                    "unknown contact {contact_id}"
                )));
            }

            if channel.id == 0 {
                channel.id = next_id(&state.channels, Member::id);
                state.channels.push(channel.clone());
                debug!(id = channel.id, name = %channel.name, "Created a channel");
            } else if let Some(stored) = state.channels.iter_mut().find(|c| c.id == channel.id) {
                *stored = channel.clone();
            }

            Ok(channel)
        })
    }

    /// Deletes a channel and drops it from every zone and scan list.
    pub fn delete_channel(&self, id: Id) -> Result<(), WorkspaceError> {
        self.write(|state| {
            if !membership::contains(&state.channels, id) {
                return Err(WorkspaceError::NotFound("channel"));
            }

            state.channels = membership::remove(&state.channels, id);

            for record in state.zones.iter_mut().chain(state.scan_lists.iter_mut()) {
                record.members = membership::remove(&record.members, id);
            }

            Ok(())
        })
    }

    /// Sets each listed channel's sort order to its 1-based position.
    pub fn reorder_channels(&self, ids: &[Id]) -> Result<usize, WorkspaceError> {
        info!("Reordering {} channels", ids.len());

        self.write(|state| {
            let mut updated = 0;

            for (position, id) in ids.iter().enumerate() {
                if let Some(channel) = state.channels.iter_mut().find(|c| c.id == *id) {
                    channel.sort_order = position as i32 + 1;
                    updated += 1;
                } else {
                    warn!(id, "Skipping unknown channel");
                }
            }

            Ok(updated)
        })
    }

    pub fn fix_bandwidths(&self) -> Result<usize, WorkspaceError> {
        self.write(|state| Ok(maintenance::fix_bandwidths(&mut state.channels)))
    }

    /// Links every channel's TX contact to the contact of the same name,
    /// creating placeholder contacts for names nobody has yet.
    pub fn resolve_contacts(&self) -> Result<usize, WorkspaceError> {
        self.write(|state| {
            let Snapshot { contacts, channels, .. } = state;

            Ok(maintenance::resolve_contacts(contacts, channels))
        })
    }

    /// Appends imported channels after the existing ones. Rows without a
    /// name, and rows repeating the name and RX frequency of a known
    /// channel, are skipped. With `overwrite` every channel is dropped
    /// first, and zones and scan lists are emptied.
    pub fn import_channels(
        &self,
        channels: Vec<Channel>,
        overwrite: bool,
    ) -> Result<ImportSummary, WorkspaceError> {
        self.write(|state| {
            if overwrite {
                info!(count = state.channels.len(), "Dropping channels before import");

                state.channels.clear();
                for record in state.zones.iter_mut().chain(state.scan_lists.iter_mut()) {
                    record.members.clear();
                }
            }

            let mut summary = ImportSummary::default();
            let mut incoming: Vec<Channel> = Vec::new();

            for channel in channels {
                let duplicate = state.channels.iter().chain(&incoming).any(|other| {
                    other.name == channel.name && other.rx_frequency == channel.rx_frequency
                });

                if channel.name.trim().is_empty() || duplicate {
                    debug!(name = %channel.name, "Skipping imported channel");
                    summary.skipped += 1;
                    continue;
                }

                incoming.push(channel);
            }

            let resolved = maintenance::resolve_contacts(&mut state.contacts, &mut incoming);

            let mut id = next_id(&state.channels, Member::id);
            let mut sort_order = state
                .channels
                .iter()
                .map(|channel| channel.sort_order)
                .max()
                .unwrap_or(0);

            for mut channel in incoming {
                sort_order += 1;
                channel.id = id;
                channel.sort_order = sort_order;
                id += 1;

                state.channels.push(channel);
                summary.imported += 1;
            }

            info!(
                imported = summary.imported,
                skipped = summary.skipped,
                resolved,
                "Imported channels"
            );

            Ok(summary)
        })
    }

    /// Channels in sort order without those marked skip. When zones are
    /// given, only their members are included.
    pub fn export_channels(&self, zone_ids: &[Id]) -> Vec<Channel> {
        let members = self.read(|state| {
            state
                .zones
                .iter()
                .filter(|record| zone_ids.contains(&record.id))
                .flat_map(|record| record.members.iter().copied())
                .collect::<HashSet<_>>()
        });

        self.channels()
            .into_iter()
            .filter(|channel| !channel.skip)
            .filter(|channel| zone_ids.is_empty() || members.contains(&channel.id))
            .collect()
    }

    /// Every matching contact is returned on a single page; `query.page` is
    /// only honoured by the directory.
    pub fn contacts(&self, query: &ContactQuery) -> Result<Page<Contact>, WorkspaceError> {
        let compare: Compare<Contact> = match query.sort.unwrap_or("id") {
            "id" => |a, b| a.id.cmp(&b.id),
            "name" => |a, b| a.name.cmp(&b.name),
            "dmr_id" => |a, b| a.dmr_id.cmp(&b.dmr_id),
            "type" => |a, b| a.contact_type.to_string().cmp(&b.contact_type.to_string()),
            field => return Err(unsupported_sort(field)),
        };

        let mut contacts = self.read(|state| {
            state
                .contacts
                .iter()
                .filter(|contact| {
                    query.search.is_none_or(|term| {
                        contact.name.to_lowercase().contains(&term.to_lowercase())
                            || contact.dmr_id.to_string().contains(term)
                    })
                })
                .cloned()
                .collect::<Vec<_>>()
        });

        sort_by(&mut contacts, compare, query.descending);

        Ok(Page::whole(contacts))
    }

    pub fn directory(
        &self,
        query: &ContactQuery,
    ) -> Result<Page<DigitalContact>, WorkspaceError> {
        let compare: Compare<DigitalContact> = match query.sort.unwrap_or("id") {
            "id" => |a, b| a.id.cmp(&b.id),
            "dmr_id" => |a, b| a.dmr_id.cmp(&b.dmr_id),
            "name" => |a, b| a.name.cmp(&b.name),
            "callsign" => |a, b| a.callsign.cmp(&b.callsign),
            "city" => |a, b| a.city.cmp(&b.city),
            "state" => |a, b| a.state.cmp(&b.state),
            "country" => |a, b| a.country.cmp(&b.country),
            field => return Err(unsupported_sort(field)),
        };

        let mut contacts = self.read(|state| {
            state
                .digital_contacts
                .iter()
                .filter(|contact| query.search.is_none_or(|term| contact.matches(term)))
                .cloned()
                .collect::<Vec<_>>()
        });

        sort_by(&mut contacts, compare, query.descending);

        Ok(query.page.paginate(contacts))
    }

    pub fn save_contact(&self, mut contact: Contact) -> Result<Contact, WorkspaceError> {
        contact.validate()?;

        self.write(|state| {
            if state.contacts.iter().any(|other| {
                other.id != contact.id
                    && other.dmr_id == contact.dmr_id
                    && other.contact_type == contact.contact_type
            }) {
                return Err(WorkspaceError::Conflict(format!(
                    "a {} contact with DMR ID {} already exists",
                    contact.contact_type, contact.dmr_id
                )));
            }

            if contact.id == 0 {
                contact.id = next_id(&state.contacts, |contact| contact.id);
                state.contacts.push(contact.clone());
            } else {
                let stored = state
                    .contacts
                    .iter_mut()
                    .find(|c| c.id == contact.id)
                    .ok_or(WorkspaceError::NotFound("contact"))?;
                *stored = contact.clone();
            }

            Ok(contact)
        })
    }

    pub fn delete_contact(&self, id: Id) -> Result<(), WorkspaceError> {
        self.write(|state| {
            if !state.contacts.iter().any(|contact| contact.id == id) {
                return Err(WorkspaceError::NotFound("contact"));
            }

            if state.channels.iter().any(|channel| channel.contact_id == Some(id)) {
                return Err(WorkspaceError::Conflict(
                    "Contact is in use by channels".to_string(),
                ));
            }

            state.contacts.retain(|contact| contact.id != id);

            Ok(())
        })
    }

    /// Inserts directory entries, replacing those with a known DMR ID.
    pub fn upsert_directory(
        &self,
        entries: Vec<DigitalContact>,
    ) -> Result<usize, WorkspaceError> {
        if let Some(entry) = entries.iter().find(|entry| entry.dmr_id <= 0) {
            return Err(ValidationError::DmrId(entry.dmr_id).into());
        }

        self.write(|state| {
            let count = entries.len();

            for mut entry in entries {
                match state
                    .digital_contacts
                    .iter_mut()
                    .find(|stored| stored.dmr_id == entry.dmr_id)
                {
                    Some(stored) => {
                        entry.id = stored.id;
                        *stored = entry;
                    }
                    None => {
                        entry.id = next_id(&state.digital_contacts, |contact| contact.id);
                        state.digital_contacts.push(entry);
                    }
                }
            }

            info!(count, "Imported directory contacts");

            Ok(count)
        })
    }

    pub fn groups<G: Grouping>(&self) -> Vec<G> {
        self.read(|state| {
            G::records(state)
                .iter()
                .map(|record| view(state, record))
                .collect()
        })
    }

    pub fn group<G: Grouping>(&self, id: Id) -> Option<G> {
        self.read(|state| {
            G::records(state)
                .iter()
                .find(|record| record.id == id)
                .map(|record| view(state, record))
        })
    }

    /// Creates the group when its id is zero, taking over the members it
    /// was submitted with. Otherwise only the name is updated; membership
    /// changes go through [`Workspace::assign`].
    pub fn save_group<G: Grouping>(&self, group: G) -> Result<G, WorkspaceError> {
        if group.name().trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        self.write(|state| {
            let id = match group.id() {
                0 => {
                    let (members, _) =
                        membership::resolve(G::universe(state), &membership::ids(group.members()));
                    let records = G::records_mut(state);
                    let id = next_id(records.as_slice(), |record| record.id);

                    records.push(GroupRecord {
                        id,
                        name: group.name().to_string(),
                        members: membership::ids(&members),
                    });

                    debug!(id, kind = G::KIND, "Created a group");

                    id
                }
                id => {
                    let record = G::records_mut(state)
                        .iter_mut()
                        .find(|record| record.id == id)
                        .ok_or(WorkspaceError::NotFound(G::KIND))?;

                    record.name = group.name().to_string();

                    id
                }
            };

            let record = G::records(state)
                .iter()
                .find(|record| record.id == id)
                .ok_or(WorkspaceError::NotFound(G::KIND))?;

            Ok(view(state, record))
        })
    }

    pub fn delete_group<G: Grouping>(&self, id: Id) -> Result<(), WorkspaceError> {
        self.write(|state| {
            let records = G::records_mut(state);
            if !records.iter().any(|record| record.id == id) {
                return Err(WorkspaceError::NotFound(G::KIND));
            }

            records.retain(|record| record.id != id);

            Ok(())
        })
    }

    /// Replaces a group's membership with `ids`, in that order. Duplicates
    /// collapse and ids of unknown members are dropped.
    pub fn assign<G: Grouping>(&self, id: Id, ids: &[Id]) -> Result<G, WorkspaceError> {
        self.write(|state| {
            let (members, unknown) = membership::resolve(G::universe(state), ids);

            if !unknown.is_empty() {
                warn!(?unknown, kind = G::KIND, "Dropping unknown members");
            }

            let record = G::records_mut(state)
                .iter_mut()
                .find(|record| record.id == id)
                .ok_or(WorkspaceError::NotFound(G::KIND))?;

            record.members = membership::ids(&members);

            Ok(G::new(id, record.name.clone(), members))
        })
    }

    pub fn roaming_channels(&self) -> Vec<RoamingChannel> {
        self.read(|state| state.roaming_channels.clone())
    }

    pub fn save_roaming_channel(
        &self,
        mut channel: RoamingChannel,
    ) -> Result<RoamingChannel, WorkspaceError> {
        if channel.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        self.write(|state| {
            if channel.id == 0 {
                channel.id = next_id(&state.roaming_channels, Member::id);
                state.roaming_channels.push(channel.clone());
            } else {
                let stored = state
                    .roaming_channels
                    .iter_mut()
                    .find(|c| c.id == channel.id)
                    .ok_or(WorkspaceError::NotFound("roaming channel"))?;
                *stored = channel.clone();
            }

            Ok(channel)
        })
    }

    pub fn delete_roaming_channel(&self, id: Id) -> Result<(), WorkspaceError> {
        self.write(|state| {
            if !membership::contains(&state.roaming_channels, id) {
                return Err(WorkspaceError::NotFound("roaming channel"));
            }

            state.roaming_channels = membership::remove(&state.roaming_channels, id);

            for record in state.roaming_zones.iter_mut() {
                record.members = membership::remove(&record.members, id);
            }

            Ok(())
        })
    }

    pub fn contact_lists(&self) -> Vec<ContactListSummary> {
        self.read(|state| state.contact_lists.iter().map(ContactListSummary::from).collect())
    }

    pub fn contact_list_ids(&self, id: Id) -> Result<Vec<i64>, WorkspaceError> {
        self.read(|state| {
            let list = state
                .contact_lists
                .iter()
                .find(|list| list.id == id)
                .ok_or(WorkspaceError::NotFound("contact list"))?;

            Ok(list.entries.iter().map(|entry| entry.dmr_id).collect())
        })
    }

    pub fn contact_list_entries(
        &self,
        id: Id,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<ContactListEntry>, WorkspaceError> {
        let entries = self.read(|state| {
            let list = state
                .contact_lists
                .iter()
                .find(|list| list.id == id)
                .ok_or(WorkspaceError::NotFound("contact list"))?;

            Ok::<_, WorkspaceError>(
                list.entries
                    .iter()
                    .filter(|entry| {
                        search.is_none_or(|term| entry.dmr_id.to_string().contains(term))
                    })
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        })?;

        Ok(page.paginate(entries))
    }

    /// Stores a contact list, replacing the entries of an existing list with
    /// the same name.
    pub fn save_contact_list(
        &self,
        list: ContactList,
    ) -> Result<ContactListSummary, WorkspaceError> {
        let name = list.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }

        let mut seen = HashSet::new();
        let entries = list
            .entries
            .iter()
            .filter(|entry| seen.insert(entry.dmr_id))
            .enumerate()
            .map(|(index, entry)| ContactListEntry {
                id: index as Id + 1,
                dmr_id: entry.dmr_id,
            })
            .collect::<Vec<_>>();

        self.write(|state| {
            let index = match state.contact_lists.iter().position(|stored| stored.name == name) {
                Some(index) => index,
                None => {
                    let id = next_id(&state.contact_lists, |list| list.id);
                    state.contact_lists.push(ContactList {
                        id,
                        name,
                        ..Default::default()
                    });
                    state.contact_lists.len() - 1
                }
            };

            let stored = &mut state.contact_lists[index];
            stored.description = list.description;
            stored.entries = entries;

            info!(name = %stored.name, entries = stored.entries.len(), "Saved contact list");

            Ok(ContactListSummary::from(&*stored))
        })
    }

    /// Replaces the entries of the list called `name` with imported IDs.
    pub fn import_contact_list(
        &self,
        name: &str,
        ids: Vec<i64>,
    ) -> Result<ContactListSummary, WorkspaceError> {
        let entries = ids
            .into_iter()
            .map(|dmr_id| ContactListEntry {
                dmr_id,
                ..Default::default()
            })
            .collect();

        self.save_contact_list(ContactList {
            name: name.to_string(),
            entries,
            ..Default::default()
        })
    }

    pub fn delete_contact_list(&self, id: Id) -> Result<(), WorkspaceError> {
        self.write(|state| {
            if !state.contact_lists.iter().any(|list| list.id == id) {
                return Err(WorkspaceError::NotFound("contact list"));
            }

            state.contact_lists.retain(|list| list.id != id);

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use codeplugs_model::channel::{ChannelType, Protocol};
    use codeplugs_model::contact::ContactType;

    use super::*;

    fn channel(name: &str) -> Channel {
        Channel {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn workspace_with_channels(names: &[&str]) -> Workspace {
        let workspace = Workspace::new(Snapshot::default());
        for name in names {
            workspace.save_channel(channel(name)).unwrap();
        }
        workspace
    }

    fn zone(name: &str) -> Zone {
        Zone {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn names(channels: &[Channel]) -> Vec<&str> {
        channels.iter().map(|c| c.name.as_str()).collect()
    }

    fn query<'a>(
        search: Option<&'a str>,
        sort: Option<&'a str>,
        descending: bool,
    ) -> ContactQuery<'a> {
        ContactQuery {
            search,
            sort,
            descending,
            page: PageRequest::new(None, None, 50),
        }
    }

    #[test]
    fn test_save_channel_assigns_ids() {
        let workspace = workspace_with_channels(&["A", "B"]);
        let channels = workspace.channels();

        assert_eq!(membership::ids(&channels), [1, 2]);

        let mut renamed = channels[0].clone();
        renamed.name = "Renamed".to_string();
        workspace.save_channel(renamed).unwrap();

        assert_eq!(names(&workspace.channels()), ["Renamed", "B"]);
    }

    #[test]
    fn test_save_channel_rejects_unknown_and_invalid() {
        let workspace = workspace_with_channels(&[]);

        let mut unknown = channel("Ghost");
        unknown.id = 9;
        assert!(matches!(
            workspace.save_channel(unknown),
            Err(WorkspaceError::NotFound("channel"))
        ));

        let invalid = Channel {
            protocol: Protocol::Dmr,
            channel_type: ChannelType::DigitalDmr,
            ..channel("DMR")
        };
        assert!(matches!(
            workspace.save_channel(invalid),
            Err(WorkspaceError::Invalid(_))
        ));
        assert!(workspace.channels().is_empty());
    }

    #[test]
    fn test_save_channel_keeps_tx_contact() {
        let workspace = workspace_with_channels(&[]);
        let saved = workspace
            .save_channel(Channel {
                tx_contact: "Parrot".to_string(),
                ..channel("Echo")
            })
            .unwrap();

        assert_eq!(saved.tx_contact, "Parrot");
        assert_eq!(saved.contact_id, None);
        assert!(workspace.contacts(&query(None, None, false)).unwrap().data.is_empty());
    }

    #[test]
    fn test_resolve_contacts() {
        let workspace = workspace_with_channels(&[]);
        let contact = workspace
            .save_contact(Contact {
                name: "Worldwide".to_string(),
                dmr_id: 91,
                ..Default::default()
            })
            .unwrap();

        for (name, tx_contact) in [("BM", "WORLDWIDE"), ("Echo", "Parrot"), ("Echo 2", "parrot")] {
            workspace
                .save_channel(Channel {
                    tx_contact: tx_contact.to_string(),
                    ..channel(name)
                })
                .unwrap();
        }

        assert_eq!(workspace.resolve_contacts().unwrap(), 3);

        let page = workspace.contacts(&query(Some("parrot"), None, false)).unwrap();
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].dmr_id, -1);

        let linked = workspace
            .channels()
            .iter()
            .map(|channel| channel.contact_id)
            .collect::<Vec<_>>();
        assert_eq!(linked, [Some(contact.id), Some(page.data[0].id), Some(page.data[0].id)]);

        assert_eq!(workspace.resolve_contacts().unwrap(), 0);
    }

    #[test]
    fn test_failed_save_leaves_state() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::open(dir.path().join("missing").join("codeplugs.json")).unwrap();

        assert!(matches!(
            workspace.save_channel(channel("A")),
            Err(WorkspaceError::Internal(_))
        ));
        assert!(workspace.channels().is_empty());
    }

    #[test]
    fn test_contacts_are_not_paginated() {
        let workspace = workspace_with_channels(&[]);
        for dmr_id in 1..=60 {
            workspace
                .save_contact(Contact {
                    name: format!("TG {dmr_id}"),
                    dmr_id,
                    ..Default::default()
                })
                .unwrap();
        }

        let page = workspace.contacts(&query(None, None, false)).unwrap();
        assert_eq!(page.data.len(), 60);
        assert_eq!(page.meta.total, 60);
    }

    #[test]
    fn test_import_channels() {
        let workspace = workspace_with_channels(&["A"]);
        let zone = workspace.save_group(zone("Local")).unwrap();
        workspace.assign::<Zone>(zone.id, &[1]).unwrap();

        let row = |name: &str, rx_frequency: f64| Channel {
            rx_frequency,
            tx_contact: "Parrot".to_string(),
            ..channel(name)
        };
        let rows = vec![
            row("A", 0.0),
            row("B", 145.5),
            row("B", 145.5),
            row("", 146.0),
            row("C", 146.0),
        ];

        let summary = workspace.import_channels(rows.clone(), false).unwrap();
        assert_eq!(
            summary,
            ImportSummary {
                imported: 2,
                skipped: 3
            }
        );

        let channels = workspace.channels();
        assert_eq!(names(&channels), ["A", "B", "C"]);
        assert_eq!(membership::ids(&channels), [1, 2, 3]);
        assert!(channels[1].contact_id.is_some());
        assert_eq!(channels[1].contact_id, channels[2].contact_id);

        let summary = workspace.import_channels(rows, true).unwrap();
        assert_eq!(summary.imported, 3);
        assert_eq!(names(&workspace.channels()), ["A", "B", "C"]);
        assert!(workspace.group::<Zone>(zone.id).unwrap().channels.is_empty());
    }

    #[test]
    fn test_export_channels() {
        let workspace = workspace_with_channels(&["A", "B", "C"]);
        let mut skipped = workspace.channels()[1].clone();
        skipped.skip = true;
        workspace.save_channel(skipped).unwrap();

        let zone = workspace.save_group(zone("Local")).unwrap();
        workspace.assign::<Zone>(zone.id, &[3, 2]).unwrap();

        assert_eq!(names(&workspace.export_channels(&[])), ["A", "C"]);
        assert_eq!(names(&workspace.export_channels(&[zone.id])), ["C"]);
    }

    #[test]
    fn test_import_contact_list() {
        let workspace = workspace_with_channels(&[]);

        let summary = workspace.import_contact_list("Active", vec![7, 5]).unwrap();
        assert_eq!(summary.entry_count, 2);

        let summary = workspace.import_contact_list("Active", vec![9]).unwrap();
        assert_eq!(workspace.contact_list_ids(summary.id).unwrap(), [9]);
        assert!(matches!(
            workspace.import_contact_list(" ", vec![1]),
            Err(WorkspaceError::Invalid(_))
        ));
    }

    #[test]
    fn test_reorder_channels() {
        let workspace = workspace_with_channels(&["A", "B", "C"]);

        assert_eq!(workspace.reorder_channels(&[3, 1, 2, 42]).unwrap(), 3);
        assert_eq!(names(&workspace.channels()), ["C", "A", "B"]);
    }

    #[test]
    fn test_assign_keeps_requested_order() {
        let workspace = workspace_with_channels(&["A", "B", "C"]);
        let zone = workspace.save_group(zone("Local")).unwrap();

        let assigned: Zone = workspace.assign(zone.id, &[3, 1, 3, 99]).unwrap();
        assert_eq!(names(&assigned.channels), ["C", "A"]);

        let stored = workspace.group::<Zone>(zone.id).unwrap();
        assert_eq!(names(&stored.channels), ["C", "A"]);

        assert!(matches!(
            workspace.assign::<Zone>(42, &[1]),
            Err(WorkspaceError::NotFound("zone"))
        ));
    }

    #[test]
    fn test_scan_list_membership_is_ordered() {
        let workspace = workspace_with_channels(&["A", "B", "C"]);
        let list = workspace
            .save_group(ScanList {
                name: "Scan".to_string(),
                ..Default::default()
            })
            .unwrap();

        workspace.assign::<ScanList>(list.id, &[2, 3, 1]).unwrap();

        let lists = workspace.groups::<ScanList>();
        assert_eq!(names(&lists[0].channels), ["B", "C", "A"]);
    }

    #[test]
    fn test_save_group_creates_with_members_and_renames() {
        let workspace = workspace_with_channels(&["A", "B"]);
        let channels = workspace.channels();

        let created = workspace
            .save_group(Zone {
                channels: vec![channels[1].clone()],
                ..zone("Local")
            })
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(names(&created.channels), ["B"]);

        let renamed = workspace
            .save_group(Zone {
                id: created.id,
                ..zone("Renamed")
            })
            .unwrap();
        assert_eq!(renamed.name, "Renamed");
        assert_eq!(names(&renamed.channels), ["B"]);

        assert!(matches!(
            workspace.save_group(zone(" ")),
            Err(WorkspaceError::Invalid(_))
        ));
    }

    #[test]
    fn test_delete_channel_leaves_groups() {
        let workspace = workspace_with_channels(&["A", "B"]);
        let zone = workspace.save_group(zone("Local")).unwrap();
        workspace.assign::<Zone>(zone.id, &[1, 2]).unwrap();

        workspace.delete_channel(1).unwrap();

        let zone = workspace.group::<Zone>(zone.id).unwrap();
        assert_eq!(names(&zone.channels), ["B"]);
        assert!(matches!(
            workspace.delete_channel(1),
            Err(WorkspaceError::NotFound("channel"))
        ));
    }

    #[test]
    fn test_contact_conflicts() {
        let workspace = workspace_with_channels(&[]);
        let contact = Contact {
            name: "Local".to_string(),
            dmr_id: 9,
            contact_type: ContactType::Group,
            ..Default::default()
        };

        let saved = workspace.save_contact(contact.clone()).unwrap();
        assert!(matches!(
            workspace.save_contact(contact.clone()),
            Err(WorkspaceError::Conflict(_))
        ));

        // Same id on a different call type is fine.
        workspace
            .save_contact(Contact {
                contact_type: ContactType::Private,
                ..contact
            })
            .unwrap();

        workspace
            .save_channel(Channel {
                contact_id: Some(saved.id),
                ..channel("TG 9")
            })
            .unwrap();
        assert!(matches!(
            workspace.delete_contact(saved.id),
            Err(WorkspaceError::Conflict(_))
        ));
    }

    #[test]
    fn test_directory_search_sort_and_page() {
        let workspace = workspace_with_channels(&[]);
        let entry = |dmr_id, callsign: &str, name: &str| DigitalContact {
            dmr_id,
            callsign: callsign.to_string(),
            name: name.to_string(),
            ..Default::default()
        };

        workspace
            .upsert_directory(vec![
                entry(3_100_001, "K1AAA", "Alice"),
                entry(3_100_002, "K1BBB", "Bob"),
                entry(2_340_003, "G0CCC", "Carol"),
            ])
            .unwrap();

        let page = workspace.directory(&query(Some("k1"), Some("name"), true)).unwrap();
        assert_eq!(page.meta.total, 2);
        assert_eq!(page.data[0].name, "Bob");

        let page = workspace.directory(&query(Some("234"), None, false)).unwrap();
        assert_eq!(page.data[0].callsign, "G0CCC");

        assert!(matches!(
            workspace.directory(&query(None, Some("password"), false)),
            Err(WorkspaceError::Invalid(_))
        ));

        // Re-importing an entry updates it in place.
        workspace
            .upsert_directory(vec![entry(3_100_002, "K1BBB", "Robert")])
            .unwrap();
        let page = workspace.directory(&query(None, None, false)).unwrap();
        assert_eq!(page.meta.total, 3);
        assert_eq!(page.data[1].name, "Robert");
    }

    #[test]
    fn test_contact_lists() {
        let workspace = workspace_with_channels(&[]);
        let list = |name: &str, ids: &[i64]| ContactList {
            name: name.to_string(),
            entries: ids
                .iter()
                .map(|dmr_id| ContactListEntry {
                    dmr_id: *dmr_id,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        let summary = workspace.save_contact_list(list("Active", &[5, 7, 5, 11])).unwrap();
        assert_eq!(summary.entry_count, 3);
        assert_eq!(workspace.contact_list_ids(summary.id).unwrap(), [5, 7, 11]);

        let page = workspace
            .contact_list_entries(summary.id, Some("1"), PageRequest::new(None, None, 100))
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].dmr_id, 11);

        // Saving under the same name replaces the entries.
        let replaced = workspace.save_contact_list(list("Active", &[1])).unwrap();
        assert_eq!(replaced.id, summary.id);
        assert_eq!(workspace.contact_lists().len(), 1);
        assert_eq!(workspace.contact_list_ids(summary.id).unwrap(), [1]);
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codeplugs.json");

        {
            let workspace = Workspace::open(&path).unwrap();
            workspace.save_channel(channel("A")).unwrap();
            workspace.save_channel(channel("B")).unwrap();
            let zone = workspace.save_group(zone("Local")).unwrap();
            workspace.assign::<Zone>(zone.id, &[2, 1]).unwrap();
        }

        let workspace = Workspace::open(&path).unwrap();
        let zones = workspace.groups::<Zone>();

        assert_eq!(zones.len(), 1);
        assert_eq!(names(&zones[0].channels), ["B", "A"]);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
