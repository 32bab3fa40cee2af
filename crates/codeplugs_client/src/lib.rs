//! Async client for the codeplugs REST API that keeps a local copy of what it
//! fetched.
//!
//! Reads never fail from the caller's point of view: a failed fetch is logged
//! and the cached data stays as it was. Writes return their error so the
//! caller can tell the user.

mod error;

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use codeplugs_model::membership;
use codeplugs_model::{Channel, Contact, DigitalContact, Id, Page, PageMeta, ScanList, Zone};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

pub use crate::error::ClientError;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Collection {
    Channels,
    Zones,
    ScanLists,
    Talkgroups,
    DmrContacts,
}

#[derive(Default)]
struct Flags {
    channels: AtomicBool,
    zones: AtomicBool,
    scan_lists: AtomicBool,
    talkgroups: AtomicBool,
    dmr_contacts: AtomicBool,
}

impl Flags {
    fn get(&self, collection: Collection) -> &AtomicBool {
        match collection {
            Collection::Channels => &self.channels,
            Collection::Zones => &self.zones,
            Collection::ScanLists => &self.scan_lists,
            Collection::Talkgroups => &self.talkgroups,
            Collection::DmrContacts => &self.dmr_contacts,
        }
    }
}

/// Raises a loading flag for as long as it is alive.
struct Loading<'a>(&'a AtomicBool);

impl<'a> Loading<'a> {
    fn start(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

#[derive(Deserialize)]
struct ApiError {
    error: String,
}

#[derive(Serialize)]
struct ContactsQuery<'a> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    search: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<&'a str>,
}

#[derive(Serialize)]
struct ScanListAssignment {
    scan_list_id: Id,
    channel_ids: Vec<Id>,
}

async fn check(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error)
        .unwrap_or(body);

    Err(ClientError::Api { status, message })
}

pub struct CodeplugStore {
    client: reqwest::Client,
    base_url: String,
    channels: RwLock<Vec<Channel>>,
    zones: RwLock<Vec<Zone>>,
    scan_lists: RwLock<Vec<ScanList>>,
    talkgroups: RwLock<Vec<Contact>>,
    dmr_contacts: RwLock<Vec<DigitalContact>>,
    loading: Flags,
}

impl CodeplugStore {
    /// `base_url` is the server root, e.g. `http://localhost:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client,
            base_url,
            channels: RwLock::default(),
            zones: RwLock::default(),
            scan_lists: RwLock::default(),
            talkgroups: RwLock::default(),
            dmr_contacts: RwLock::default(),
            loading: Flags::default(),
        }
    }

    pub fn channels(&self) -> Vec<Channel> {
        self.channels.read().unwrap().clone()
    }

    pub fn zones(&self) -> Vec<Zone> {
        self.zones.read().unwrap().clone()
    }

    pub fn scan_lists(&self) -> Vec<ScanList> {
        self.scan_lists.read().unwrap().clone()
    }

    pub fn talkgroups(&self) -> Vec<Contact> {
        self.talkgroups.read().unwrap().clone()
    }

    /// The directory page fetched last.
    pub fn dmr_contacts(&self) -> Vec<DigitalContact> {
        self.dmr_contacts.read().unwrap().clone()
    }

    pub fn is_loading(&self, collection: Collection) -> bool {
        self.loading.get(collection).load(Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let response = check(request.send().await?).await?;

        Ok(response.json().await?)
    }

    pub async fn fetch_channels(&self) {
        let _loading = Loading::start(&self.loading.channels);

        match self.send::<Vec<Channel>>(self.client.get(self.url("/channels"))).await {
            Ok(channels) => {
                debug!(count = channels.len(), "Fetched channels");
                *self.channels.write().unwrap() = channels;
            }
            Err(e) => error!("Failed to fetch channels: {}", e),
        }
    }

    pub async fn fetch_zones(&self) {
        let _loading = Loading::start(&self.loading.zones);

        match self.send::<Vec<Zone>>(self.client.get(self.url("/zones"))).await {
            Ok(zones) => *self.zones.write().unwrap() = zones,
            Err(e) => error!("Failed to fetch zones: {}", e),
        }
    }

    pub async fn fetch_scan_lists(&self) {
        let _loading = Loading::start(&self.loading.scan_lists);

        match self.send::<Vec<ScanList>>(self.client.get(self.url("/scanlists"))).await {
            Ok(lists) => *self.scan_lists.write().unwrap() = lists,
            Err(e) => error!("Failed to fetch scan lists: {}", e),
        }
    }

    pub async fn fetch_talkgroups(&self) {
        let _loading = Loading::start(&self.loading.talkgroups);

        // The server returns every user contact at once.
        let query = ContactsQuery {
            source: "User",
            page: None,
            limit: None,
            search: None,
            sort: None,
            order: None,
        };
        let request = self.client.get(self.url("/contacts")).query(&query);

        match self.send::<Page<Contact>>(request).await {
            Ok(page) => *self.talkgroups.write().unwrap() = page.data,
            Err(e) => error!("Failed to fetch talkgroups: {}", e),
        }
    }

    /// Fetches one page of the DMR user directory. On failure the cached page
    /// is kept and the returned meta reports no results.
    pub async fn fetch_dmr_contacts(
        &self,
        page: usize,
        limit: usize,
        search: Option<&str>,
        sort: Option<&str>,
        order: Option<&str>,
    ) -> PageMeta {
        let _loading = Loading::start(&self.loading.dmr_contacts);

        let query = ContactsQuery {
            source: "RadioID",
            page: Some(page),
            limit: Some(limit),
            search,
            sort,
            order,
        };
        let request = self.client.get(self.url("/contacts")).query(&query);

        match self.send::<Page<DigitalContact>>(request).await {
            Ok(result) => {
                *self.dmr_contacts.write().unwrap() = result.data;
                result.meta
            }
            Err(e) => {
                error!("Failed to fetch DMR contacts: {}", e);
                PageMeta {
                    total: 0,
                    page,
                    limit,
                }
            }
        }
    }

    pub async fn save_channel(&self, channel: &Channel) -> Result<Channel, ClientError> {
        let request = self.client.post(self.url("/channels")).json(channel);
        let saved = self.send::<Channel>(request).await?;

        info!(id = saved.id, name = %saved.name, "Saved channel");
        self.fetch_channels().await;

        Ok(saved)
    }

    pub async fn delete_channel(&self, id: Id) -> Result<(), ClientError> {
        let request = self.client.delete(self.url("/channels")).query(&[("id", id)]);
        check(request.send().await?).await?;

        info!(id, "Deleted channel");
        self.fetch_channels().await;

        Ok(())
    }

    /// Stores the zone's name, then its channels in their current order.
    pub async fn save_zone(&self, zone: &Zone) -> Result<Zone, ClientError> {
        let header = Zone {
            id: zone.id,
            name: zone.name.clone(),
            channels: Vec::new(),
        };
        let saved = self
            .send::<Zone>(self.client.post(self.url("/zones")).json(&header))
            .await?;

        let request = self
            .client
            .post(self.url("/zones/assign"))
            .query(&[("id", saved.id)])
            .json(&membership::ids(&zone.channels));
        let saved = self.send::<Zone>(request).await?;

        info!(id = saved.id, channels = saved.channels.len(), "Saved zone");
        self.fetch_zones().await;

        Ok(saved)
    }

    /// Stores the scan list's name, then its channels in their current order.
    pub async fn save_scan_list(&self, list: &ScanList) -> Result<ScanList, ClientError> {
        let header = ScanList {
            id: list.id,
            name: list.name.clone(),
            channels: Vec::new(),
        };
        let saved = self
            .send::<ScanList>(self.client.post(self.url("/scanlists")).json(&header))
            .await?;

        let assignment = ScanListAssignment {
            scan_list_id: saved.id,
            channel_ids: membership::ids(&list.channels),
        };
        let request = self
            .client
            .post(self.url("/scanlists/assign"))
            .json(&assignment);
        let saved = self.send::<ScanList>(request).await?;

        info!(id = saved.id, channels = saved.channels.len(), "Saved scan list");
        self.fetch_scan_lists().await;

        Ok(saved)
    }
}
