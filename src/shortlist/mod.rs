//! Saved-properties list owned by the client.
//!
//! The server has no authority over this state. Entries are snapshots of
//! properties taken when they were shortlisted; an entry whose auction date
//! has passed is dropped on the next read and the stored copy rewritten.

mod store;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::{debug, warn};
use uuid::Uuid;

pub use store::{FileStore, KeyValueStore, MemoryStore};

/// Storage key the shortlist is persisted under.
pub const STORAGE_KEY: &str = "dreambid_shortlist";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortlistEntry {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub auction_date: Option<OffsetDateTime>,
    /// Remaining snapshot fields, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ShortlistEntry {
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            cover_image_url: None,
            status: None,
            auction_date: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_auction_date(mut self, auction_date: OffsetDateTime) -> Self {
        self.auction_date = Some(auction_date);
        self
    }

    /// Entries without an auction date never expire.
    pub fn is_active_at(&self, now: OffsetDateTime) -> bool {
        self.auction_date.map_or(true, |date| date > now)
    }
}

pub struct Shortlist<S: KeyValueStore> {
    store: S,
    entries: Vec<ShortlistEntry>,
}

impl<S: KeyValueStore> Shortlist<S> {
    pub fn load(store: S) -> anyhow::Result<Self> {
        Self::load_at(store, OffsetDateTime::now_utc())
    }

    /// Missing or unreadable data yields an empty list.
    pub fn load_at(store: S, now: OffsetDateTime) -> anyhow::Result<Self> {
        let entries = match store.get(STORAGE_KEY)? {
            Some(raw) => serde_json::from_str::<Vec<ShortlistEntry>>(&raw).unwrap_or_else(|e| {
                warn!(error = %e, "discarding unreadable shortlist");
                Vec::new()
            }),
            None => Vec::new(),
        };
        let mut shortlist = Self { store, entries };
        shortlist.prune(now)?;
        Ok(shortlist)
    }

    /// Active entries, in insertion order.
    pub fn entries(&mut self) -> anyhow::Result<&[ShortlistEntry]> {
        self.entries_at(OffsetDateTime::now_utc())
    }

    pub fn entries_at(&mut self, now: OffsetDateTime) -> anyhow::Result<&[ShortlistEntry]> {
        self.prune(now)?;
        Ok(&self.entries)
    }

    /// Adds the entry, or removes it if its id is already present. Returns
    /// whether the property is shortlisted afterwards.
    pub fn toggle(&mut self, entry: ShortlistEntry) -> anyhow::Result<bool> {
        let shortlisted = match self.entries.iter().position(|e| e.id == entry.id) {
            Some(idx) => {
                self.entries.remove(idx);
                false
            }
            None => {
                self.entries.push(entry);
                true
            }
        };
        self.persist()?;
        Ok(shortlisted)
    }

    pub fn is_shortlisted(&self, id: Uuid) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.entries.clear();
        self.persist()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn prune(&mut self, now: OffsetDateTime) -> anyhow::Result<()> {
        let before = self.entries.len();
        self.entries.retain(|e| e.is_active_at(now));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            debug!(dropped, "expired shortlist entries removed");
            self.persist()?;
        }
        Ok(())
    }

    fn persist(&self) -> anyhow::Result<()> {
        let raw = serde_json::to_string(&self.entries)?;
        self.store.set(STORAGE_KEY, &raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2026-10-18 10:00 UTC);

    fn stored(list: &Shortlist<MemoryStore>) -> Option<String> {
        list.store().get(STORAGE_KEY).unwrap()
    }

    #[test]
    fn toggle_twice_restores_membership_and_storage() {
        let mut list = Shortlist::load_at(MemoryStore::new(), NOW).unwrap();
        let villa = ShortlistEntry::new(Uuid::new_v4(), "Sea-facing villa")
            .with_auction_date(datetime!(2026-12-01 00:00 UTC));
        list.toggle(villa.clone()).unwrap();
        let before = stored(&list);
        let before_ids: Vec<Uuid> = list.entries_at(NOW).unwrap().iter().map(|e| e.id).collect();

        let flat = ShortlistEntry::new(Uuid::new_v4(), "2BHK flat");
        assert!(list.toggle(flat.clone()).unwrap());
        assert!(list.is_shortlisted(flat.id));
        assert!(!list.toggle(flat.clone()).unwrap());

        let after_ids: Vec<Uuid> = list.entries_at(NOW).unwrap().iter().map(|e| e.id).collect();
        assert_eq!(before_ids, after_ids);
        assert_eq!(stored(&list), before);
        assert!(!list.is_shortlisted(flat.id));
    }

    #[test]
    fn expired_entries_disappear_on_next_read() {
        let mut list = Shortlist::load_at(MemoryStore::new(), NOW).unwrap();
        let soon = ShortlistEntry::new(Uuid::new_v4(), "Plot in Pune")
            .with_auction_date(datetime!(2026-10-18 12:00 UTC));
        let undated = ShortlistEntry::new(Uuid::new_v4(), "Shop unit");
        list.toggle(soon.clone()).unwrap();
        list.toggle(undated.clone()).unwrap();
        assert_eq!(list.entries_at(NOW).unwrap().len(), 2);

        let later = datetime!(2026-10-18 12:00 UTC);
        let active = list.entries_at(later).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, undated.id);

        let persisted: Vec<ShortlistEntry> = serde_json::from_str(&stored(&list).unwrap()).unwrap();
        assert_eq!(persisted, vec![undated]);
    }

    #[test]
    fn load_drops_expired_and_rewrites() {
        let store = MemoryStore::new();
        let past = ShortlistEntry::new(Uuid::new_v4(), "Old auction")
            .with_auction_date(datetime!(2026-01-01 00:00 UTC));
        let future = ShortlistEntry::new(Uuid::new_v4(), "New auction")
            .with_auction_date(datetime!(2027-01-01 00:00 UTC));
        store
            .set(STORAGE_KEY, &serde_json::to_string(&vec![past, future.clone()]).unwrap())
            .unwrap();

        let list = Shortlist::load_at(store, NOW).unwrap();
        assert_eq!(list.count(), 1);
        let persisted: Vec<ShortlistEntry> = serde_json::from_str(&stored(&list).unwrap()).unwrap();
        assert_eq!(persisted, vec![future]);
    }

    #[test]
    fn corrupt_storage_loads_empty() {
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, "{not json").unwrap();
        let list = Shortlist::load_at(store, NOW).unwrap();
        assert_eq!(list.count(), 0);
    }

    #[test]
    fn snapshot_fields_survive_round_trip() {
        let raw = r#"[{"id":"6f1c1a8e-4a43-4c1e-9d7a-0c7a2f9b1e11","title":"Farmhouse","auction_date":"2027-03-01T10:00:00Z","reserve_price":4500000,"city":"Nashik"}]"#;
        let store = MemoryStore::new();
        store.set(STORAGE_KEY, raw).unwrap();

        let mut list = Shortlist::load_at(store, NOW).unwrap();
        let entry = &list.entries_at(NOW).unwrap()[0];
        assert_eq!(entry.extra["city"], "Nashik");
        assert_eq!(entry.extra["reserve_price"], serde_json::json!(4_500_000));

        list.clear().unwrap();
        assert_eq!(stored(&list).as_deref(), Some("[]"));
    }
}
