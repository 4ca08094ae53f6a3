//! Autosave slot for crash/reload recovery.
//!
//! The current content is mirrored to `localStorage` on every change, tagged
//! with the schema version. When that write fails the bridge switches to a
//! `sessionStorage` slot and stays there for the rest of the session.

use crate::storage::{KeyValueStore, StorageTiers, CONTENT_KEY, SESSION_CONTENT_KEY, VERSION_KEY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DraftSlot {
    Primary,
    Secondary,
}

impl DraftSlot {
    fn tier(self) -> usize {
        match self {
            DraftSlot::Primary => 0,
            DraftSlot::Secondary => 1,
        }
    }

    fn content_key(self) -> &'static str {
        match self {
            DraftSlot::Primary => CONTENT_KEY,
            DraftSlot::Secondary => SESSION_CONTENT_KEY,
        }
    }
}

pub struct DraftBridge<P: KeyValueStore, S: KeyValueStore> {
    primary: P,
    secondary: S,
    schema_version: String,
    slot: DraftSlot,
}

impl<P: KeyValueStore, S: KeyValueStore> DraftBridge<P, S> {
    pub fn new(primary: P, secondary: S, schema_version: impl Into<String>) -> Self {
        Self {
            primary,
            secondary,
            schema_version: schema_version.into(),
            slot: DraftSlot::Primary,
        }
    }

    /// Slot the next write goes to.
    pub fn slot(&self) -> DraftSlot {
        self.slot
    }

    fn store(&self, slot: DraftSlot) -> &dyn KeyValueStore {
        match slot {
            DraftSlot::Primary => &self.primary,
            DraftSlot::Secondary => &self.secondary,
        }
    }

    /// Mirror `content`. Failures are logged; the editing operation never fails because of them.
    pub fn write(&mut self, content: &str) -> Option<DraftSlot> {
        let tiers =
            StorageTiers::new(vec![&self.primary as &dyn KeyValueStore, &self.secondary]);
        let written = tiers.write_from(
            self.slot.tier(),
            |i| {
                if i == 0 {
                    CONTENT_KEY
                } else {
                    SESSION_CONTENT_KEY
                }
            },
            content,
        );

        let slot = match written {
            Some(0) => DraftSlot::Primary,
            Some(_) => DraftSlot::Secondary,
            None => {
                log::warn!("autosave skipped: no storage tier accepted the draft");
                return None;
            }
        };
        if slot != self.slot {
            log::info!("autosave switched to the session slot");
            self.slot = slot;
        }

        if let Err(e) = self.store(slot).set(VERSION_KEY, &self.schema_version) {
            log::warn!("autosave version tag not written: {e}");
        }
        Some(slot)
    }

    fn read(&self, slot: DraftSlot) -> Option<String> {
        let store = self.store(slot);
        let version = store.get(VERSION_KEY)?;
        if version != self.schema_version {
            return None;
        }
        store.get(slot.content_key())
    }

    fn clear_stale(&self, slot: DraftSlot) {
        let store = self.store(slot);
        let stale = match store.get(VERSION_KEY) {
            Some(v) => v != self.schema_version,
            None => store.get(slot.content_key()).is_some(),
        };
        if stale {
            log::debug!("clearing stale draft in {slot:?} slot");
            store.remove(slot.content_key());
            store.remove(VERSION_KEY);
        }
    }

    /// Draft to restore on load: primary first, then secondary, each only
    /// when its version tag matches. Stale slots are cleared.
    pub fn restore(&self) -> Option<String> {
        self.clear_stale(DraftSlot::Primary);
        self.clear_stale(DraftSlot::Secondary);
        self.read(DraftSlot::Primary)
            .or_else(|| self.read(DraftSlot::Secondary))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_write_then_restore() {
        let local = MemoryStorage::new();
        let mut bridge = DraftBridge::new(local.clone(), MemoryStorage::new(), "3");
        assert_eq!(bridge.write("{\"blocks\":[]}"), Some(DraftSlot::Primary));
        assert_eq!(local.get(VERSION_KEY).as_deref(), Some("3"));
        assert_eq!(bridge.restore().as_deref(), Some("{\"blocks\":[]}"));
    }

    #[test]
    fn test_fallback_is_sticky() {
        let local = MemoryStorage::with_quota(60);
        let session = MemoryStorage::new();
        let mut bridge = DraftBridge::new(local.clone(), session.clone(), "3");

        let big = "x".repeat(100);
        assert_eq!(bridge.write(&big), Some(DraftSlot::Secondary));
        // Fits the primary, but the bridge stays on the session slot.
        assert_eq!(bridge.write("small"), Some(DraftSlot::Secondary));
        assert_eq!(local.get(CONTENT_KEY), None);
        assert_eq!(session.get(SESSION_CONTENT_KEY).as_deref(), Some("small"));
        assert_eq!(bridge.restore().as_deref(), Some("small"));
    }

    #[test]
    fn test_version_mismatch_restores_nothing_and_clears() {
        let local = MemoryStorage::new();
        let session = MemoryStorage::new();
        DraftBridge::new(local.clone(), session.clone(), "2").write("old");
        session.set(SESSION_CONTENT_KEY, "old too").expect("seed");
        session.set(VERSION_KEY, "2").expect("seed");

        let bridge = DraftBridge::new(local.clone(), session.clone(), "3");
        assert_eq!(bridge.restore(), None);
        assert!(local.is_empty());
        assert!(session.is_empty());
    }

    #[test]
    fn test_untagged_draft_is_stale() {
        let local = MemoryStorage::new();
        local.set(CONTENT_KEY, "legacy").expect("seed");
        let bridge = DraftBridge::new(local.clone(), MemoryStorage::new(), "3");
        assert_eq!(bridge.restore(), None);
        assert_eq!(local.get(CONTENT_KEY), None);
    }
}
