//! Named, durable saves of the whole newsletter.
//!
//! Records live as one JSON array under [`HISTORY_KEY`], newest first. Writes
//! degrade when the browser storage is full: drop the oldest records one by one,
//! then keep a single slim record of the newest save.

use crate::config::EditorConfig;
use crate::messages;
use crate::models::{ColumnItem, Document, Node, SectionBody};
use crate::render::{
    find_first_heading_text, find_title_sized_text, render_document, strip_tags, RenderMode,
};
use crate::storage::{load_json, save_json, upsert_lru_by_key, KeyValueStore, HISTORY_KEY};
use crate::util::{display_date, make_snapshot_id, now_ms, random_u32, truncate_chars};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct SnapshotRecord {
    pub id: String,
    pub name: String,
    pub content: String,
    pub date: String,
    #[serde(default)]
    pub preview: String,
    pub timestamp: i64,
    #[serde(rename = "lastAction", default)]
    pub last_action: String,
}

impl SnapshotRecord {
    fn is_valid(&self) -> bool {
        !self.name.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// How much of a save actually reached storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PersistOutcome {
    Full,
    /// Stored after dropping this many of the oldest records.
    Trimmed { evicted: usize },
    /// Only a stripped-down copy of the newest record was stored.
    Slim,
    NotPersisted,
}

/// Presentation markup of stored content. Content that is not a serialized
/// document is taken as markup as-is.
fn content_html(content: &str) -> String {
    match Document::from_json(content) {
        Ok(doc) => render_document(&doc, RenderMode::Export),
        Err(_) => content.to_string(),
    }
}

/// Display name of stored content.
pub fn derive_name(content: &str, fallback_chars: usize) -> String {
    name_from_html(&content_html(content), fallback_chars)
}

/// Title-sized text, else the first heading, else the start of the text.
pub fn name_from_html(html: &str, fallback_chars: usize) -> String {
    if let Some(title) = find_title_sized_text(html) {
        return title;
    }
    if let Some(heading) = find_first_heading_text(html) {
        return heading;
    }
    let text = truncate_chars(&strip_tags(html), fallback_chars);
    if text.trim().is_empty() {
        messages::UNTITLED.to_string()
    } else {
        text
    }
}

fn is_embedded(src: &str) -> bool {
    src.starts_with("data:") || src.starts_with("blob:")
}

/// Replace inline media with an empty source so the content stays a valid document.
fn strip_media(doc: &mut Document) {
    for block in &mut doc.blocks {
        match &mut block.node {
            Node::Image(img) if is_embedded(&img.src) => {
                img.src.clear();
                img.original_src = None;
                img.alt = messages::REMOVED_MEDIA.to_string();
            }
            Node::Section(s) => match &mut s.body {
                SectionBody::Gallery { items, .. } => {
                    for item in items {
                        if is_embedded(&item.image.src) {
                            item.image.src.clear();
                        }
                    }
                }
                SectionBody::TwoColumn { right, .. } => {
                    for item in right {
                        if let ColumnItem::Image(r) = item {
                            if is_embedded(&r.src) {
                                r.src.clear();
                            }
                        }
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }
}

/// Content for the last-resort record: media stripped and size capped.
fn slim_content(content: &str, limit: usize) -> String {
    let Ok(mut doc) = Document::from_json(content) else {
        return truncate_chars(content, limit);
    };
    strip_media(&mut doc);
    loop {
        match doc.to_json() {
            Ok(json) if json.len() <= limit || doc.is_empty() => return json,
            Ok(_) => {
                doc.blocks.pop();
            }
            Err(e) => {
                log::warn!("slim snapshot serialization failed: {e}");
                return String::new();
            }
        }
    }
}

pub struct SnapshotStore<S: KeyValueStore> {
    store: S,
    limit: usize,
    preview_chars: usize,
    name_fallback_chars: usize,
    slim_content_limit: usize,
}

impl<S: KeyValueStore> SnapshotStore<S> {
    pub fn new(store: S, cfg: &EditorConfig) -> Self {
        Self {
            store,
            limit: cfg.snapshot_limit,
            preview_chars: cfg.preview_chars,
            name_fallback_chars: cfg.name_fallback_chars,
            slim_content_limit: cfg.slim_content_limit,
        }
    }

    /// Valid records as stored, without reordering.
    fn read(&self) -> (Vec<SnapshotRecord>, usize) {
        let raw: Vec<serde_json::Value> = load_json(&self.store, HISTORY_KEY).unwrap_or_default();
        let total = raw.len();
        let records = raw
            .into_iter()
            .filter_map(|v| serde_json::from_value::<SnapshotRecord>(v).ok())
            .filter(SnapshotRecord::is_valid)
            .collect();
        (records, total)
    }

    /// Records newest first. Invalid entries are dropped and the cleaned list is written back.
    pub fn list(&self) -> Vec<SnapshotRecord> {
        let (mut records, total) = self.read();
        let was_sorted = records.windows(2).all(|w| w[0].timestamp >= w[1].timestamp);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        if records.len() != total || !was_sorted {
            log::debug!(
                "snapshot list cleaned: {} of {total} records kept",
                records.len()
            );
            if let Err(e) = save_json(&self.store, HISTORY_KEY, &records) {
                log::warn!("could not write back cleaned snapshot list: {e}");
            }
        }
        records
    }

    pub fn len(&self) -> usize {
        self.list().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &str) -> Option<SnapshotRecord> {
        self.list().into_iter().find(|r| r.id == id)
    }

    /// Content to put back into the editor. The caller asks for confirmation first.
    pub fn restore(&self, id: &str) -> Option<String> {
        self.get(id).map(|r| r.content)
    }

    pub fn save(
        &self,
        name: Option<&str>,
        content: &str,
        last_action: &str,
    ) -> (SnapshotRecord, PersistOutcome) {
        self.save_at(name, content, last_action, now_ms(), random_u32())
    }

    pub fn save_at(
        &self,
        name: Option<&str>,
        content: &str,
        last_action: &str,
        timestamp: i64,
        rand: u32,
    ) -> (SnapshotRecord, PersistOutcome) {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_name(content, self.name_fallback_chars));
        let preview = truncate_chars(&strip_tags(&content_html(content)), self.preview_chars);

        let record = SnapshotRecord {
            id: make_snapshot_id(timestamp, rand),
            name,
            content: content.to_string(),
            date: display_date(timestamp),
            preview,
            timestamp,
            last_action: last_action.to_string(),
        };

        let records = upsert_lru_by_key(self.list(), record.clone(), |a, b| a.id == b.id, self.limit);
        let outcome = self.persist(records);
        match outcome {
            PersistOutcome::Full => log::info!("snapshot `{}` saved", record.name),
            PersistOutcome::NotPersisted => {
                log::error!("snapshot `{}` could not be persisted", record.name)
            }
            other => log::warn!("snapshot `{}` saved degraded: {other:?}", record.name),
        }
        (record, outcome)
    }

    /// Write `records`, degrading on quota errors.
    fn persist(&self, mut records: Vec<SnapshotRecord>) -> PersistOutcome {
        let mut evicted = 0;
        loop {
            match save_json(&self.store, HISTORY_KEY, &records) {
                Ok(()) if evicted == 0 => return PersistOutcome::Full,
                Ok(()) => return PersistOutcome::Trimmed { evicted },
                Err(e) if e.is_quota() && records.len() > 1 => {
                    records.pop();
                    evicted += 1;
                }
                Err(e) if e.is_quota() => break,
                Err(e) => {
                    log::warn!("snapshot store unavailable: {e}");
                    return PersistOutcome::NotPersisted;
                }
            }
        }

        let Some(newest) = records.into_iter().next() else {
            return PersistOutcome::NotPersisted;
        };
        let slim = SnapshotRecord {
            content: slim_content(&newest.content, self.slim_content_limit),
            ..newest
        };
        match save_json(&self.store, HISTORY_KEY, &vec![slim]) {
            Ok(()) => PersistOutcome::Slim,
            Err(e) => {
                log::warn!("slim snapshot rejected: {e}");
                PersistOutcome::NotPersisted
            }
        }
    }

    /// Remove the given ids. Returns how many records went away.
    pub fn delete(&self, ids: &[String]) -> usize {
        let mut records = self.list();
        let before = records.len();
        records.retain(|r| !ids.contains(&r.id));
        let removed = before - records.len();
        if removed > 0 {
            if let Err(e) = save_json(&self.store, HISTORY_KEY, &records) {
                log::warn!("snapshot delete not persisted: {e}");
            }
        }
        removed
    }

    pub fn delete_all(&self) {
        self.store.remove(HISTORY_KEY);
    }

    /// Recompute every display name; rewrite the store when one changed.
    pub fn migrate_titles(&self) -> usize {
        let mut records = self.list();
        let mut changed = 0;
        for r in &mut records {
            let name = derive_name(&r.content, self.name_fallback_chars);
            if name != r.name {
                r.name = name;
                changed += 1;
            }
        }
        if changed > 0 {
            log::info!("renamed {changed} snapshots");
            if let Err(e) = save_json(&self.store, HISTORY_KEY, &records) {
                log::warn!("snapshot title migration not persisted: {e}");
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageNode;
    use crate::storage::MemoryStorage;
    use pretty_assertions::assert_eq;

    fn store(mem: &MemoryStorage) -> SnapshotStore<MemoryStorage> {
        SnapshotStore::new(mem.clone(), &EditorConfig::default())
    }

    fn content(nodes: Vec<Node>) -> String {
        Document::from_nodes(nodes).to_json().expect("serialize")
    }

    #[test]
    fn test_name_from_title_sized_text() {
        let c = content(vec![
            Node::paragraph("intro"),
            Node::paragraph(r#"<span style="font-size: 28px;">Promo Été</span>"#),
            Node::heading(2, "Actus"),
        ]);
        let (rec, outcome) = store(&MemoryStorage::new()).save_at(None, &c, "", 1, 1);
        assert_eq!(rec.name, "Promo Été");
        assert_eq!(outcome, PersistOutcome::Full);
    }

    #[test]
    fn test_name_from_heading_then_text() {
        let c = content(vec![Node::paragraph("intro"), Node::heading(2, "Actus")]);
        assert_eq!(derive_name(&c, 80), "Actus");

        let long = "x".repeat(100);
        assert_eq!(derive_name(&content(vec![Node::paragraph(long)]), 80).chars().count(), 80);
        assert_eq!(derive_name(&content(vec![]), 80), messages::UNTITLED);
    }

    #[test]
    fn test_list_capped_newest_first() {
        let mem = MemoryStorage::new();
        let s = store(&mem);
        let c = content(vec![Node::paragraph("p")]);
        for i in 0..201 {
            s.save_at(Some("n"), &c, messages::ACTION_SNAPSHOT, 1_000 + i, i as u32);
        }
        let list = s.list();
        assert_eq!(list.len(), 200);
        assert_eq!(list[0].timestamp, 1_200);
        assert!(list.iter().all(|r| r.timestamp != 1_000));
    }

    #[test]
    fn test_list_drops_invalid_records_and_writes_back() {
        let mem = MemoryStorage::new();
        mem.set(
            HISTORY_KEY,
            r#"[{"id":"a","name":"","content":"x","date":"","timestamp":1},
                {"id":"b","name":"B","content":"x","date":"","timestamp":5,"lastAction":"Instantané"},
                {"garbage":true},
                {"id":"c","name":"C","content":"y","date":"","timestamp":9}]"#,
        )
        .expect("seed");
        let s = store(&mem);
        let ids: Vec<_> = s.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "b"]);

        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&mem.get(HISTORY_KEY).expect("written back")).expect("json");
        assert_eq!(raw.len(), 2);
        assert_eq!(raw[1]["lastAction"], "Instantané");
    }

    #[test]
    fn test_delete_and_restore() {
        let s = store(&MemoryStorage::new());
        let (a, _) = s.save_at(Some("A"), "{\"blocks\":[]}", "", 1, 1);
        let (b, _) = s.save_at(Some("B"), "{\"blocks\":[]}", "", 2, 2);
        assert_eq!(s.restore(&a.id).as_deref(), Some("{\"blocks\":[]}"));
        assert_eq!(s.delete(&[a.id.clone(), "missing".to_string()]), 1);
        assert_eq!(s.get(&a.id), None);
        assert_eq!(s.get(&b.id).map(|r| r.name), Some("B".to_string()));
        s.delete_all();
        assert!(s.is_empty());
    }

    #[test]
    fn test_quota_evicts_oldest_first() {
        let mem = MemoryStorage::new();
        let s = store(&mem);
        let c = content(vec![Node::paragraph("p".repeat(200))]);
        for i in 0..5 {
            s.save_at(Some("n"), &c, "", i, i as u32);
        }
        let one_record = mem.get(HISTORY_KEY).map(|v| v.len() / 5).unwrap_or(0);
        mem.set_quota(Some(one_record * 3));

        let (_, outcome) = s.save_at(Some("n"), &c, "", 10, 10);
        assert!(matches!(outcome, PersistOutcome::Trimmed { .. }));
        let list = s.list();
        assert_eq!(list[0].timestamp, 10);
        assert!(list.len() < 6);
        assert!(list.iter().all(|r| r.timestamp != 0));
    }

    #[test]
    fn test_slim_record_when_nothing_else_fits() {
        let mem = MemoryStorage::with_quota(2_000);
        let s = store(&mem);
        let big = format!("data:image/png;base64,{}", "A".repeat(5_000));
        let c = content(vec![
            Node::heading(1, "Lettre"),
            Node::Image(ImageNode::new(big, 10, 10)),
        ]);
        let (_, outcome) = s.save_at(None, &c, messages::ACTION_MANUAL_SAVE, 1, 1);
        assert_eq!(outcome, PersistOutcome::Slim);

        let list = s.list();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Lettre");
        let doc = Document::from_json(&list[0].content).expect("slim content is a document");
        assert_eq!(doc.image_sources(), vec![String::new()]);
    }

    #[test]
    fn test_nothing_persisted_is_reported() {
        let mem = MemoryStorage::with_quota(10);
        let (_, outcome) = store(&mem).save_at(Some("n"), "{\"blocks\":[]}", "", 1, 1);
        assert_eq!(outcome, PersistOutcome::NotPersisted);
    }

    #[test]
    fn test_migrate_titles_rewrites_changed_names() {
        let mem = MemoryStorage::new();
        let s = store(&mem);
        let c = content(vec![Node::heading(2, "Actus")]);
        s.save_at(Some("old name"), &c, "", 1, 1);
        assert_eq!(s.migrate_titles(), 1);
        assert_eq!(s.list()[0].name, "Actus");
        assert_eq!(s.migrate_titles(), 0);
    }
}
