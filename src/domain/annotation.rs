//! Per-ticker tags and notes, persisted as one JSON blob.
//!
//! A ticker's annotation is global: it follows the ticker across every date
//! and market it appears on. Records are created lazily on the first write
//! and only disappear through [`AnnotationStore::delete`] or a wholesale
//! [`AnnotationStore::import`].

use crate::domain::error::{KrxError, ParseError};
use crate::ports::storage_port::StoragePort;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Storage key the annotation blob lives under unless configured otherwise.
pub const DEFAULT_STORAGE_KEY: &str = "krx-memos";

/// Window within which an annotation counts as recently edited.
pub const RECENT_EDIT_HOURS: i64 = 24;

/// Source of "now" for stamping `updatedAt`.
pub type Clock = fn() -> DateTime<Utc>;

/// Wall clock truncated to milliseconds, the precision the blob stores.
pub fn system_clock() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| Some(dt.with_timezone(&Utc)))
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Tags and free-form note attached to one ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Display order is insertion order; duplicates are never stored.
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: String,
    #[serde(
        rename = "updatedAt",
        default,
        with = "iso_millis",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Annotation {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn has_note(&self) -> bool {
        !self.note.is_empty()
    }

    /// No tags and no note. Such records may linger until deleted.
    pub fn is_blank(&self) -> bool {
        self.tags.is_empty() && self.note.is_empty()
    }

    pub fn is_recently_updated_at(&self, now: DateTime<Utc>) -> bool {
        match self.updated_at {
            Some(updated) => now - updated < Duration::hours(RECENT_EDIT_HOURS),
            None => false,
        }
    }
}

/// An annotation paired with its ticker, as listed in tag groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaggedAnnotation {
    pub ticker: String,
    pub tags: Vec<String>,
    pub note: String,
    #[serde(rename = "updatedAt", with = "iso_millis")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaggedAnnotation {
    fn new(ticker: &str, annotation: &Annotation) -> Self {
        Self {
            ticker: ticker.to_string(),
            tags: annotation.tags.clone(),
            note: annotation.note.clone(),
            updated_at: annotation.updated_at,
        }
    }
}

/// Every stored annotation, keyed by ticker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationTable {
    entries: BTreeMap<String, Annotation>,
}

impl AnnotationTable {
    pub fn from_json(text: &str) -> Result<Self, ParseError> {
        serde_json::from_str(text).map_err(ParseError::from)
    }

    /// Stored record, or the empty default for unknown tickers.
    pub fn get(&self, ticker: &str) -> Annotation {
        self.entries.get(ticker).cloned().unwrap_or_default()
    }

    pub fn lookup(&self, ticker: &str) -> Option<&Annotation> {
        self.entries.get(ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.entries.contains_key(ticker)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Annotation)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Union of all tags, sorted lexicographically.
    pub fn all_tags(&self) -> Vec<String> {
        let set: BTreeSet<&str> = self
            .entries
            .values()
            .flat_map(|a| a.tags.iter().map(String::as_str))
            .collect();
        set.into_iter().map(str::to_string).collect()
    }

    /// One entry per (ticker, tag) pair.
    pub fn group_by_tag(&self) -> BTreeMap<String, Vec<TaggedAnnotation>> {
        let mut groups: BTreeMap<String, Vec<TaggedAnnotation>> = BTreeMap::new();
        for (ticker, annotation) in &self.entries {
            for tag in &annotation.tags {
                groups
                    .entry(tag.clone())
                    .or_default()
                    .push(TaggedAnnotation::new(ticker, annotation));
            }
        }
        groups
    }

    /// Tickers without tags that still carry a note.
    pub fn untagged_notes(&self) -> Vec<TaggedAnnotation> {
        self.entries
            .iter()
            .filter(|(_, a)| a.tags.is_empty() && a.has_note())
            .map(|(ticker, a)| TaggedAnnotation::new(ticker, a))
            .collect()
    }

    pub(crate) fn insert(&mut self, ticker: &str, annotation: Annotation) {
        self.entries.insert(ticker.to_string(), annotation);
    }

    pub(crate) fn remove(&mut self, ticker: &str) -> Option<Annotation> {
        self.entries.remove(ticker)
    }
}

/// Write-through annotation store over a single storage key.
///
/// Reads are served from the in-memory table loaded at [`open`](Self::open).
/// Each mutation serializes a modified copy and only adopts it once the
/// backend write succeeds, so a failed write leaves state untouched.
pub struct AnnotationStore<S: StoragePort> {
    storage: S,
    key: String,
    table: AnnotationTable,
    clock: Clock,
}

impl<S: StoragePort> AnnotationStore<S> {
    pub fn open(storage: S, key: &str) -> Result<Self, KrxError> {
        let table = match storage.get(key)? {
            Some(raw) if !raw.trim().is_empty() => {
                AnnotationTable::from_json(&raw).map_err(|e| KrxError::Storage {
                    reason: format!("stored annotations under '{key}' are corrupt: {e}"),
                })?
            }
            _ => AnnotationTable::default(),
        };
        Ok(Self {
            storage,
            key: key.to_string(),
            table,
            clock: system_clock,
        })
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn get(&self, ticker: &str) -> Annotation {
        self.table.get(ticker)
    }

    pub fn get_all(&self) -> &AnnotationTable {
        &self.table
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.table.all_tags()
    }

    pub fn group_by_tag(&self) -> BTreeMap<String, Vec<TaggedAnnotation>> {
        self.table.group_by_tag()
    }

    pub fn is_recently_updated(&self, annotation: &Annotation) -> bool {
        annotation.is_recently_updated_at(self.now())
    }

    /// Whole-record write. Stamps `updatedAt` only when the record has none.
    pub fn set(&mut self, ticker: &str, mut annotation: Annotation) -> Result<(), KrxError> {
        if annotation.updated_at.is_none() {
            annotation.updated_at = Some(self.now());
        }
        self.write(ticker, annotation)
    }

    /// Appends `tag` unless already present. Returns whether it was added.
    pub fn add_tag(&mut self, ticker: &str, tag: &str) -> Result<bool, KrxError> {
        let mut annotation = self.get(ticker);
        if annotation.has_tag(tag) {
            return Ok(false);
        }
        annotation.tags.push(tag.to_string());
        annotation.updated_at = Some(self.now());
        self.write(ticker, annotation)?;
        Ok(true)
    }

    /// Replaces the tag list, dropping repeats after their first occurrence.
    pub fn set_tags(&mut self, ticker: &str, tags: &[String]) -> Result<(), KrxError> {
        let mut annotation = self.get(ticker);
        annotation.tags.clear();
        for tag in tags {
            if !annotation.has_tag(tag) {
                annotation.tags.push(tag.clone());
            }
        }
        annotation.updated_at = Some(self.now());
        self.write(ticker, annotation)
    }

    /// Removes `tag` if present. `updatedAt` is stamped even when nothing
    /// was removed. Returns whether the tag existed.
    pub fn remove_tag(&mut self, ticker: &str, tag: &str) -> Result<bool, KrxError> {
        let mut annotation = self.get(ticker);
        let before = annotation.tags.len();
        annotation.tags.retain(|t| t != tag);
        let removed = annotation.tags.len() != before;
        annotation.updated_at = Some(self.now());
        self.write(ticker, annotation)?;
        Ok(removed)
    }

    pub fn set_note(&mut self, ticker: &str, note: &str) -> Result<(), KrxError> {
        let mut annotation = self.get(ticker);
        annotation.note = note.to_string();
        annotation.updated_at = Some(self.now());
        self.write(ticker, annotation)
    }

    /// Drops the whole record. Returns whether one existed.
    pub fn delete(&mut self, ticker: &str) -> Result<bool, KrxError> {
        if !self.table.contains(ticker) {
            return Ok(false);
        }
        let mut next = self.table.clone();
        next.remove(ticker);
        self.commit(next)?;
        Ok(true)
    }

    /// Pretty-printed JSON of the full table, re-importable as is.
    pub fn export(&self) -> Result<String, KrxError> {
        serde_json::to_string_pretty(&self.table).map_err(|e| KrxError::Storage {
            reason: format!("failed to serialize annotations: {e}"),
        })
    }

    /// Parses `text` and replaces the whole table. On a parse error the
    /// current table is kept.
    pub fn import(&mut self, text: &str) -> Result<(), KrxError> {
        let next = AnnotationTable::from_json(text)?;
        self.commit(next)
    }

    fn write(&mut self, ticker: &str, annotation: Annotation) -> Result<(), KrxError> {
        let mut next = self.table.clone();
        next.insert(ticker, annotation);
        self.commit(next)
    }

    fn commit(&mut self, next: AnnotationTable) -> Result<(), KrxError> {
        let blob = serde_json::to_string(&next).map_err(|e| KrxError::Storage {
            reason: format!("failed to serialize annotations: {e}"),
        })?;
        self.storage.set(&self.key, &blob)?;
        self.table = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory_storage_adapter::MemoryStorageAdapter;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 11, 9, 0, 0).unwrap()
    }

    fn later_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 12, 9, 30, 0).unwrap()
    }

    fn store() -> AnnotationStore<MemoryStorageAdapter> {
        AnnotationStore::open(MemoryStorageAdapter::new(), DEFAULT_STORAGE_KEY)
            .unwrap()
            .with_clock(fixed_now)
    }

    #[test]
    fn get_unknown_ticker_is_default() {
        let s = store();
        let a = s.get("XYZ");
        assert!(a.tags.is_empty());
        assert_eq!(a.note, "");
        assert_eq!(a.updated_at, None);
        assert!(!s.get_all().contains("XYZ"));
    }

    #[test]
    fn add_tag_is_idempotent() {
        let mut s = store();
        assert!(s.add_tag("005930", "watch").unwrap());
        assert!(!s.add_tag("005930", "watch").unwrap());
        assert_eq!(s.get("005930").tags, vec!["watch"]);
        assert_eq!(s.get("005930").updated_at, Some(fixed_now()));
    }

    #[test]
    fn add_tag_does_not_restamp_when_present() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        let mut s = s.with_clock(later_now);
        s.add_tag("005930", "watch").unwrap();
        assert_eq!(s.get("005930").updated_at, Some(fixed_now()));
    }

    #[test]
    fn tags_keep_insertion_order() {
        let mut s = store();
        s.add_tag("000660", "semis").unwrap();
        s.add_tag("000660", "ai").unwrap();
        s.add_tag("000660", "hbm").unwrap();
        assert_eq!(s.get("000660").tags, vec!["semis", "ai", "hbm"]);
    }

    #[test]
    fn remove_tag_stamps_even_when_absent() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        let mut s = s.with_clock(later_now);
        assert!(!s.remove_tag("005930", "missing").unwrap());
        let a = s.get("005930");
        assert_eq!(a.tags, vec!["watch"]);
        assert_eq!(a.updated_at, Some(later_now()));
    }

    #[test]
    fn remove_tag_removes_existing() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        s.add_tag("005930", "long").unwrap();
        assert!(s.remove_tag("005930", "watch").unwrap());
        assert_eq!(s.get("005930").tags, vec!["long"]);
    }

    #[test]
    fn removing_last_tag_keeps_blank_record() {
        let mut s = store();
        s.add_tag("035420", "x").unwrap();
        s.remove_tag("035420", "x").unwrap();
        assert!(s.get_all().contains("035420"));
        assert!(s.get("035420").is_blank());
    }

    #[test]
    fn set_tags_replaces_and_dedups() {
        let mut s = store();
        s.add_tag("005930", "old").unwrap();
        s.set_tags(
            "005930",
            &["b".to_string(), "a".to_string(), "b".to_string()],
        )
        .unwrap();
        assert_eq!(s.get("005930").tags, vec!["b", "a"]);
    }

    #[test]
    fn set_note_replaces_and_stamps() {
        let mut s = store();
        s.set_note("005930", "first").unwrap();
        let mut s = s.with_clock(later_now);
        s.set_note("005930", "second").unwrap();
        let a = s.get("005930");
        assert_eq!(a.note, "second");
        assert_eq!(a.updated_at, Some(later_now()));
    }

    #[test]
    fn set_keeps_existing_stamp() {
        let mut s = store();
        let a = Annotation {
            tags: vec!["x".into()],
            note: String::new(),
            updated_at: Some(later_now()),
        };
        s.set("111111", a).unwrap();
        assert_eq!(s.get("111111").updated_at, Some(later_now()));
        s.set("222222", Annotation::default()).unwrap();
        assert_eq!(s.get("222222").updated_at, Some(fixed_now()));
    }

    #[test]
    fn delete_removes_record() {
        let mut s = store();
        s.set_note("005930", "note").unwrap();
        assert!(s.delete("005930").unwrap());
        assert!(!s.delete("005930").unwrap());
        assert!(s.get_all().is_empty());
    }

    #[test]
    fn all_tags_sorted_union() {
        let mut s = store();
        s.add_tag("A", "zeta").unwrap();
        s.add_tag("B", "alpha").unwrap();
        s.add_tag("B", "zeta").unwrap();
        assert_eq!(s.all_tags(), vec!["alpha", "zeta"]);
    }

    #[test]
    fn group_by_tag_single_watch() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        assert_eq!(s.all_tags(), vec!["watch"]);
        let groups = s.group_by_tag();
        let watch = &groups["watch"];
        assert_eq!(watch.len(), 1);
        assert_eq!(watch[0].ticker, "005930");
    }

    #[test]
    fn group_by_tag_lists_ticker_per_tag() {
        let mut s = store();
        s.add_tag("A", "t1").unwrap();
        s.add_tag("A", "t2").unwrap();
        s.add_tag("B", "t1").unwrap();
        let groups = s.group_by_tag();
        assert_eq!(groups.len(), 2);
        let t1: Vec<&str> = groups["t1"].iter().map(|g| g.ticker.as_str()).collect();
        assert_eq!(t1, vec!["A", "B"]);
        assert_eq!(groups["t2"][0].tags, vec!["t1", "t2"]);
    }

    #[test]
    fn untagged_notes_excludes_blank_and_tagged() {
        let mut s = store();
        s.set_note("A", "only note").unwrap();
        s.add_tag("B", "t").unwrap();
        s.set_note("B", "tagged note").unwrap();
        s.add_tag("C", "x").unwrap();
        s.remove_tag("C", "x").unwrap();
        let untagged = s.get_all().untagged_notes();
        assert_eq!(untagged.len(), 1);
        assert_eq!(untagged[0].ticker, "A");
    }

    #[test]
    fn export_is_pretty_and_uses_camel_case_stamp() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        let json = s.export().unwrap();
        assert!(json.contains("\n  \"005930\": {"));
        assert!(json.contains("\"updatedAt\": \"2025-02-11T09:00:00.000Z\""));
    }

    #[test]
    fn export_import_round_trip() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        s.set_note("000660", "hbm").unwrap();
        let exported = s.export().unwrap();

        let mut other = AnnotationStore::open(MemoryStorageAdapter::new(), DEFAULT_STORAGE_KEY)
            .unwrap()
            .with_clock(later_now);
        other.add_tag("999999", "gone").unwrap();
        other.import(&exported).unwrap();
        assert_eq!(other.get_all(), s.get_all());
        assert_eq!(other.export().unwrap(), exported);
    }

    #[test]
    fn import_failure_leaves_state_untouched() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        let before = s.get_all().clone();
        let blob_before = s.storage().get(DEFAULT_STORAGE_KEY).unwrap();
        let err = s.import("{ not json").unwrap_err();
        assert!(matches!(err, KrxError::Import(_)));
        assert_eq!(s.get_all(), &before);
        assert_eq!(s.storage().get(DEFAULT_STORAGE_KEY).unwrap(), blob_before);
    }

    #[test]
    fn import_rejects_wrong_shape() {
        let mut s = store();
        assert!(s.import(r#"{"005930": {"tags": "watch"}}"#).is_err());
        assert!(s.import(r#"[1, 2, 3]"#).is_err());
    }

    #[test]
    fn import_accepts_partial_records() {
        let mut s = store();
        s.import(r#"{"005930": {"note": "n"}, "000660": {"tags": ["a"], "updatedAt": ""}}"#)
            .unwrap();
        assert_eq!(s.get("005930").note, "n");
        assert!(s.get("005930").tags.is_empty());
        assert_eq!(s.get("000660").updated_at, None);
    }

    #[test]
    fn open_reads_existing_blob() {
        let mut storage = MemoryStorageAdapter::new();
        storage
            .set(
                DEFAULT_STORAGE_KEY,
                r#"{"005930":{"tags":["watch"],"note":"","updatedAt":"2025-02-11T09:00:00.000Z"}}"#,
            )
            .unwrap();
        let s = AnnotationStore::open(storage, DEFAULT_STORAGE_KEY).unwrap();
        assert_eq!(s.get("005930").tags, vec!["watch"]);
        assert_eq!(s.get("005930").updated_at, Some(fixed_now()));
    }

    #[test]
    fn open_rejects_corrupt_blob() {
        let mut storage = MemoryStorageAdapter::new();
        storage.set(DEFAULT_STORAGE_KEY, "{{{").unwrap();
        let result = AnnotationStore::open(storage, DEFAULT_STORAGE_KEY);
        assert!(matches!(result, Err(KrxError::Storage { .. })));
    }

    #[test]
    fn mutations_write_through_to_storage() {
        let mut s = store();
        s.add_tag("005930", "watch").unwrap();
        let raw = s.storage().get(DEFAULT_STORAGE_KEY).unwrap().unwrap();
        let reloaded = AnnotationTable::from_json(&raw).unwrap();
        assert_eq!(&reloaded, s.get_all());
    }

    #[test]
    fn recently_updated_window() {
        let s = store();
        let fresh = Annotation {
            updated_at: Some(fixed_now() - Duration::hours(23)),
            ..Default::default()
        };
        let stale = Annotation {
            updated_at: Some(fixed_now() - Duration::hours(24)),
            ..Default::default()
        };
        assert!(s.is_recently_updated(&fresh));
        assert!(!s.is_recently_updated(&stale));
        assert!(!s.is_recently_updated(&Annotation::default()));
    }
}
