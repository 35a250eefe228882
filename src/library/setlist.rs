//! Setlist document normalization, reference auditing, and the
//! uid → song_uid migration.
//!
//! Collections and sets are opaque passthrough structures; only the song
//! reference lists inside sets are rewritten. The source document is never
//! modified in place; migration always targets a new document.

use crate::error::LibraryError;
use crate::library::diagnostics::Diagnostics;
use crate::library::sheet::SheetRecord;
use serde_json::{Value, json};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

pub const SETLIST_CONTRACT: &str = "song_uid_v2";

/// uid → song_uid lookup over all sheets. Only pairs where both
/// identifiers are present survive; the first sheet seen for a uid wins.
pub fn build_uid_map(records: &[SheetRecord]) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for record in records {
        if let (Some(uid), Some(song_uid)) = (record.uid.as_deref(), record.song_uid.as_deref()) {
            map.entry(uid.to_string())
                .or_insert_with(|| song_uid.to_string());
        }
    }
    map
}

/// Normalize a setlist document into the canonical `{collections: [...]}`
/// shape. Shape A passes through (with `version` defaulted); Shape B
/// (`setlists: [...]`) is migrated entry-by-entry. Anything else is a
/// format error for this document only.
pub fn normalize_setlists(value: Value) -> Result<Value, LibraryError> {
    let Value::Object(mut obj) = value else {
        return Err(LibraryError::SetlistFormat(
            "document is not a JSON object".to_string(),
        ));
    };

    if obj.contains_key("collections") {
        if !matches!(obj.get("collections"), Some(Value::Array(_))) {
            return Err(LibraryError::SetlistFormat(
                "'collections' must be an array".to_string(),
            ));
        }
        obj.entry("version").or_insert(json!(1));
        return Ok(Value::Object(obj));
    }

    if let Some(setlists) = obj.remove("setlists") {
        let Value::Array(entries) = setlists else {
            return Err(LibraryError::SetlistFormat(
                "'setlists' must be an array".to_string(),
            ));
        };

        let mut collections = Vec::with_capacity(entries.len());
        for entry in entries {
            let get_str = |key: &str| {
                entry
                    .get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            };
            let id = get_str("id").or_else(|| get_str("name")).unwrap_or("");
            let name = get_str("name")
                .or_else(|| get_str("id"))
                .unwrap_or("Unnamed");
            collections.push(json!({
                "id": id,
                "type": "gig",
                "name": name,
                "notes": entry.get("notes").cloned().unwrap_or_else(|| json!("")),
                "sets": entry.get("sets").cloned().unwrap_or_else(|| json!([])),
            }));
        }

        let version = obj.get("version").cloned().unwrap_or_else(|| json!(1));
        return Ok(json!({ "version": version, "collections": collections }));
    }

    Err(LibraryError::SetlistFormat(
        "must contain either 'collections' or 'setlists'".to_string(),
    ))
}

/// Load and normalize the setlist document. A missing file is an empty
/// canonical document, not an error; an unreadable or unrecognized one is
/// a format error the caller records and degrades from.
pub fn load_setlists(path: &Path) -> Result<Value, LibraryError> {
    if !path.exists() {
        return Ok(json!({ "version": 1, "collections": [] }));
    }
    let raw = fs::read(path)
        .map_err(|err| LibraryError::SetlistFormat(format!("failed to read {}: {err}", path.display())))?;
    let value: Value = serde_json::from_slice(&raw)
        .map_err(|err| LibraryError::SetlistFormat(format!("failed to parse {}: {err}", path.display())))?;
    normalize_setlists(value)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationCounters {
    pub referenced: usize,
    pub replaced: usize,
    pub unresolved: usize,
    pub duplicates_removed: usize,
}

fn trimmed_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn migrate_reference(
    item: Value,
    uid_map: &BTreeMap<String, String>,
    known_songs: &BTreeSet<String>,
    counters: &mut MigrationCounters,
) -> (Value, Option<String>) {
    match item {
        Value::String(s) => {
            counters.referenced += 1;
            let token = s.trim().to_string();
            if let Some(mapped) = uid_map.get(&token) {
                if *mapped != token {
                    counters.replaced += 1;
                }
                (Value::String(mapped.clone()), Some(mapped.clone()))
            } else {
                if !token.is_empty() && !known_songs.contains(&token) {
                    counters.unresolved += 1;
                }
                // unknown token kept unchanged; migration never blanks
                (Value::String(token.clone()), Some(token))
            }
        }
        Value::Object(mut obj) => {
            counters.referenced += 1;
            let existing = trimmed_str(obj.get("song_uid"));
            let uid = trimmed_str(obj.get("uid"));

            let resolved = match (&existing, uid.as_deref()) {
                // an explicit song_uid is never overwritten
                (Some(song_uid), _) => Some(song_uid.clone()),
                (None, Some(uid)) => match uid_map.get(uid) {
                    Some(mapped) => {
                        obj.insert("song_uid".to_string(), json!(mapped));
                        counters.replaced += 1;
                        Some(mapped.clone())
                    }
                    None => {
                        if !known_songs.contains(uid) {
                            counters.unresolved += 1;
                        }
                        None
                    }
                },
                (None, None) => None,
            };

            let dedup_key = resolved.or(uid);
            (Value::Object(obj), dedup_key)
        }
        other => (other, None),
    }
}

/// Rewrite every reference in every set: bare uid strings become their
/// song_uid, structured references get `song_uid` filled when absent, and
/// each set is deduplicated by resulting key, first occurrence winning.
pub fn migrate_collections(
    collections: &mut [Value],
    uid_map: &BTreeMap<String, String>,
    known_songs: &BTreeSet<String>,
) -> MigrationCounters {
    let mut counters = MigrationCounters::default();

    for collection in collections.iter_mut() {
        let Some(sets) = collection.get_mut("sets").and_then(Value::as_array_mut) else {
            continue;
        };
        for set in sets {
            let Some(songs) = set.get_mut("songs").and_then(Value::as_array_mut) else {
                continue;
            };

            let mut migrated = Vec::with_capacity(songs.len());
            let mut seen: BTreeSet<String> = BTreeSet::new();
            for item in songs.drain(..) {
                let (item, dedup_key) =
                    migrate_reference(item, uid_map, known_songs, &mut counters);
                if let Some(key) = dedup_key
                    && !seen.insert(key)
                {
                    counters.duplicates_removed += 1;
                    continue;
                }
                migrated.push(item);
            }
            *songs = migrated;
        }
    }

    counters
}

fn reference_key(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => {
            let token = s.trim();
            (!token.is_empty()).then(|| token.to_string())
        }
        Value::Object(obj) => trimmed_str(obj.get("song_uid")).or_else(|| trimmed_str(obj.get("uid"))),
        _ => None,
    }
}

/// Consolidation-time audit: count references and warn on ids with no
/// matching canonical song. Read-only; nothing is rewritten here.
pub fn audit_references(collections: &[Value], known: &BTreeSet<String>, diag: &mut Diagnostics) {
    let mut unknown: BTreeSet<String> = BTreeSet::new();

    for collection in collections {
        let Some(sets) = collection.get("sets").and_then(Value::as_array) else {
            continue;
        };
        for set in sets {
            let Some(songs) = set.get("songs").and_then(Value::as_array) else {
                continue;
            };
            for item in songs {
                diag.counts.setlist_songs_referenced += 1;
                if let Some(key) = reference_key(item)
                    && !known.contains(&key)
                {
                    diag.counts.setlist_unresolved += 1;
                    unknown.insert(key);
                }
            }
        }
    }

    for key in unknown {
        diag.warn(format!("setlists reference unknown id: {key}"));
    }
}
