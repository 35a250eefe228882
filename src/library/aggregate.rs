//! Canonical song aggregation.
//!
//! Sheets are folded into one accumulator per `song_uid` in pre-sorted
//! path order. Two distinct steps produce the canonical record:
//! field-level fill-gap merging while sheets stream in, and representative
//! selection once all sheets have been seen. The two must not be mixed:
//! representative fields come from a single persona's sheet unless the
//! merge-across policy is explicitly configured.

use crate::library::diagnostics::Diagnostics;
use crate::library::sheet::SheetRecord;
use crate::library::warn;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Files-map key for sheets that carry no persona tag. Reserved: it never
/// appears in the personas list.
pub const FALLBACK_PERSONA: &str = "_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepresentativePolicy {
    /// Representative fields come entirely from the representative
    /// persona's own sheet.
    SinglePersona,
    /// Legacy: representative fields fall back field-by-field to the
    /// fill-gap merged values when the representative sheet lacks them.
    MergeAcross,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SongOrder {
    /// Case-insensitive `(artist, title)`.
    ArtistTitle,
    /// `(title, artist, song_uid)`, case-sensitive.
    TitleArtist,
}

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Persona preferred for representative selection; empty means no
    /// preference.
    pub preferred_persona: String,
    pub representative: RepresentativePolicy,
}

#[derive(Debug, Clone, Default)]
struct PersonaMeta {
    uid: Option<String>,
    singer: Option<String>,
    duration: Option<String>,
    tempo: Option<i64>,
    key: Option<String>,
    capo: Option<String>,
}

impl PersonaMeta {
    fn from_record(record: &SheetRecord) -> PersonaMeta {
        PersonaMeta {
            uid: record.uid.clone(),
            singer: record.singer.clone(),
            duration: record.duration.clone(),
            tempo: record.tempo,
            key: record.key.clone(),
            capo: record.capo.clone(),
        }
    }
}

#[derive(Debug, Clone)]
struct SongAccumulator {
    song_uid: String,
    // fill-gap fields: first non-empty value across sheets wins
    title: Option<String>,
    artist: Option<String>,
    singer: Option<String>,
    duration: Option<String>,
    tempo: Option<i64>,
    key: Option<String>,
    capo: Option<String>,
    first_stem: String,
    personas: BTreeSet<String>,
    files: BTreeMap<String, String>,
    sheet_uids: BTreeMap<String, String>,
    meta_by_persona: BTreeMap<String, PersonaMeta>,
}

/// One canonical song, serialized into the index documents.
#[derive(Debug, Clone, Serialize)]
pub struct CanonicalSong {
    pub song_uid: String,
    pub uid: String,
    pub title: String,
    pub artist: String,
    pub personas: Vec<String>,
    pub singer: String,
    pub duration: String,
    pub tempo: Option<i64>,
    pub key: String,
    pub capo: String,
    pub files: BTreeMap<String, String>,
    pub sheet_uids: BTreeMap<String, String>,
}

/// Accumulation state threaded through one scan. Discarded at run end.
#[derive(Debug, Default)]
pub struct AggregateContext {
    by_song: BTreeMap<String, SongAccumulator>,
    pub orphans: Vec<String>,
}

fn fill_gap(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none()
        && let Some(v) = value
    {
        *slot = Some(v.clone());
    }
}

impl SongAccumulator {
    fn new(song_uid: &str, first_stem: &str) -> SongAccumulator {
        SongAccumulator {
            song_uid: song_uid.to_string(),
            title: None,
            artist: None,
            singer: None,
            duration: None,
            tempo: None,
            key: None,
            capo: None,
            first_stem: first_stem.to_string(),
            personas: BTreeSet::new(),
            files: BTreeMap::new(),
            sheet_uids: BTreeMap::new(),
            meta_by_persona: BTreeMap::new(),
        }
    }

    fn fill_gaps(&mut self, record: &SheetRecord) {
        fill_gap(&mut self.title, &record.title);
        fill_gap(&mut self.artist, &record.artist);
        fill_gap(&mut self.singer, &record.singer);
        fill_gap(&mut self.duration, &record.duration);
        fill_gap(&mut self.key, &record.key);
        fill_gap(&mut self.capo, &record.capo);
        if self.tempo.is_none() {
            self.tempo = record.tempo;
        }
    }

    fn file_sheet(&mut self, record: &SheetRecord, diag: &mut Diagnostics) {
        let persona_key = match record.persona.as_deref() {
            Some(p) => {
                self.personas.insert(p.to_string());
                p.to_string()
            }
            None => {
                diag.warn(format!(
                    "song {} sheet missing persona tag. Using fallback '{}': {}",
                    self.song_uid, FALLBACK_PERSONA, record.path
                ));
                warn::emit(
                    "PERSONA_FALLBACK",
                    "aggregate",
                    &self.song_uid,
                    &record.path,
                    "missing-persona-tag",
                );
                FALLBACK_PERSONA.to_string()
            }
        };

        if let Some(existing) = self.files.get(&persona_key) {
            if existing != &record.path {
                diag.counts.persona_collisions += 1;
                diag.warn(format!(
                    "song {} has multiple files for persona '{}'. Keeping first: {}; ignoring: {}",
                    self.song_uid, persona_key, existing, record.path
                ));
                warn::emit(
                    "PERSONA_COLLISION",
                    "aggregate",
                    &self.song_uid,
                    &record.path,
                    "first-bound-path-wins",
                );
            }
            // first-bound sheet keeps its uid and metadata as well
            return;
        }

        self.files.insert(persona_key.clone(), record.path.clone());
        if let Some(uid) = &record.uid {
            self.sheet_uids.insert(persona_key.clone(), uid.clone());
        }
        self.meta_by_persona
            .insert(persona_key, PersonaMeta::from_record(record));
    }

    fn into_canonical(self, opts: &AggregateOptions) -> CanonicalSong {
        let SongAccumulator {
            song_uid,
            title,
            artist,
            singer,
            duration,
            tempo,
            key,
            capo,
            first_stem,
            personas,
            files,
            sheet_uids,
            meta_by_persona,
        } = self;

        let persona_list: Vec<String> = personas.iter().cloned().collect();
        let rep_persona = if !opts.preferred_persona.is_empty()
            && personas.contains(&opts.preferred_persona)
        {
            opts.preferred_persona.clone()
        } else {
            persona_list
                .first()
                .cloned()
                .unwrap_or_else(|| FALLBACK_PERSONA.to_string())
        };

        let rep = meta_by_persona
            .get(&rep_persona)
            .cloned()
            .or_else(|| meta_by_persona.values().next().cloned())
            .unwrap_or_default();

        let (rep_uid, rep_singer, rep_duration, rep_tempo, rep_key, rep_capo) =
            match opts.representative {
                RepresentativePolicy::SinglePersona => {
                    (rep.uid, rep.singer, rep.duration, rep.tempo, rep.key, rep.capo)
                }
                RepresentativePolicy::MergeAcross => (
                    rep.uid,
                    rep.singer.or(singer),
                    rep.duration.or(duration),
                    rep.tempo.or(tempo),
                    rep.key.or(key),
                    rep.capo.or(capo),
                ),
            };

        CanonicalSong {
            song_uid,
            uid: rep_uid.unwrap_or_default(),
            title: title.unwrap_or(first_stem),
            artist: artist.unwrap_or_default(),
            personas: persona_list,
            singer: rep_singer.unwrap_or_default(),
            duration: rep_duration.unwrap_or_default(),
            tempo: rep_tempo,
            key: rep_key.unwrap_or_default(),
            capo: rep_capo.unwrap_or_default(),
            files,
            sheet_uids,
        }
    }
}

impl AggregateContext {
    pub fn new() -> AggregateContext {
        AggregateContext::default()
    }

    /// Fold one sheet in. Sheets must arrive in pre-sorted path order so
    /// that fill-gap merging is deterministic.
    pub fn insert(&mut self, record: &SheetRecord, diag: &mut Diagnostics) {
        let Some(song_uid) = record.song_uid.as_deref() else {
            self.orphans.push(record.path.clone());
            diag.counts.orphan_sheets += 1;
            diag.warn(format!("missing song_uid tag in: {}", record.path));
            warn::emit("ORPHAN_SHEET", "aggregate", "", &record.path, "missing-song-uid");
            return;
        };

        let acc = self
            .by_song
            .entry(song_uid.to_string())
            .or_insert_with(|| SongAccumulator::new(song_uid, &record.stem));

        acc.fill_gaps(record);
        acc.file_sheet(record, diag);

        if record.title.is_none() {
            diag.warn(format!(
                "song {} missing {{title:}} in {}",
                song_uid, record.path
            ));
        }
        if let Some(raw) = record.duration.as_deref()
            && record.duration_secs.is_none()
        {
            diag.warn(format!(
                "song {} has non-standard duration '{}' in {} (kept verbatim)",
                song_uid, raw, record.path
            ));
        }
        if record.artist.is_none() {
            diag.warn(format!(
                "song {} missing {{artist:}} in {}",
                song_uid, record.path
            ));
        }
    }

    pub fn song_uids(&self) -> BTreeSet<String> {
        self.by_song.keys().cloned().collect()
    }

    /// Representative selection, separate from fill-gap merging. Consumes
    /// the context; the returned list is unsorted (callers pick a
    /// comparator per output document).
    pub fn finalize(self, opts: &AggregateOptions, diag: &mut Diagnostics) -> Vec<CanonicalSong> {
        let songs: Vec<CanonicalSong> = self
            .by_song
            .into_values()
            .map(|acc| acc.into_canonical(opts))
            .collect();
        diag.counts.songs_indexed = songs.len();
        songs
    }
}

pub fn sort_songs(songs: &mut [CanonicalSong], order: SongOrder) {
    match order {
        SongOrder::ArtistTitle => songs.sort_by(|a, b| {
            (a.artist.to_lowercase(), a.title.to_lowercase())
                .cmp(&(b.artist.to_lowercase(), b.title.to_lowercase()))
        }),
        SongOrder::TitleArtist => songs.sort_by(|a, b| {
            (a.title.as_str(), a.artist.as_str(), a.song_uid.as_str()).cmp(&(
                b.title.as_str(),
                b.artist.as_str(),
                b.song_uid.as_str(),
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn opts() -> AggregateOptions {
        AggregateOptions {
            preferred_persona: String::new(),
            representative: RepresentativePolicy::SinglePersona,
        }
    }

    fn diag() -> Diagnostics {
        Diagnostics::begin(
            &PathBuf::from("/repo"),
            &PathBuf::from("/repo/songs"),
            &PathBuf::from("/repo/library/setlists.json"),
        )
    }

    fn sheet(song_uid: &str, persona: &str, path: &str) -> SheetRecord {
        SheetRecord {
            uid: None,
            song_uid: Some(song_uid.to_string()),
            title: None,
            artist: None,
            persona: if persona.is_empty() {
                None
            } else {
                Some(persona.to_string())
            },
            singer: None,
            duration: None,
            duration_secs: None,
            tempo: None,
            key: None,
            capo: None,
            path: path.to_string(),
            stem: "stem".to_string(),
        }
    }

    #[test]
    fn fill_gap_first_non_empty_value_wins() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut a = sheet("song-1", "Adam", "songs/a.cho");
        a.title = Some("Kept".into());
        let mut b = sheet("song-1", "Pete", "songs/b.cho");
        b.title = Some("Ignored".into());
        b.artist = Some("Filled Later".into());

        ctx.insert(&a, &mut d);
        ctx.insert(&b, &mut d);

        let songs = ctx.finalize(&opts(), &mut d);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Kept");
        assert_eq!(songs[0].artist, "Filled Later");
    }

    #[test]
    fn persona_set_is_deduped_and_sorted() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();
        ctx.insert(&sheet("song-1", "Pete", "songs/p.cho"), &mut d);
        ctx.insert(&sheet("song-1", "Adam", "songs/a.cho"), &mut d);
        ctx.insert(&sheet("song-1", "Adam", "songs/a.cho"), &mut d);

        let songs = ctx.finalize(&opts(), &mut d);
        assert_eq!(songs[0].personas, vec!["Adam", "Pete"]);
    }

    #[test]
    fn representative_fields_never_cross_personas() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut adam = sheet("song-42", "Adam", "songs/adam.cho");
        adam.title = Some("Test".into());
        let mut pete = sheet("song-42", "Pete", "songs/pete.cho");
        pete.title = Some("Test".into());
        pete.key = Some("G".into());

        ctx.insert(&adam, &mut d);
        ctx.insert(&pete, &mut d);

        let songs = ctx.finalize(&opts(), &mut d);
        assert_eq!(songs[0].personas, vec!["Adam", "Pete"]);
        // Adam is lexicographically first, so Adam's sheet is
        // representative, and Adam's sheet has no key.
        assert_eq!(songs[0].key, "");
    }

    #[test]
    fn merge_across_policy_borrows_from_other_personas() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut adam = sheet("song-42", "Adam", "songs/adam.cho");
        adam.title = Some("Test".into());
        let mut pete = sheet("song-42", "Pete", "songs/pete.cho");
        pete.key = Some("G".into());

        ctx.insert(&adam, &mut d);
        ctx.insert(&pete, &mut d);

        let merged = AggregateOptions {
            preferred_persona: String::new(),
            representative: RepresentativePolicy::MergeAcross,
        };
        let songs = ctx.finalize(&merged, &mut d);
        assert_eq!(songs[0].key, "G");
    }

    #[test]
    fn preferred_persona_is_representative_when_present() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut adam = sheet("song-1", "Adam", "songs/adam.cho");
        adam.uid = Some("uid-adam".into());
        let mut pete = sheet("song-1", "Pete", "songs/pete.cho");
        pete.uid = Some("uid-pete".into());

        ctx.insert(&adam, &mut d);
        ctx.insert(&pete, &mut d);

        let preferred = AggregateOptions {
            preferred_persona: "Pete".into(),
            representative: RepresentativePolicy::SinglePersona,
        };
        let songs = ctx.finalize(&preferred, &mut d);
        assert_eq!(songs[0].uid, "uid-pete");
    }

    #[test]
    fn persona_collision_keeps_first_path_and_counts() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut first = sheet("song-1", "Adam", "songs/first.cho");
        first.uid = Some("uid-first".into());
        let mut second = sheet("song-1", "Adam", "songs/second.cho");
        second.uid = Some("uid-second".into());

        ctx.insert(&first, &mut d);
        ctx.insert(&second, &mut d);

        let songs = ctx.finalize(&opts(), &mut d);
        assert_eq!(songs[0].files.get("Adam").map(String::as_str), Some("songs/first.cho"));
        assert_eq!(songs[0].uid, "uid-first");
        assert_eq!(d.counts.persona_collisions, 1);
    }

    #[test]
    fn missing_persona_files_under_fallback_key() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();
        ctx.insert(&sheet("song-1", "", "songs/bare.cho"), &mut d);

        let songs = ctx.finalize(&opts(), &mut d);
        assert!(songs[0].personas.is_empty());
        assert_eq!(
            songs[0].files.get(FALLBACK_PERSONA).map(String::as_str),
            Some("songs/bare.cho")
        );
        assert!(d.warnings.iter().any(|w| w.contains("_default")));
    }

    #[test]
    fn orphan_sheets_never_reach_canonical_songs() {
        let mut ctx = AggregateContext::new();
        let mut d = diag();

        let mut orphan = sheet("", "Adam", "songs/orphan.cho");
        orphan.song_uid = None;
        orphan.uid = Some("uid-orphan".into());

        ctx.insert(&orphan, &mut d);
        ctx.insert(&sheet("song-1", "Adam", "songs/real.cho"), &mut d);

        assert_eq!(ctx.orphans, vec!["songs/orphan.cho"]);
        let songs = ctx.finalize(&opts(), &mut d);
        assert_eq!(songs.len(), 1);
        assert!(songs[0].files.values().all(|p| p != "songs/orphan.cho"));
        assert_eq!(d.counts.orphan_sheets, 1);
    }

    #[test]
    fn comparators_order_both_ways() {
        let mk = |song_uid: &str, title: &str, artist: &str| CanonicalSong {
            song_uid: song_uid.into(),
            uid: String::new(),
            title: title.into(),
            artist: artist.into(),
            personas: Vec::new(),
            singer: String::new(),
            duration: String::new(),
            tempo: None,
            key: String::new(),
            capo: String::new(),
            files: BTreeMap::new(),
            sheet_uids: BTreeMap::new(),
        };

        let mut songs = vec![
            mk("song-1", "Zebra", "Abba"),
            mk("song-2", "Alpha", "zeppelin"),
        ];
        sort_songs(&mut songs, SongOrder::ArtistTitle);
        assert_eq!(songs[0].title, "Zebra");

        sort_songs(&mut songs, SongOrder::TitleArtist);
        assert_eq!(songs[0].title, "Alpha");
    }
}
