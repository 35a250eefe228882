use crate::library::tags::TagBlock;

/// Typed view of one sheet file's header. Produced once per file and
/// immutable afterwards; aggregation never reaches back into the tag block.
#[derive(Debug, Clone)]
pub struct SheetRecord {
    pub uid: Option<String>,
    pub song_uid: Option<String>,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub persona: Option<String>,
    pub singer: Option<String>,
    /// Raw duration tag, e.g. "3:35" or "215". Kept verbatim for output.
    pub duration: Option<String>,
    /// Parsed view of `duration` in seconds, when it parses.
    pub duration_secs: Option<u32>,
    pub tempo: Option<i64>,
    pub key: Option<String>,
    pub capo: Option<String>,
    /// Repo-relative path, `/`-separated.
    pub path: String,
    /// File stem, the last-resort title fallback.
    pub stem: String,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToOwned::to_owned)
}

/// An unparsable integer tag is an absent field, never an error.
pub fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

/// `M:SS`/`MM:SS` → total seconds, bare integer string → seconds,
/// anything else → `None` (the raw string stays available on the record).
pub fn parse_duration_secs(value: &str) -> Option<u32> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if let Some((mins, secs)) = v.split_once(':') {
        let mins = mins.trim().parse::<u32>().ok()?;
        let secs = secs.trim();
        if secs.is_empty() || secs.len() > 2 {
            return None;
        }
        let secs = secs.parse::<u32>().ok()?;
        return Some(mins * 60 + secs);
    }
    v.parse::<u32>().ok()
}

impl SheetRecord {
    pub fn from_tags(tags: &TagBlock, rel_path: &str, stem: &str) -> SheetRecord {
        let uid = non_empty(tags.get("uid"));
        // `songuid` is a legacy spelling still present in older sheets.
        let song_uid = non_empty(tags.first_of(&["song_uid", "songuid"]));

        let duration = non_empty(tags.get("duration"));
        let duration_secs = duration.as_deref().and_then(parse_duration_secs);

        SheetRecord {
            uid,
            song_uid,
            title: non_empty(tags.first_of(&["title", "t"])),
            artist: non_empty(tags.first_of(&["artist", "a"])),
            persona: non_empty(tags.first_of(&["persona", "version"])),
            singer: non_empty(tags.get("singer")),
            duration,
            duration_secs,
            tempo: tags.first_of(&["tempo", "bpm"]).and_then(parse_int),
            key: non_empty(tags.first_of(&["key", "k"])),
            capo: non_empty(tags.first_of(&["capo", "ca"])),
            path: rel_path.to_string(),
            stem: stem.to_string(),
        }
    }
}
