//! Tag block scanning for sheet headers.
//!
//! A tag line has the shape `{key: value}`. Keys are ASCII alphanumeric
//! plus `-`/`_`, matched case-insensitively and stored lowercased; values
//! are trimmed and may be empty.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagParseMode {
    /// Scan from the top and stop at the first line that is neither blank
    /// nor tag-shaped. The rest of the file is the song body.
    Strict,
    /// Legacy behavior: scan the whole file and collect every tag-shaped
    /// line, never stopping early.
    Lenient,
}

/// An ordered key→value mapping scoped to one sheet's header.
/// Duplicate keys keep the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct TagBlock {
    entries: Vec<(String, String)>,
}

impl TagBlock {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Resolve the first key of `keys` that is present with a non-empty
    /// trimmed value. Used for tag aliases such as `title`/`t`.
    pub fn first_of(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|k| self.get(k))
            .find(|v| !v.trim().is_empty())
    }

    fn insert_first_wins(&mut self, key: String, value: String) {
        if self.get(&key).is_none() {
            self.entries.push((key, value));
        }
    }
}

fn parse_tag_line(line: &str) -> Option<(String, String)> {
    let s = line.trim();
    let inner = s.strip_prefix('{')?.strip_suffix('}')?;
    let (key, value) = inner.split_once(':')?;
    let key = key.trim();
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some((key.to_ascii_lowercase(), value.trim().to_string()))
}

pub fn parse_tag_block(text: &str, mode: TagParseMode) -> TagBlock {
    let mut block = TagBlock::default();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_tag_line(line) {
            Some((key, value)) => block.insert_first_wins(key, value),
            None => match mode {
                TagParseMode::Strict => break,
                TagParseMode::Lenient => continue,
            },
        }
    }
    block
}
