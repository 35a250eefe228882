use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Write a JSON document atomically: stage at a temporary path in the
/// destination directory, then promote over the final path. A concurrent
/// reader never observes a partially written file.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut staged = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage a temp file in {}", parent.display()))?;
    let data = serde_json::to_string_pretty(value)?;
    staged.write_all(data.as_bytes())?;
    staged.write_all(b"\n")?;
    staged
        .persist(path)
        .with_context(|| format!("failed to promote {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn writes_parseable_json_with_trailing_newline() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("out/doc.json");
        write_json_atomic(&path, &json!({"a": 1})).expect("write");

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with('\n'));
        let value: Value = serde_json::from_str(&raw).expect("parse");
        assert_eq!(value["a"], 1);
    }

    #[test]
    fn rewrites_are_byte_identical_and_leave_no_staging_files() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("doc.json");
        let doc = json!({"songs": ["a", "b"]});

        write_json_atomic(&path, &doc).expect("first write");
        let first = fs::read(&path).expect("read first");
        write_json_atomic(&path, &doc).expect("second write");
        let second = fs::read(&path).expect("read second");
        assert_eq!(first, second);

        let leftovers = fs::read_dir(tmp.path())
            .expect("read dir")
            .filter_map(|e| e.ok())
            .count();
        assert_eq!(leftovers, 1);
    }
}
