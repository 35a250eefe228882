use crate::library::diagnostics::Diagnostics;
use crate::library::sheet::SheetRecord;
use crate::library::tags::{TagParseMode, parse_tag_block};
use crate::library::warn;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const SHEET_EXTENSIONS: &[&str] = &["cho", "chopro", "pro"];

/// Collect every sheet file under `songs_dir`, sorted lexicographically.
/// Processing order is always this sorted list, never filesystem
/// enumeration order.
pub fn collect_sheet_files(songs_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(songs_dir).follow_links(true) {
        let entry =
            entry.with_context(|| format!("failed to walk {}", songs_dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if SHEET_EXTENSIONS.contains(&ext.as_str()) {
            files.push(entry.into_path());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

pub fn relative_sheet_path(repo_root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(repo_root).unwrap_or(file);
    rel.to_string_lossy().replace('\\', "/")
}

/// Parse every collected file into a `SheetRecord`. An unreadable file is
/// a warning, not an error; the run continues without it.
pub fn load_sheet_records(
    repo_root: &Path,
    files: &[PathBuf],
    mode: TagParseMode,
    diag: &mut Diagnostics,
) -> Vec<SheetRecord> {
    let mut records = Vec::with_capacity(files.len());
    for file in files {
        let rel = relative_sheet_path(repo_root, file);
        let raw = match fs::read(file) {
            Ok(raw) => raw,
            Err(err) => {
                diag.warn(format!("failed to read {rel}: {err}"));
                warn::emit("SHEET_READ_FAILED", "scan", "", &rel, "io-error");
                continue;
            }
        };
        let text = String::from_utf8_lossy(&raw);
        let tags = parse_tag_block(&text, mode);
        let stem = file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet");
        records.push(SheetRecord::from_tags(&tags, &rel, stem));
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn collects_supported_extensions_sorted() {
        let tmp = tempdir().expect("tempdir");
        let songs = tmp.path().join("songs");
        fs::create_dir_all(songs.join("sub")).expect("mkdir");
        fs::write(songs.join("b.cho"), "{title: B}\n").expect("write");
        fs::write(songs.join("sub/a.pro"), "{title: A}\n").expect("write");
        fs::write(songs.join("c.CHOPRO"), "{title: C}\n").expect("write");
        fs::write(songs.join("notes.txt"), "not a sheet\n").expect("write");

        let files = collect_sheet_files(&songs).expect("collect");
        let names: Vec<String> = files
            .iter()
            .map(|f| relative_sheet_path(tmp.path(), f))
            .collect();
        assert_eq!(names, vec!["songs/b.cho", "songs/c.CHOPRO", "songs/sub/a.pro"]);
    }

    #[test]
    fn records_carry_relative_slash_paths() {
        let tmp = tempdir().expect("tempdir");
        let songs = tmp.path().join("songs");
        fs::create_dir_all(&songs).expect("mkdir");
        fs::write(songs.join("one.cho"), "{song_uid: song-1}\n{uid: uid-1}\n")
            .expect("write");

        let files = collect_sheet_files(&songs).expect("collect");
        let mut diag = Diagnostics::begin(tmp.path(), &songs, &tmp.path().join("x"));
        let records = load_sheet_records(tmp.path(), &files, TagParseMode::Strict, &mut diag);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, "songs/one.cho");
        assert_eq!(records[0].stem, "one");
        assert_eq!(records[0].song_uid.as_deref(), Some("song-1"));
    }
}
