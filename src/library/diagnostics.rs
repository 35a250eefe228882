use chrono::{Local, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;

/// Warning/error previews are capped; the remainder is summarized by a
/// counter so the log document stays bounded on pathological libraries.
pub const PREVIEW_CAP: usize = 50;

#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Counts {
    pub cho_files_found: usize,
    pub songs_indexed: usize,
    pub orphan_sheets: usize,
    pub persona_collisions: usize,
    pub collections: usize,
    pub setlist_songs_referenced: usize,
    pub setlist_unresolved: usize,
    pub setlist_duplicates_removed: usize,
    pub setlist_replaced: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Inputs {
    pub songs_dir: String,
    pub setlists: String,
}

/// The run log record. This is the single contractual channel for all
/// non-fatal conditions; console output is a projection of it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub run_id: String,
    pub started: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished: Option<String>,
    pub repo_root: String,
    pub inputs: Inputs,
    pub counts: Counts,
    pub warnings: Vec<String>,
    pub warnings_overflow: usize,
    pub errors: Vec<String>,
}

fn now_iso_local() -> String {
    Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)
}

impl Diagnostics {
    pub fn begin(repo_root: &Path, songs_dir: &Path, setlists: &Path) -> Diagnostics {
        Diagnostics {
            run_id: Utc::now().format("%Y%m%dT%H%M%SZ").to_string(),
            started: now_iso_local(),
            finished: None,
            repo_root: repo_root.display().to_string(),
            inputs: Inputs {
                songs_dir: songs_dir.display().to_string(),
                setlists: setlists.display().to_string(),
            },
            counts: Counts::default(),
            warnings: Vec::new(),
            warnings_overflow: 0,
            errors: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        if self.warnings.len() < PREVIEW_CAP {
            self.warnings.push(message.into());
        } else {
            self.warnings_overflow += 1;
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn finish(&mut self) {
        self.finished = Some(now_iso_local());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fresh() -> Diagnostics {
        Diagnostics::begin(
            &PathBuf::from("/repo"),
            &PathBuf::from("/repo/songs"),
            &PathBuf::from("/repo/library/setlists.json"),
        )
    }

    #[test]
    fn warnings_are_capped_with_overflow_count() {
        let mut diag = fresh();
        for i in 0..(PREVIEW_CAP + 7) {
            diag.warn(format!("warning {i}"));
        }
        assert_eq!(diag.warnings.len(), PREVIEW_CAP);
        assert_eq!(diag.warnings_overflow, 7);
    }

    #[test]
    fn finish_stamps_the_record_once() {
        let mut diag = fresh();
        assert!(diag.finished.is_none());
        diag.finish();
        assert!(diag.finished.is_some());
    }
}
