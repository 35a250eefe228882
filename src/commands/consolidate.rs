use crate::commands::CommandReport;
use crate::error::LibraryError;
use crate::library::aggregate::{AggregateContext, sort_songs};
use crate::library::assemble;
use crate::library::config::load_config;
use crate::library::diagnostics::Diagnostics;
use crate::library::lock;
use crate::library::paths::resolve_paths;
use crate::library::scan;
use crate::library::setlist;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ConsolidateOptions {
    pub repo: PathBuf,
}

pub fn run(opts: &ConsolidateOptions) -> Result<CommandReport> {
    let repo_root = fs::canonicalize(&opts.repo)
        .with_context(|| format!("failed to resolve repo root {}", opts.repo.display()))?;
    let cfg = load_config(&repo_root)?;
    let paths = resolve_paths(&repo_root);

    let mut report = CommandReport::new("consolidate");
    let mut diag = Diagnostics::begin(&repo_root, &paths.songs_dir, &paths.setlists_file);

    // fatal precondition: no song or library document is written, only
    // the diagnostics record
    if !paths.songs_dir.exists() {
        let err = LibraryError::MissingSongsDir(paths.songs_dir.clone());
        diag.error(err.to_string());
        diag.finish();
        assemble::write_diagnostics(&paths.consolidate_log_file, &diag)?;
        report.issue(err.to_string());
        report.detail(format!(
            "log written: {}",
            paths.consolidate_log_file.display()
        ));
        return Ok(report);
    }

    let _lock = lock::acquire(&paths.lock_file)?;

    let files = scan::collect_sheet_files(&paths.songs_dir)?;
    diag.counts.cho_files_found = files.len();
    report.detail(format!("sheet files found: {}", files.len()));

    let records = scan::load_sheet_records(&repo_root, &files, cfg.parser_mode(), &mut diag);

    let mut ctx = AggregateContext::new();
    for record in &records {
        ctx.insert(record, &mut diag);
    }

    // ids the index can answer for: canonical ids plus sheet uids that
    // map to one
    let uid_map = setlist::build_uid_map(&records);
    let mut known = ctx.song_uids();
    known.extend(uid_map.keys().cloned());

    // collections are passthrough; a format error degrades to an empty
    // list and the run still produces a song-only index
    let collections: Value = match setlist::load_setlists(&paths.setlists_file) {
        Ok(doc) => doc.get("collections").cloned().unwrap_or_else(|| json!([])),
        Err(err) => {
            diag.error(err.to_string());
            report.detail(format!("setlists skipped: {err}"));
            json!([])
        }
    };

    let empty: Vec<Value> = Vec::new();
    let collection_list = collections.as_array().unwrap_or(&empty);
    diag.counts.collections = collection_list.len();
    setlist::audit_references(collection_list, &known, &mut diag);

    report.detail(format!("orphan sheets: {}", ctx.orphans.len()));

    let options = cfg.aggregate_options();
    let songs = ctx.finalize(&options, &mut diag);

    let mut songs_index = songs.clone();
    sort_songs(&mut songs_index, cfg.songs_index_order());
    assemble::write_songs_index(&paths.songs_index_file, &songs_index)?;

    let mut library_index = songs;
    sort_songs(&mut library_index, cfg.library_index_order());
    assemble::write_library_index(&paths.library_index_file, &library_index, &collections)?;

    diag.finish();
    assemble::write_diagnostics(&paths.consolidate_log_file, &diag)?;

    report.detail(format!("songs indexed: {}", diag.counts.songs_indexed));
    report.detail(format!(
        "persona collisions: {}",
        diag.counts.persona_collisions
    ));
    report.detail(format!("collections: {}", diag.counts.collections));
    report.detail(format!(
        "setlist references: {} ({} unresolved)",
        diag.counts.setlist_songs_referenced, diag.counts.setlist_unresolved
    ));
    report.detail(format!("wrote {}", paths.songs_index_file.display()));
    report.detail(format!("wrote {}", paths.library_index_file.display()));
    report.detail(format!("wrote {}", paths.consolidate_log_file.display()));

    Ok(report)
}
