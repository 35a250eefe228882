use crate::commands::CommandReport;
use crate::error::LibraryError;
use crate::library::assemble;
use crate::library::config::load_config;
use crate::library::diagnostics::Diagnostics;
use crate::library::docfile::write_json_atomic;
use crate::library::lock;
use crate::library::paths::resolve_paths;
use crate::library::scan;
use crate::library::setlist::{self, SETLIST_CONTRACT};
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub repo: PathBuf,
}

/// Rewrite setlist references from sheet uids to canonical song uids.
/// The source document is never overwritten: the result lands in a new
/// document, so the migration stays reversible by discarding it.
pub fn run(opts: &MigrateOptions) -> Result<CommandReport> {
    let repo_root = fs::canonicalize(&opts.repo)
        .with_context(|| format!("failed to resolve repo root {}", opts.repo.display()))?;
    let cfg = load_config(&repo_root)?;
    let paths = resolve_paths(&repo_root);

    let mut report = CommandReport::new("migrate-setlists");

    if !paths.songs_dir.exists() {
        return Err(LibraryError::MissingSongsDir(paths.songs_dir.clone()).into());
    }
    if !paths.setlists_file.exists() {
        return Err(LibraryError::SetlistFormat(format!(
            "missing {}",
            paths.setlists_file.display()
        ))
        .into());
    }

    let _lock = lock::acquire(&paths.lock_file)?;

    let mut diag = Diagnostics::begin(&repo_root, &paths.songs_dir, &paths.setlists_file);

    let files = scan::collect_sheet_files(&paths.songs_dir)?;
    diag.counts.cho_files_found = files.len();
    let records = scan::load_sheet_records(&repo_root, &files, cfg.parser_mode(), &mut diag);

    let uid_map = setlist::build_uid_map(&records);
    let known: BTreeSet<String> = records
        .iter()
        .filter_map(|r| r.song_uid.clone())
        .collect();
    report.detail(format!("uid mappings: {}", uid_map.len()));

    let normalized = setlist::load_setlists(&paths.setlists_file)?;
    let mut collections: Vec<Value> = normalized
        .get("collections")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let counters = setlist::migrate_collections(&mut collections, &uid_map, &known);
    diag.counts.collections = collections.len();
    diag.counts.setlist_songs_referenced = counters.referenced;
    diag.counts.setlist_replaced = counters.replaced;
    diag.counts.setlist_unresolved = counters.unresolved;
    diag.counts.setlist_duplicates_removed = counters.duplicates_removed;
    if counters.unresolved > 0 {
        diag.warn(format!(
            "{} setlist references had no uid mapping and were kept as-is",
            counters.unresolved
        ));
    }

    let migrated = json!({
        "version": 2,
        "contract": SETLIST_CONTRACT,
        "collections": collections,
    });
    write_json_atomic(&paths.migrated_setlists_file, &migrated)?;

    diag.finish();
    assemble::write_diagnostics(&paths.migrate_log_file, &diag)?;

    report.detail(format!(
        "references: {} ({} replaced, {} unresolved, {} duplicates removed)",
        counters.referenced, counters.replaced, counters.unresolved, counters.duplicates_removed
    ));
    report.detail(format!("wrote {}", paths.migrated_setlists_file.display()));
    report.detail(format!("wrote {}", paths.migrate_log_file.display()));
    report.detail(format!(
        "source untouched: {}",
        paths.setlists_file.display()
    ));

    Ok(report)
}
