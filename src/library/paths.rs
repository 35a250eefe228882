use std::env;
use std::path::{Path, PathBuf};

/// Resolved locations for one library repo. Inputs live under the repo
/// root; every derived document lands in the library dir.
#[derive(Debug, Clone)]
pub struct LibraryPaths {
    pub repo_root: PathBuf,
    pub songs_dir: PathBuf,
    pub library_dir: PathBuf,
    pub setlists_file: PathBuf,
    pub songs_index_file: PathBuf,
    pub library_index_file: PathBuf,
    pub consolidate_log_file: PathBuf,
    pub migrated_setlists_file: PathBuf,
    pub migrate_log_file: PathBuf,
    pub lock_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths(repo_root: &Path) -> LibraryPaths {
    let songs_dir = env_or_default_path("SONGDEX_SONGS_DIR", repo_root.join("songs"));
    let library_dir = env_or_default_path("SONGDEX_LIBRARY_DIR", repo_root.join("library"));

    LibraryPaths {
        repo_root: repo_root.to_path_buf(),
        setlists_file: library_dir.join("setlists.json"),
        songs_index_file: library_dir.join("songs.index.json"),
        library_index_file: library_dir.join("library.index.json"),
        consolidate_log_file: library_dir.join("consolidate.log.json"),
        migrated_setlists_file: library_dir.join("setlists.v2.json"),
        migrate_log_file: library_dir.join("migrate_setlists.log.json"),
        lock_file: library_dir.join(".songdex.lock"),
        songs_dir,
        library_dir,
    }
}
