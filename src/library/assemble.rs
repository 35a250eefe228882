//! Output document assembly.
//!
//! The index documents carry a content-derived `revision` instead of a
//! wall-clock stamp: identical inputs must yield byte-identical index
//! documents. Run timestamps live in the diagnostics document only.

use crate::library::aggregate::CanonicalSong;
use crate::library::diagnostics::Diagnostics;
use crate::library::docfile::write_json_atomic;
use crate::library::setlist::SETLIST_CONTRACT;
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::Path;

pub const INDEX_VERSION: u32 = 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SongsIndex<'a> {
    version: u32,
    contract: &'static str,
    revision: &'a str,
    song_count: usize,
    songs: &'a [CanonicalSong],
}

#[derive(Debug, Serialize)]
struct LibraryIndex<'a> {
    version: u32,
    contract: &'static str,
    revision: &'a str,
    songs: &'a [CanonicalSong],
    collections: &'a Value,
}

/// Hex SHA-256 of the serialized songs array.
pub fn revision(songs: &[CanonicalSong]) -> Result<String> {
    let bytes = serde_json::to_vec(songs)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

pub fn write_songs_index(path: &Path, songs: &[CanonicalSong]) -> Result<()> {
    let revision = revision(songs)?;
    write_json_atomic(
        path,
        &SongsIndex {
            version: INDEX_VERSION,
            contract: SETLIST_CONTRACT,
            revision: &revision,
            song_count: songs.len(),
            songs,
        },
    )
}

pub fn write_library_index(path: &Path, songs: &[CanonicalSong], collections: &Value) -> Result<()> {
    let revision = revision(songs)?;
    write_json_atomic(
        path,
        &LibraryIndex {
            version: INDEX_VERSION,
            contract: SETLIST_CONTRACT,
            revision: &revision,
            songs,
            collections,
        },
    )
}

pub fn write_diagnostics(path: &Path, diag: &Diagnostics) -> Result<()> {
    write_json_atomic(path, diag)
}
