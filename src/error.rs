use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("songs folder not found: {}", .0.display())]
    MissingSongsDir(PathBuf),
    #[error("config file invalid or unreadable: {0}")]
    InvalidConfig(String),
    #[error("library is locked by another run: {}", .0.display())]
    Locked(PathBuf),
    #[error("setlist document format not recognized: {0}")]
    SetlistFormat(String),
}
