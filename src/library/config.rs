use crate::error::LibraryError;
use crate::library::aggregate::{AggregateOptions, RepresentativePolicy, SongOrder};
use crate::library::tags::TagParseMode;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// `strict` stops the header scan at the first body line; `lenient`
    /// scans the whole file (legacy sheets with tags after the body).
    pub mode: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            mode: "strict".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateSettings {
    /// Persona preferred for representative selection; empty means no
    /// preference (lexicographically-first persona wins).
    pub preferred_persona: String,
    /// `single-persona` or `merge-across`.
    pub representative: String,
}

impl Default for AggregateSettings {
    fn default() -> Self {
        Self {
            preferred_persona: String::new(),
            representative: "single-persona".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `artist-title` or `title-artist`, per output document.
    pub songs_index_order: String,
    pub library_index_order: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            songs_index_order: "artist-title".to_string(),
            library_index_order: "artist-title".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LibraryConfig {
    pub parser: ParserConfig,
    pub aggregate: AggregateSettings,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialLibraryConfig {
    parser: Option<ParserConfig>,
    aggregate: Option<AggregateSettings>,
    output: Option<OutputConfig>,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn song_order(value: &str) -> SongOrder {
    if value == "title-artist" {
        SongOrder::TitleArtist
    } else {
        SongOrder::ArtistTitle
    }
}

impl LibraryConfig {
    pub fn parser_mode(&self) -> TagParseMode {
        if self.parser.mode == "lenient" {
            TagParseMode::Lenient
        } else {
            TagParseMode::Strict
        }
    }

    pub fn representative_policy(&self) -> RepresentativePolicy {
        if self.aggregate.representative == "merge-across" {
            RepresentativePolicy::MergeAcross
        } else {
            RepresentativePolicy::SinglePersona
        }
    }

    pub fn aggregate_options(&self) -> AggregateOptions {
        AggregateOptions {
            preferred_persona: self.aggregate.preferred_persona.clone(),
            representative: self.representative_policy(),
        }
    }

    pub fn songs_index_order(&self) -> SongOrder {
        song_order(&self.output.songs_index_order)
    }

    pub fn library_index_order(&self) -> SongOrder {
        song_order(&self.output.library_index_order)
    }
}

fn validate(cfg: &LibraryConfig) -> Result<()> {
    if cfg.parser.mode != "strict" && cfg.parser.mode != "lenient" {
        return Err(LibraryError::InvalidConfig(
            "parser.mode must be `strict` or `lenient`".to_string(),
        )
        .into());
    }
    if cfg.aggregate.representative != "single-persona"
        && cfg.aggregate.representative != "merge-across"
    {
        return Err(LibraryError::InvalidConfig(
            "aggregate.representative must be `single-persona` or `merge-across`".to_string(),
        )
        .into());
    }
    for (name, value) in [
        ("output.songs_index_order", &cfg.output.songs_index_order),
        ("output.library_index_order", &cfg.output.library_index_order),
    ] {
        if value != "artist-title" && value != "title-artist" {
            return Err(LibraryError::InvalidConfig(format!(
                "{name} must be `artist-title` or `title-artist`"
            ))
            .into());
        }
    }
    Ok(())
}

fn resolve_global_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("SONGDEX_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".songdex").join("config.toml"))
}

fn merge_file_config(base: &mut LibraryConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: PartialLibraryConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(parser) = parsed.parser {
        base.parser = parser;
    }
    if let Some(aggregate) = parsed.aggregate {
        base.aggregate = aggregate;
    }
    if let Some(output) = parsed.output {
        base.output = output;
    }
    Ok(())
}

/// Layered load: defaults ← global config ← repo-local `.songdex.toml`
/// ← env overrides, then validation.
pub fn load_config(repo_root: &Path) -> Result<LibraryConfig> {
    let mut cfg = LibraryConfig::default();

    if let Some(global) = resolve_global_config_path() {
        merge_file_config(&mut cfg, &global)?;
    }
    merge_file_config(&mut cfg, &repo_root.join(".songdex.toml"))?;

    cfg.parser.mode = env_or_string("SONGDEX_PARSER_MODE", &cfg.parser.mode);
    cfg.aggregate.preferred_persona = env_or_string(
        "SONGDEX_PREFERRED_PERSONA",
        &cfg.aggregate.preferred_persona,
    );
    cfg.aggregate.representative =
        env_or_string("SONGDEX_REPRESENTATIVE", &cfg.aggregate.representative);
    cfg.output.songs_index_order = env_or_string(
        "SONGDEX_SONGS_INDEX_ORDER",
        &cfg.output.songs_index_order,
    );
    cfg.output.library_index_order = env_or_string(
        "SONGDEX_LIBRARY_INDEX_ORDER",
        &cfg.output.library_index_order,
    );

    validate(&cfg)?;
    Ok(cfg)
}
