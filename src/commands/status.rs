use crate::commands::CommandReport;
use crate::library::config::load_config;
use crate::library::paths::resolve_paths;
use anyhow::{Context, Result};
use std::env;
use std::fs;
use std::path::PathBuf;

include!(concat!(env!("OUT_DIR"), "/songdex_env_allowlist.rs"));

#[derive(Debug, Clone)]
pub struct StatusOptions {
    pub repo: PathBuf,
}

fn presence(exists: bool) -> &'static str {
    if exists { "present" } else { "missing" }
}

pub fn run(opts: &StatusOptions) -> Result<CommandReport> {
    let repo_root = fs::canonicalize(&opts.repo)
        .with_context(|| format!("failed to resolve repo root {}", opts.repo.display()))?;
    let paths = resolve_paths(&repo_root);

    let mut report = CommandReport::new("status");
    report.detail(format!("build={}", env!("BUILD_UUID")));
    report.detail(format!("repo_root={}", paths.repo_root.display()));
    report.detail(format!(
        "songs_dir={} ({})",
        paths.songs_dir.display(),
        presence(paths.songs_dir.exists())
    ));
    report.detail(format!("library_dir={}", paths.library_dir.display()));
    report.detail(format!(
        "setlists={} ({})",
        paths.setlists_file.display(),
        presence(paths.setlists_file.exists())
    ));

    match load_config(&repo_root) {
        Ok(cfg) => {
            report.detail(format!("parser.mode={}", cfg.parser.mode));
            report.detail(format!(
                "aggregate.preferred_persona={}",
                if cfg.aggregate.preferred_persona.is_empty() {
                    "(none)"
                } else {
                    cfg.aggregate.preferred_persona.as_str()
                }
            ));
            report.detail(format!(
                "aggregate.representative={}",
                cfg.aggregate.representative
            ));
            report.detail(format!(
                "output.songs_index_order={}",
                cfg.output.songs_index_order
            ));
            report.detail(format!(
                "output.library_index_order={}",
                cfg.output.library_index_order
            ));
        }
        Err(err) => report.issue(format!("config invalid: {err}")),
    }

    for key in GENERATED_SONGDEX_ENV_ALLOWLIST {
        if let Ok(value) = env::var(key)
            && !value.trim().is_empty()
        {
            report.detail(format!("env override {key} is set"));
        }
    }

    Ok(report)
}
