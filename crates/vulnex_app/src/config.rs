use std::fs;
use std::io::{BufRead, IsTerminal};
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use scan_logging::scan_info;
use vulnex_core::{CandidateSet, ClassifyPolicy, DEFAULT_EXTENSIONS, DEFAULT_PATHS};
use vulnex_engine::{DedupScope, EngineConfig, FetchSettings};

use crate::cli::Cli;

/// Builds the candidate space from targets, wordlist and extensions.
pub fn load_candidates(cli: &Cli, stdin: impl BufRead) -> Result<CandidateSet> {
    let targets = match &cli.targets {
        Some(path) => parse_targets(&read_list(path, "targets")?),
        None => {
            if std::io::stdin().is_terminal() {
                eprintln!("Enter URLs (one per line), press Ctrl+D when done:");
            }
            read_targets(stdin)?
        }
    };
    if targets.is_empty() {
        bail!("no target URLs given");
    }

    let paths = match &cli.wordlist {
        Some(path) => {
            let paths = parse_paths(&read_list(path, "wordlist")?);
            if paths.is_empty() {
                bail!("wordlist {} has no entries", path.display());
            }
            paths
        }
        None => DEFAULT_PATHS.iter().map(|p| p.to_string()).collect(),
    };

    let extensions = if cli.no_extensions {
        Vec::new()
    } else if let Some(path) = &cli.extensions {
        parse_extensions(read_list(path, "extension list")?.lines())
    } else if !cli.ext.is_empty() {
        parse_extensions(cli.ext.iter().map(String::as_str))
    } else {
        DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
    };

    scan_info!(
        "Loaded {} targets, {} paths, {} extensions",
        targets.len(),
        paths.len(),
        extensions.len()
    );
    Ok(CandidateSet::new(targets, paths, extensions)?)
}

pub fn engine_config(cli: &Cli) -> EngineConfig {
    EngineConfig {
        worker_count: usize::from(cli.workers),
        fetch: FetchSettings {
            request_timeout: Duration::from_millis(cli.timeout_ms),
            connect_timeout: Duration::from_millis(cli.timeout_ms),
            max_body_bytes: cli.body_cap,
            ..FetchSettings::default()
        },
        policy: ClassifyPolicy {
            dedup_min_body_length: cli.dedup_min_body,
            ..ClassifyPolicy::default()
        },
        dedup_scope: if cli.shared_dedup {
            DedupScope::Shared
        } else {
            DedupScope::PerWorker
        },
        ..EngineConfig::default()
    }
}

fn read_list(path: &Path, what: &str) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading {what} {}", path.display()))
}

fn read_targets(reader: impl BufRead) -> Result<Vec<String>> {
    let mut targets = Vec::new();
    for line in reader.lines() {
        let line = line.context("reading targets from stdin")?;
        let line = line.trim();
        if !line.is_empty() {
            targets.push(line.to_string());
        }
    }
    Ok(targets)
}

fn parse_targets(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Skips blanks and `#` comments; a leading `/` is dropped since candidates add their own.
fn parse_paths(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_start_matches('/'))
        .filter(|line| !line.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

fn parse_extensions<'a>(entries: impl Iterator<Item = &'a str>) -> Vec<String> {
    entries
        .map(str::trim)
        .filter(|ext| !ext.is_empty() && !ext.starts_with('#'))
        .map(|ext| {
            if ext.starts_with('.') {
                ext.to_string()
            } else {
                format!(".{ext}")
            }
        })
        .collect()
}
