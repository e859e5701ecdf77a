use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Brute-force content discovery against a list of base URLs.
///
/// Base URLs are read from `--targets` or, if absent, from stdin (one per line).
/// Interesting responses are printed as they arrive and stored in SQLite.
#[derive(Parser, Debug)]
#[command(name = "discover-files", version)]
pub struct Cli {
    /// File with base URLs, one per line (defaults to stdin)
    #[arg(long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Path wordlist, one segment per line (defaults to a built-in list)
    #[arg(long, env = "WORDLIST_PATH", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Extension list file, one per line
    #[arg(long, value_name = "FILE", conflicts_with_all = ["ext", "no_extensions"])]
    pub extensions: Option<PathBuf>,

    /// Comma-separated extensions, e.g. `.php,.bak`
    #[arg(short = 'x', long = "ext", value_delimiter = ',', conflicts_with = "no_extensions")]
    pub ext: Vec<String>,

    /// Only probe bare paths
    #[arg(long)]
    pub no_extensions: bool,

    /// Concurrent workers
    #[arg(short, long, default_value_t = 10, value_parser = clap::value_parser!(u16).range(1..))]
    pub workers: u16,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,

    /// Maximum body bytes read and hashed per response
    #[arg(long, default_value_t = 8192)]
    pub body_cap: usize,

    /// 200 bodies must be longer than this to suppress repeats on the same host
    #[arg(long, default_value_t = 100)]
    pub dedup_min_body: u64,

    /// Share duplicate-page suppression across all workers
    #[arg(long)]
    pub shared_dedup: bool,

    /// SQLite database for findings
    #[arg(long, env = "VULNEX_DB", default_value = "vulnex.db", value_name = "FILE")]
    pub db: PathBuf,

    /// Keep findings in memory only
    #[arg(long)]
    pub dry_run: bool,

    /// Print findings as JSON lines instead of progress lines
    #[arg(long)]
    pub jsonl: bool,

    /// Also write logs to this file
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// More log output on stderr (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}
