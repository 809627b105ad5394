//! Configuration management

use crate::types::{CompareMode, SyncError};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Mirror a destination directory onto a source directory
#[derive(Debug, Parser)]
#[command(name = "mirrorsync", version, about)]
pub struct Cli {
    /// Source directory (never written)
    #[arg(long)]
    pub src: PathBuf,

    /// Destination directory (made identical to the source)
    #[arg(long)]
    pub dest: PathBuf,

    /// How file equality is judged
    #[arg(long, value_enum)]
    pub compare_mode: Option<CompareMode>,

    /// Print the plan only, do not touch the destination
    #[arg(long)]
    pub dry_run: bool,

    /// Worker count for trusted bulk execution and scanning
    #[arg(long)]
    pub workers: Option<usize>,

    /// Glob excluded from both trees (repeatable)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Trust every kind up-front: no prompts, bulk execution
    #[arg(long, short = 'y')]
    pub yes: bool,

    /// TOML file with defaults for compare_mode, workers, exclude
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

/// Optional settings file; command-line values win
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub compare_mode: Option<CompareMode>,
    pub workers: Option<usize>,
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            SyncError::Config(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Source directory
    pub source: PathBuf,

    /// Destination directory
    pub destination: PathBuf,

    /// Size or checksum comparison
    pub compare_mode: CompareMode,

    /// Dry run (show plan, don't execute)
    pub dry_run: bool,

    /// Worker pool size for bulk mode and parallel scanning
    pub workers: usize,

    /// Exclude patterns (globs), applied to both roots
    pub exclude_patterns: Vec<String>,

    /// Skip prompting and run every kind in bulk
    pub assume_trust: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            compare_mode: CompareMode::Size,
            dry_run: false,
            workers: default_workers(),
            exclude_patterns: Vec::new(),
            assume_trust: false,
        }
    }
}

/// Available parallelism, falling back to 4
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(4)
}

impl Config {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), SyncError> {
        check_root(&self.source)?;
        check_root(&self.destination)?;

        if self.workers == 0 {
            return Err(SyncError::Config(
                "Worker count must be at least 1".to_string(),
            ));
        }

        let source = self.source.canonicalize()?;
        let destination = self.destination.canonicalize()?;
        if source == destination {
            return Err(SyncError::Config(
                "Source and destination cannot be the same".to_string(),
            ));
        }
        if destination.starts_with(&source) || source.starts_with(&destination) {
            return Err(SyncError::Config(format!(
                "Source and destination must not be nested: {} / {}",
                self.source.display(),
                self.destination.display()
            )));
        }

        Ok(())
    }
}

/// Ensure a root exists and is a directory
pub fn check_root(path: &Path) -> Result<(), SyncError> {
    let metadata = fs::metadata(path).map_err(|e| SyncError::RootUnavailable {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    if !metadata.is_dir() {
        return Err(SyncError::RootUnavailable {
            path: path.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(())
}

impl TryFrom<Cli> for Config {
    type Error = SyncError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let file = match &cli.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let mut exclude_patterns = file.exclude;
        exclude_patterns.extend(cli.exclude);

        let config = Config {
            source: cli.src,
            destination: cli.dest,
            compare_mode: cli.compare_mode.or(file.compare_mode).unwrap_or_default(),
            dry_run: cli.dry_run,
            workers: cli.workers.or(file.workers).unwrap_or_else(default_workers),
            exclude_patterns,
            assume_trust: cli.yes,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli_for(src: &Path, dest: &Path) -> Cli {
        Cli::parse_from([
            "mirrorsync",
            "--src",
            src.to_str().expect("utf8 path"),
            "--dest",
            dest.to_str().expect("utf8 path"),
        ])
    }

    #[test]
    fn test_defaults_from_minimal_cli() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");

        let config = Config::try_from(cli_for(src.path(), dst.path())).expect("valid config");
        assert_eq!(config.compare_mode, CompareMode::Size);
        assert!(!config.dry_run);
        assert!(!config.assume_trust);
        assert!(config.workers >= 1);
    }

    #[test]
    fn test_missing_source_is_root_unavailable() {
        let dst = TempDir::new().expect("create dst");
        let missing = dst.path().join("nope");
        let result = Config::try_from(cli_for(&missing, dst.path()));
        assert!(matches!(result, Err(SyncError::RootUnavailable { .. })));
    }

    #[test]
    fn test_file_root_is_root_unavailable() {
        let src = TempDir::new().expect("create src");
        let file = src.path().join("plain.txt");
        fs::write(&file, b"x").expect("write file");
        let dst = TempDir::new().expect("create dst");

        let result = Config::try_from(cli_for(src.path(), &file));
        match result {
            Err(SyncError::RootUnavailable { reason, .. }) => {
                assert!(reason.contains("not a directory"))
            }
            other => panic!("expected RootUnavailable, got {other:?}"),
        }
        drop(dst);
    }

    #[test]
    fn test_same_root_rejected() {
        let src = TempDir::new().expect("create src");
        let result = Config::try_from(cli_for(src.path(), src.path()));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_nested_roots_rejected() {
        let src = TempDir::new().expect("create src");
        let nested = src.path().join("inner");
        fs::create_dir(&nested).expect("create nested");
        let result = Config::try_from(cli_for(src.path(), &nested));
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_zero_workers_rejected() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        let config = Config {
            source: src.path().to_path_buf(),
            destination: dst.path().to_path_buf(),
            workers: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(SyncError::Config(_))));
    }

    #[test]
    fn test_file_config_merged_under_cli() {
        let src = TempDir::new().expect("create src");
        let dst = TempDir::new().expect("create dst");
        let cfg_dir = TempDir::new().expect("create cfg dir");
        let cfg_path = cfg_dir.path().join("mirrorsync.toml");
        fs::write(
            &cfg_path,
            "compare_mode = \"checksum\"\nworkers = 3\nexclude = [\"*.tmp\"]\n",
        )
        .expect("write config");

        let cli = Cli::parse_from([
            "mirrorsync",
            "--src",
            src.path().to_str().expect("utf8"),
            "--dest",
            dst.path().to_str().expect("utf8"),
            "--workers",
            "7",
            "--exclude",
            "*.log",
            "--config",
            cfg_path.to_str().expect("utf8"),
        ]);
        let config = Config::try_from(cli).expect("valid config");

        assert_eq!(config.compare_mode, CompareMode::Checksum);
        assert_eq!(config.workers, 7);
        assert_eq!(config.exclude_patterns, vec!["*.tmp", "*.log"]);
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        let cfg_dir = TempDir::new().expect("create cfg dir");
        let cfg_path = cfg_dir.path().join("bad.toml");
        fs::write(&cfg_path, "retries = 3\n").expect("write config");
        assert!(matches!(
            FileConfig::load(&cfg_path),
            Err(SyncError::Config(_))
        ));
    }

    #[test]
    fn test_cli_parses_checksum_mode() {
        let cli = Cli::parse_from([
            "mirrorsync",
            "--src",
            "a",
            "--dest",
            "b",
            "--compare-mode",
            "checksum",
            "--dry-run",
            "-y",
        ]);
        assert_eq!(cli.compare_mode, Some(CompareMode::Checksum));
        assert!(cli.dry_run);
        assert!(cli.yes);
    }
}
