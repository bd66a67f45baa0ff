use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::{AnalysisMode, EngineConfig, EntitySelection, DEFAULT_SEPARATOR};
use crate::error::{ActivityError, Result};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Bucket social-media activity into 15-minute time-of-day slots per page
#[derive(Parser, Debug, Clone)]
#[command(
    name = "activity-buckets",
    about = "Bucket social-media activity into 15-minute time-of-day slots per page",
    version
)]
pub struct Settings {
    /// Reference table: JSONL file or directory of post rows
    #[arg(long)]
    pub posts: Option<PathBuf>,

    /// Composite comment fields: JSONL file or directory (comments mode)
    #[arg(long)]
    pub comments: Option<PathBuf>,

    /// Which records to bucket
    #[arg(long, default_value = "posts", value_parser = ["posts", "comments"])]
    pub mode: String,

    /// Separator token between sub-records in a composite field
    #[arg(long, default_value = DEFAULT_SEPARATOR)]
    pub separator: String,

    /// Entity to report (repeatable); all entities when omitted
    #[arg(long = "entity")]
    pub entities: Vec<String>,

    /// Keyword used to find similar entities when no target exists (repeatable)
    #[arg(long = "fallback-keyword")]
    pub fallback_keywords: Vec<String>,

    /// Output format
    #[arg(long, default_value = "text", value_parser = ["text", "json"])]
    pub format: String,

    /// List events in this bucket (0-95)
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=95))]
    pub bucket: Option<u8>,

    /// Entity for the --bucket listing (defaults to the first reported entity)
    #[arg(long)]
    pub bucket_entity: Option<String>,

    /// Characters of source text kept for unresolved fragments
    #[arg(long, default_value = "50")]
    pub snippet_len: usize,

    /// Config file (defaults to ~/.activity-buckets/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the effective settings to the config file
    #[arg(long)]
    pub save_config: bool,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional settings file, `~/.activity-buckets/config.json` by default.
///
/// Every field is optional; command-line arguments always take precedence.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_keywords: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet_len: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

impl ConfigFile {
    /// Default location of the config file.
    pub fn default_path() -> PathBuf {
        Self::path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".activity-buckets").join("config.json")
    }

    /// Load from `path`. A missing file yields the default; a file that
    /// exists but cannot be parsed is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ActivityError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let file: Self = serde_json::from_str(&content)?;
        debug!("Loaded config file {}", path.display());
        Ok(file)
    }

    /// Atomically write to `path`, creating parent directories if needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write to a temp file then rename for atomicity.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;
        debug!("Saved config file {}", path.display());

        Ok(())
    }
}

impl From<&Settings> for ConfigFile {
    fn from(s: &Settings) -> Self {
        ConfigFile {
            posts: s.posts.clone(),
            comments: s.comments.clone(),
            mode: Some(s.mode.clone()),
            separator: Some(s.separator.clone()),
            entities: Some(s.entities.clone()),
            fallback_keywords: Some(s.fallback_keywords.clone()),
            format: Some(s.format.clone()),
            snippet_len: Some(s.snippet_len),
            log_level: Some(s.log_level.clone()),
        }
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse the process arguments and merge the config file underneath.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect(), &ConfigFile::default_path())
    }

    /// Parse `args`, then fill every value not given explicitly on the
    /// command line from the config file (`--config`, else `default_config`).
    pub fn load_from_args(args: Vec<std::ffi::OsString>, default_config: &Path) -> Result<Self> {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        let config_path = settings
            .config
            .clone()
            .unwrap_or_else(|| default_config.to_path_buf());
        let file = ConfigFile::load_from(&config_path)?;

        settings.merge_file(&file, &matches);

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        if settings.save_config {
            ConfigFile::from(&settings).save_to(&config_path)?;
        }

        Ok(settings)
    }

    fn merge_file(&mut self, file: &ConfigFile, matches: &clap::ArgMatches) {
        // NOTE: clap stores the arg id using the *field name* (underscores),
        // not the long-flag spelling (hyphens).
        if !is_arg_explicitly_set(matches, "posts") && self.posts.is_none() {
            self.posts = file.posts.clone();
        }
        if !is_arg_explicitly_set(matches, "comments") && self.comments.is_none() {
            self.comments = file.comments.clone();
        }
        if !is_arg_explicitly_set(matches, "mode") {
            if let Some(v) = &file.mode {
                self.mode = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "separator") {
            if let Some(v) = &file.separator {
                self.separator = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "entities") {
            if let Some(v) = &file.entities {
                self.entities = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "fallback_keywords") {
            if let Some(v) = &file.fallback_keywords {
                self.fallback_keywords = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "format") {
            if let Some(v) = &file.format {
                self.format = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "snippet_len") {
            if let Some(v) = file.snippet_len {
                self.snippet_len = v;
            }
        }
        if !is_arg_explicitly_set(matches, "log_level") {
            if let Some(v) = &file.log_level {
                self.log_level = v.clone();
            }
        }
    }

    /// Build the engine configuration these settings describe.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let config = EngineConfig {
            mode: self.mode.parse::<AnalysisMode>()?,
            separator: self.separator.clone(),
            snippet_len: self.snippet_len,
            selection: EntitySelection {
                targets: self.entities.clone(),
                fallback_keywords: self.fallback_keywords.clone(),
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn wants_json(&self) -> bool {
        self.format == "json"
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
