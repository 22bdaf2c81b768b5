//! Configuration and user preferences.
//!
//! `Config` comes from `config.toml` in the data directory and only tunes
//! behaviour. `Preferences` are the small UI choices the user makes from inside
//! the app; they live in the key-value store next to the board.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::classify::DEFAULT_OVERLOAD_THRESHOLD;
use crate::error::{BoardError, Result};
use crate::history::DEFAULT_CAPACITY;
use crate::storage::{load_or, save_json, KeyValueStore, KEY_PREF_FONT, KEY_PREF_HAS_SEEN_HELP, KEY_PREF_HIDE_COMPLETED};

pub const CONFIG_FILE: &str = "config.toml";

/// Fonts offered for the board's card text.
pub const FONTS: [&str; 9] = [
    "Indie Flower",
    "Caveat",
    "Patrick Hand",
    "Architects Daughter",
    "Helvetica",
    "Roboto",
    "Open Sans",
    "Courier Prime",
    "Merriweather",
];

pub const DEFAULT_FONT: &str = FONTS[0];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Number of actions kept for undo.
    pub undo_capacity: usize,
    /// Incomplete q1 tasks that trigger the overload advisory.
    pub overload_threshold: usize,
    /// Where end-of-week summaries are written. Defaults to `<data dir>/summaries`.
    pub summary_dir: Option<PathBuf>,
    /// Seed the example tasks on first run.
    pub seed_examples: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            undo_capacity: DEFAULT_CAPACITY,
            overload_threshold: DEFAULT_OVERLOAD_THRESHOLD,
            summary_dir: None,
            seed_examples: true,
        }
    }
}

impl Config {
    /// Read `config.toml` from `data_dir`. A missing file yields the defaults.
    pub fn load(data_dir: &Path) -> Result<Config> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Config::default());
        }
        let raw = std::fs::read_to_string(&path).map_err(|source| BoardError::IoPath {
            path: path.clone(),
            source,
        })?;
        let cfg: Config = toml::from_str(&raw).map_err(|e| BoardError::Config {
            path: path.clone(),
            msg: e.to_string(),
        })?;
        cfg.validate(&path)?;
        Ok(cfg)
    }

    /// Like [`load`](Self::load), but a broken file only logs a warning.
    pub fn load_or_default(data_dir: &Path) -> Config {
        match Config::load(data_dir) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring config, using defaults");
                Config::default()
            }
        }
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.undo_capacity == 0 {
            return Err(BoardError::Config {
                path: path.to_path_buf(),
                msg: "undo_capacity must be at least 1".into(),
            });
        }
        if self.overload_threshold == 0 {
            return Err(BoardError::Config {
                path: path.to_path_buf(),
                msg: "overload_threshold must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn summary_dir(&self, data_dir: &Path) -> PathBuf {
        self.summary_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("summaries"))
    }
}

/// `--data-dir` if given, else `$HOME/.eisenhower`.
pub fn data_dir(flag: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir.to_path_buf();
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".eisenhower")
}

/// Canonical spelling of a supported font, matched case-insensitively.
pub fn find_font(name: &str) -> Option<&'static str> {
    let name = name.trim();
    FONTS.iter().copied().find(|f| f.eq_ignore_ascii_case(name))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preferences {
    pub font: String,
    pub hide_completed: bool,
    pub has_seen_help: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            font: DEFAULT_FONT.to_string(),
            hide_completed: false,
            has_seen_help: false,
        }
    }
}

impl Preferences {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let font: String = load_or(store, KEY_PREF_FONT, DEFAULT_FONT.to_string());
        Preferences {
            font: find_font(&font).unwrap_or(DEFAULT_FONT).to_string(),
            hide_completed: load_or(store, KEY_PREF_HIDE_COMPLETED, false),
            has_seen_help: load_or(store, KEY_PREF_HAS_SEEN_HELP, false),
        }
    }

    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        save_json(store, KEY_PREF_FONT, &self.font)?;
        save_json(store, KEY_PREF_HIDE_COMPLETED, &self.hide_completed)?;
        save_json(store, KEY_PREF_HAS_SEEN_HELP, &self.has_seen_help)?;
        Ok(())
    }

    /// Switch font. Unknown names are ignored.
    pub fn set_font(&mut self, name: &str) -> bool {
        match find_font(name) {
            Some(font) => {
                self.font = font.to_string();
                true
            }
            None => false,
        }
    }
}
