//! Application configuration management utilities.

use camino::{Utf8Path, Utf8PathBuf};
use directories_next::BaseDirs;
use fsm_catalog::{CatalogSettings, DEFAULT_ICON_SIZE, DEFAULT_TITLE, DEFAULT_LANGUAGES};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;

use crate::errors::CliError;

/// File name looked up in the current directory and next to the executable.
pub const CONFIG_FILE_NAME: &str = "fs-mod-list.toml";

/// Settings stored in fs-mod-list.toml.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Folder the game loads installed mods from.
    pub install_dir: String,
    /// Game installation folder.
    pub game_dir: String,
    /// Folder holding the mod archives.
    pub vault_dir: String,
    /// Report file name inside the vault.
    pub output_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
}

impl AppConfig {
    /// Build run settings, resolving paths against `base_dir`.
    pub fn into_settings(self, base_dir: &Utf8Path) -> CatalogSettings {
        let mut settings = CatalogSettings::new(
            expand_path(&self.install_dir, base_dir),
            expand_path(&self.game_dir, base_dir),
            expand_path(&self.vault_dir, base_dir),
            self.output_file,
        );
        settings.title = self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string());
        settings.icon_size = self.icon_size.unwrap_or(DEFAULT_ICON_SIZE);
        settings.languages = self
            .languages
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANGUAGES.iter().map(|l| l.to_string()).collect());
        settings
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the user's home directory.
pub fn home_dir() -> Option<Utf8PathBuf> {
    let dirs = BaseDirs::new()?;
    Utf8PathBuf::from_path_buf(dirs.home_dir().to_path_buf()).ok()
}

/// Expand a leading `~` to the home directory and resolve relative paths
/// against `base_dir`.
pub fn expand_path(raw: &str, base_dir: &Utf8Path) -> Utf8PathBuf {
    let raw = raw.trim();
    let expanded = match raw.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => match home_dir() {
            Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
            None => Utf8PathBuf::from(raw),
        },
        _ => Utf8PathBuf::from(raw),
    };

    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

/// Candidate config locations, in lookup order.
fn candidate_paths() -> Vec<Utf8PathBuf> {
    let mut candidates = Vec::new();
    if let Some(cwd) = env::current_dir()
        .ok()
        .and_then(|p| Utf8PathBuf::from_path_buf(p).ok())
    {
        candidates.push(cwd.join(CONFIG_FILE_NAME));
    }
    if let Some(dir) = install_dir() {
        candidates.push(dir.join(CONFIG_FILE_NAME));
    }
    candidates
}

/// Locate the configuration file: the explicit path if given, otherwise the
/// first existing default location.
pub fn find_config_path(explicit: Option<&str>) -> Result<Utf8PathBuf, CliError> {
    if let Some(path) = explicit {
        let path = Utf8PathBuf::from(path);
        if path.as_std_path().is_file() {
            return Ok(path);
        }
        return Err(CliError::config_not_found(CONFIG_FILE_NAME, vec![path]));
    }

    let candidates = candidate_paths();
    candidates
        .iter()
        .find(|p| p.as_std_path().is_file())
        .cloned()
        .ok_or_else(|| CliError::config_not_found(CONFIG_FILE_NAME, candidates))
}

/// Parse configuration text.
pub fn parse_config(content: &str, path: &Utf8Path) -> Result<AppConfig, CliError> {
    toml::from_str(content).map_err(|e| CliError::config_parse_error(path.to_path_buf(), e))
}

/// Load the configuration and turn it into run settings.
pub fn load_settings(explicit: Option<&str>) -> Result<(CatalogSettings, Utf8PathBuf), CliError> {
    let path = find_config_path(explicit)?;
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|e| CliError::config_read_failed(path.clone(), e))?;
    let config = parse_config(&content, &path)?;

    let base_dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
        _ => Utf8PathBuf::from("."),
    };
    Ok((config.into_settings(&base_dir), path))
}
