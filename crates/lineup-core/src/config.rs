use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::prefs::{FilePreferenceStore, PreferenceStore, SqlitePreferenceStore};
use crate::selection::KeywordExitPolicy;
use crate::sort::{SortRule, validate_rules};

/// Directory holding project config and preferences.
pub const PROJECT_DIR: &str = ".lineup";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub order: OrderConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub prefs: PrefsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfig {
    /// Sort by the hierarchical order unless a command disables it.
    #[serde(default = "default_true")]
    pub hierarchy: bool,
}

impl Default for OrderConfig {
    fn default() -> Self {
        Self {
            hierarchy: default_true(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default)]
    pub keyword_exit: KeywordExitPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    /// Rules used when the hierarchical order is off.
    #[serde(default)]
    pub rules: Vec<SortRule>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefsBackend {
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefsConfig {
    #[serde(default)]
    pub backend: PrefsBackend,
    /// Relative to `.lineup/`. Defaults depend on the backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl PrefsConfig {
    /// Location of the preference store for a project.
    #[must_use]
    pub fn resolved_path(&self, project_root: &Path) -> PathBuf {
        let file = self.path.clone().unwrap_or_else(|| match self.backend {
            PrefsBackend::File => PathBuf::from("prefs.json"),
            PrefsBackend::Sqlite => PathBuf::from("prefs.sqlite3"),
        });
        project_root.join(PROJECT_DIR).join(file)
    }

    /// Open the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQLite database cannot be opened.
    pub fn open(&self, project_root: &Path) -> Result<Box<dyn PreferenceStore>> {
        let path = self.resolved_path(project_root);
        Ok(match self.backend {
            PrefsBackend::File => Box::new(FilePreferenceStore::new(path)),
            PrefsBackend::Sqlite => Box::new(
                SqlitePreferenceStore::open(&path)
                    .with_context(|| format!("Failed to open {}", path.display()))?,
            ),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

/// Load `.lineup/config.toml`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if its sort
/// rules repeat a column.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(PROJECT_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config = toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    validate_rules(&config.sort.rules, false)
        .with_context(|| format!("Invalid [sort] rules in {}", path.display()))?;
    Ok(config)
}

/// Load `~/.config/lineup/config.toml`, or defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("lineup/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load both config layers and resolve the output mode.
///
/// # Errors
///
/// Propagates config loading failures.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.as_deref(), env_format.as_deref());

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

/// Output precedence: `--json`, then `FORMAT`, then user config, then TTY.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<&str>,
    env_format: Option<&str>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}
