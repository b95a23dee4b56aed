//! Configuration types and loading
//!
//! Keys are kebab-case YAML. Every section is optional; missing keys take
//! their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Project-local config file, relative to the working directory
pub const LOCAL_CONFIG: &str = ".ken.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// TRACE, DEBUG, INFO, WARN or ERROR; `--log-level` wins
    pub log_level: Option<String>,
    pub llm: LlmConfig,
    pub wake: WakeConfig,
}

impl Config {
    /// Fail fast on anything a wake would trip over after it started
    ///
    /// Today that is only the API key.
    pub fn validate(&self) -> Result<()> {
        self.llm.get_api_key().map(|_| ())
    }

    /// Load from `config_path`, or the first readable file on the search path
    ///
    /// An explicit path must load. Files on the search path that fail to
    /// parse are skipped with a warning; with none left, defaults are used.
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::search_path() {
            if !candidate.is_file() {
                continue;
            }
            match Self::load_from_file(&candidate) {
                Ok(config) => return Ok(config),
                Err(e) => warn!(path = %candidate.display(), error = %e, "Skipping unreadable config"),
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// `./.ken.yml`, then `<config_dir>/ken/ken.yml`
    pub fn search_path() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(LOCAL_CONFIG)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("ken").join("ken.yml"));
        }
        paths
    }

    fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).context("Failed to read config file")?;
        let config = serde_yaml::from_str(&text).context("Failed to parse config file")?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}

/// Completion provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    /// Only "anthropic" is supported
    pub provider: String,
    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,

    /// Upper bound on max tokens for any single call
    pub max_tokens: u32,

    /// Per-request HTTP timeout
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn get_api_key(&self) -> Result<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                eyre!(
                    "LLM API key not found. Set the {} environment variable.",
                    self.api_key_env
                )
            })
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            base_url: "https://api.anthropic.com".to_string(),
            max_tokens: 8192,
            timeout_ms: 300_000,
        }
    }
}

/// Where kens live, where reflections go, and per-phase limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WakeConfig {
    /// Holds `<ken>/kenning.md` for every ken
    pub kens_dir: PathBuf,

    /// Base directory under which `reflections/` is written
    pub reflections_dir: PathBuf,

    /// `.pmt` overrides for the task and reflection turns
    pub prompts_dir: PathBuf,

    /// Sent with every call when set
    pub system_prompt: Option<String>,

    pub frame_max_tokens: u32,
    pub task_max_tokens: u32,
    pub reflection_max_tokens: u32,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            kens_dir: PathBuf::from("kens"),
            reflections_dir: PathBuf::from("."),
            prompts_dir: PathBuf::from(".ken/prompts"),
            system_prompt: None,
            frame_max_tokens: 4096,
            task_max_tokens: 8192,
            reflection_max_tokens: 4096,
        }
    }
}

impl WakeConfig {
    /// Location of a ken's kenning file
    pub fn kenning_path(&self, ken: &str) -> PathBuf {
        self.kens_dir.join(ken).join("kenning.md")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert!(config.log_level.is_none());
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.llm.max_tokens, 8192);
        assert_eq!(config.wake.kens_dir, PathBuf::from("kens"));
        assert_eq!(config.wake.reflections_dir, PathBuf::from("."));
        assert_eq!(
            (
                config.wake.frame_max_tokens,
                config.wake.task_max_tokens,
                config.wake.reflection_max_tokens
            ),
            (4096, 8192, 4096)
        );
    }

    #[test]
    fn test_full_yaml() {
        let yaml = r#"
log-level: debug

llm:
  model: claude-opus-4
  api-key-env: KEN_KEY
  base-url: http://localhost:8080
  max-tokens: 16384
  timeout-ms: 60000

wake:
  kens-dir: /srv/kens
  reflections-dir: /srv/out
  system-prompt: "You are being woken into a ken."
  task-max-tokens: 12000
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.log_level.as_deref(), Some("debug"));
        assert_eq!(config.llm.model, "claude-opus-4");
        assert_eq!(config.llm.api_key_env, "KEN_KEY");
        assert_eq!(config.llm.base_url, "http://localhost:8080");
        assert_eq!(config.llm.timeout_ms, 60_000);
        assert_eq!(config.wake.kens_dir, PathBuf::from("/srv/kens"));
        assert_eq!(config.wake.reflections_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.wake.system_prompt.as_deref(), Some("You are being woken into a ken."));
        assert_eq!(config.wake.task_max_tokens, 12000);
        // Unset keys keep their defaults
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.wake.frame_max_tokens, 4096);
        assert_eq!(config.wake.prompts_dir, PathBuf::from(".ken/prompts"));
    }

    #[test]
    fn test_empty_yaml_is_defaults() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.wake.kens_dir, WakeConfig::default().kens_dir);
    }

    #[test]
    fn test_load_explicit_path() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("ken.yml");
        fs::write(&path, "wake:\n  kens-dir: elsewhere\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.wake.kens_dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_load_explicit_path_errors() {
        let temp = tempfile::TempDir::new().unwrap();

        let missing = temp.path().join("absent.yml");
        assert!(Config::load(Some(&missing)).is_err());

        let broken = temp.path().join("broken.yml");
        fs::write(&broken, "wake: [not, a, map]\n").unwrap();
        let err = Config::load(Some(&broken)).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config file"));
    }

    #[test]
    fn test_search_path_starts_local() {
        let paths = Config::search_path();
        assert_eq!(paths[0], PathBuf::from(LOCAL_CONFIG));
    }

    #[test]
    fn test_validate_missing_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "KENWAKE_TEST_UNSET_API_KEY".to_string();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("KENWAKE_TEST_UNSET_API_KEY"));
    }

    #[test]
    fn test_validate_present_key() {
        let mut config = Config::default();
        config.llm.api_key_env = "PATH".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_kenning_path() {
        let wake = WakeConfig::default();
        assert_eq!(
            wake.kenning_path("core/kenning-parser"),
            PathBuf::from("kens/core/kenning-parser/kenning.md")
        );
    }
}
