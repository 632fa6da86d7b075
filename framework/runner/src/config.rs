use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File used when no `--config` path is given
pub const DEFAULT_CONFIG_PATH: &str = "vision-comparator.toml";

/// Runner configuration, loaded from a TOML document
///
/// Every field has a default so a missing file or a partial document is fine to start from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComparatorConfig {
    /// Base URL of the model serving daemon
    pub daemon_url: String,

    /// Plain text allow-list of model families with vision support, one per line
    pub models_available_path: PathBuf,

    /// The user's prompt library document
    pub prompts_path: PathBuf,

    /// The read-only document used to seed and reset the prompt library
    pub prompts_default_path: PathBuf,

    /// Directory where run artifacts are written
    pub artifact_dir: PathBuf,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            daemon_url: "http://localhost:11434".to_string(),
            models_available_path: PathBuf::from("models_available.txt"),
            prompts_path: PathBuf::from("prompts.json"),
            prompts_default_path: PathBuf::from("prompts.default.json"),
            artifact_dir: PathBuf::from("artifacts"),
        }
    }
}

impl ComparatorConfig {
    /// Load the configuration
    ///
    /// An explicitly given path must exist. Without one, [DEFAULT_CONFIG_PATH] is read when
    /// present and the defaults are used otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Malformed config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn partial_documents_fall_back_to_defaults() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "daemon_url = \"http://ollama.local:11434\"\n")?;

        let config = ComparatorConfig::load(Some(&path))?;

        assert_eq!("http://ollama.local:11434", config.daemon_url);
        assert_eq!(PathBuf::from("prompts.json"), config.prompts_path);
        Ok(())
    }

    #[test]
    fn a_missing_explicit_config_is_an_error() {
        assert!(ComparatorConfig::load(Some(Path::new("/definitely/not/here.toml"))).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "daemon_uri = \"http://typo.example\"\n")?;

        assert!(ComparatorConfig::load(Some(&path)).is_err());
        Ok(())
    }
}
