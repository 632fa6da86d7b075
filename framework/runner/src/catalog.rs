use anyhow::Context;
use ollama_client::ModelInfo;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// The models considered available for comparison
///
/// Backed by a plain text allow-list of model families, one per line. Lines starting with `#`
/// are comments; blank lines are ignored. Reads are cached on the file's modification time and
/// saving through the catalog invalidates the cache.
pub struct ModelCatalog {
    path: PathBuf,
    cache: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    modified: SystemTime,
    allowed: Vec<String>,
}

impl ModelCatalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The model families in the allow-list, in file order
    ///
    /// A missing allow-list file is an error, surfaced to the caller rather than treated as an
    /// empty list.
    pub fn allowed_models(&self) -> anyhow::Result<Vec<String>> {
        let modified = std::fs::metadata(&self.path)
            .and_then(|metadata| metadata.modified())
            .ok();

        if let Some(modified) = modified {
            if let Some(entry) = &*self.cache.lock() {
                if entry.modified == modified {
                    return Ok(entry.allowed.clone());
                }
            }
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("File not found: {}", self.path.display()))?;
        let allowed: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect();

        if let Some(modified) = modified {
            *self.cache.lock() = Some(CacheEntry {
                modified,
                allowed: allowed.clone(),
            });
        }

        Ok(allowed)
    }

    /// Overwrite the allow-list with trimmed content and invalidate the cache
    pub fn save(&self, content: &str) -> anyhow::Result<()> {
        std::fs::write(&self.path, content.trim())
            .with_context(|| format!("Failed to write allow-list: {}", self.path.display()))?;
        *self.cache.lock() = None;
        Ok(())
    }

    /// Keep only the installed models whose base name appears in the allow-list
    ///
    /// The base name is the identifier before the first `:`, so an allow-list entry of `llava`
    /// admits `llava:7b` and `llava:13b` alike.
    pub fn filter_installed(&self, installed: Vec<ModelInfo>) -> anyhow::Result<Vec<ModelInfo>> {
        let allowed = self.allowed_models()?;
        Ok(installed
            .into_iter()
            .filter(|model| allowed.iter().any(|family| family == model.base_name()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn info(model: &str) -> ModelInfo {
        ModelInfo {
            model: model.to_string(),
            size: 4_000_000_000,
            modified_at: "2024-05-01T10:00:00Z".to_string(),
        }
    }

    #[test]
    fn comments_and_blank_lines_are_excluded() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models_available.txt");
        std::fs::write(&path, "# vision models\nllava\n\n  moondream  \n#bakllava\n")?;

        let catalog = ModelCatalog::new(&path);
        assert_eq!(
            vec!["llava".to_string(), "moondream".to_string()],
            catalog.allowed_models()?
        );
        Ok(())
    }

    #[test]
    fn a_missing_allow_list_is_an_error() {
        let catalog = ModelCatalog::new("/definitely/not/here.txt");
        assert!(catalog.allowed_models().is_err());
    }

    #[test]
    fn installed_models_filter_by_base_name() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models_available.txt");
        std::fs::write(&path, "llava\n")?;

        let catalog = ModelCatalog::new(&path);
        let filtered = catalog.filter_installed(vec![
            info("llava:7b"),
            info("llava:13b"),
            info("qwen2:7b"),
        ])?;

        let names: Vec<_> = filtered.iter().map(|m| m.model.as_str()).collect();
        assert_eq!(vec!["llava:7b", "llava:13b"], names);
        Ok(())
    }

    #[test]
    fn saving_replaces_the_allow_list() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("models_available.txt");
        std::fs::write(&path, "llava\n")?;

        let catalog = ModelCatalog::new(&path);
        assert_eq!(vec!["llava".to_string()], catalog.allowed_models()?);

        catalog.save("moondream\nllava\n")?;
        assert_eq!(
            vec!["moondream".to_string(), "llava".to_string()],
            catalog.allowed_models()?
        );
        Ok(())
    }
}
