//! Flat-file JSON library of reusable prompt templates.
//!
//! The backing document is shared, process-wide state with no cross-process locking: the last
//! writer wins. Reads go through a cache keyed by the file's modification time and any mutation
//! through the store invalidates it.

use anyhow::Context;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// A reusable prompt template
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptTemplate {
    /// Unique name within the library, compared case-sensitively
    pub name: String,
    pub description: String,
    /// The system text sent with every generation that uses this template
    pub system: String,
    /// The user prompt text
    pub prompt: String,
}

#[derive(Error, Debug)]
pub enum PromptValidationError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Prompt with name {name} already exists")]
    DuplicateName { name: String },

    #[error("No prompt at index {index}")]
    IndexOutOfRange { index: usize },
}

/// Remove any entry with the same name, then append
///
/// Adding is therefore idempotent per name and an edited entry always moves to the end of the
/// library. The name comparison is a case-sensitive exact match.
pub fn upsert_by_name(
    templates: &mut Vec<PromptTemplate>,
    template: PromptTemplate,
) -> Result<(), PromptValidationError> {
    if template.name.trim().is_empty() {
        return Err(PromptValidationError::EmptyName);
    }

    templates.retain(|existing| existing.name != template.name);
    templates.push(template);
    Ok(())
}

/// Replace the entry at `index`, preserving its position
///
/// Rejected when the new name is empty or collides, case-insensitively, with any entry other
/// than the one being replaced. The library is left unchanged on rejection.
pub fn update_at(
    templates: &mut [PromptTemplate],
    index: usize,
    updated: PromptTemplate,
) -> Result<(), PromptValidationError> {
    if updated.name.trim().is_empty() {
        return Err(PromptValidationError::EmptyName);
    }
    if index >= templates.len() {
        return Err(PromptValidationError::IndexOutOfRange { index });
    }

    let collides = templates
        .iter()
        .enumerate()
        .any(|(i, existing)| i != index && existing.name.eq_ignore_ascii_case(&updated.name));
    if collides {
        return Err(PromptValidationError::DuplicateName { name: updated.name });
    }

    templates[index] = updated;
    Ok(())
}

/// Remove the first entry with an exactly matching name, doing nothing when absent
pub fn delete_by_name(templates: &mut Vec<PromptTemplate>, name: &str) {
    if let Some(index) = templates.iter().position(|t| t.name == name) {
        templates.remove(index);
    }
}

/// Find an entry by exact name
pub fn find_by_name<'a>(templates: &'a [PromptTemplate], name: &str) -> Option<&'a PromptTemplate> {
    templates.iter().find(|t| t.name == name)
}

/// The prompt template library, backed by a JSON document on disk
pub struct PromptStore {
    path: PathBuf,
    cache: Mutex<Option<CacheEntry>>,
}

struct CacheEntry {
    modified: SystemTime,
    templates: Vec<PromptTemplate>,
}

impl PromptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the template library, in document order
    ///
    /// An absent file is a valid empty library; callers that want content on first run should
    /// seed it with [PromptStore::init_from_default]. A file that exists but does not parse is
    /// an error and is not silently replaced.
    pub fn load(&self) -> anyhow::Result<Vec<PromptTemplate>> {
        let modified = match std::fs::metadata(&self.path) {
            Ok(metadata) => metadata.modified().ok(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read prompt library: {}", self.path.display())
                })
            }
        };

        if let Some(modified) = modified {
            if let Some(entry) = &*self.cache.lock() {
                if entry.modified == modified {
                    return Ok(entry.templates.clone());
                }
            }
        }

        let templates = load_document(&self.path)?;

        if let Some(modified) = modified {
            *self.cache.lock() = Some(CacheEntry {
                modified,
                templates: templates.clone(),
            });
        }

        Ok(templates)
    }

    /// Overwrite the library with `templates`
    ///
    /// The document is rewritten whole, through a temporary file in the same directory, so a
    /// crashed write cannot leave a partial document behind. There is no cross-process lock.
    pub fn save(&self, templates: &[PromptTemplate]) -> anyhow::Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create prompt library directory: {}", dir.display()))?;

        let mut file = tempfile::NamedTempFile::new_in(dir)
            .context("Failed to create temporary prompt library file")?;
        serde_json::to_writer(&mut file, templates)?;
        file.persist(&self.path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write prompt library: {}", self.path.display()))?;

        self.invalidate();
        Ok(())
    }

    /// Seed the library from the default document, only when the user's file does not exist yet
    pub fn init_from_default(&self, default_path: &Path) -> anyhow::Result<()> {
        if self.path.exists() {
            return Ok(());
        }

        log::info!(
            "Seeding prompt library at {} from {}",
            self.path.display(),
            default_path.display()
        );
        self.save(&load_document_or_empty(default_path)?)
    }

    /// Reset the library to the default document, discarding custom prompts
    pub fn reset_to_default(&self, default_path: &Path) -> anyhow::Result<()> {
        self.save(&load_document_or_empty(default_path)?)
    }

    fn invalidate(&self) {
        *self.cache.lock() = None;
    }
}

fn load_document(path: &Path) -> anyhow::Result<Vec<PromptTemplate>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt library: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Malformed prompt library: {}", path.display()))
}

fn load_document_or_empty(path: &Path) -> anyhow::Result<Vec<PromptTemplate>> {
    if path.exists() {
        load_document(path)
    } else {
        Ok(Vec::new())
    }
}
