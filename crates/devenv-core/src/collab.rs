//! Boundaries to the scaffolding and code-generation collaborators
//!
//! Scaffolding only needs to write files and read templates, and code
//! generation is a batch "options in, files out" step. Entity shapes are
//! described explicitly with [`EntitySchema`] instead of being discovered
//! from source types.

use std::path::{Path, PathBuf};

use devenv_fs::{NormalizedPath, io};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// File output used by scaffolding.
pub trait FileEmitter {
    /// Write `content` to `path`, relative to the emitter's root.
    fn write_file(&self, path: &str, content: &str) -> Result<()>;

    /// Read the named template.
    fn read_template(&self, name: &str) -> Result<String>;
}

/// Semantic field type of an entity property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "target")]
pub enum TypeTag {
    Text,
    Integer,
    Decimal,
    Boolean,
    DateTime,
    Guid,
    /// Reference to another entity by name.
    Reference(String),
    List(Box<TypeTag>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    pub name: String,
    pub type_tag: TypeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorOptions {
    /// Root namespace for generated types, usually the organization code.
    pub namespace: String,
    pub entities: Vec<EntitySchema>,
    /// Output directory relative to the emitter root.
    pub output_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: String,
    pub content: String,
}

/// Batch code generation.
pub trait CodeGenerator {
    fn generate(&self, options: &GeneratorOptions) -> Result<Vec<GeneratedFile>>;
}

/// Write every generated file through `emitter`, returning how many were written.
pub fn emit_all(emitter: &dyn FileEmitter, files: &[GeneratedFile]) -> Result<usize> {
    for file in files {
        emitter.write_file(&file.path, &file.content)?;
    }
    Ok(files.len())
}

/// [`FileEmitter`] backed by the filesystem. Writes are atomic.
#[derive(Debug, Clone)]
pub struct FsFileEmitter {
    root: PathBuf,
    templates: PathBuf,
}

impl FsFileEmitter {
    pub fn new(root: impl Into<PathBuf>, templates: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: templates.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(base: &Path, rel: &str) -> Result<PathBuf> {
        let normalized = NormalizedPath::new(rel);
        if !normalized.is_contained() {
            return Err(Error::InvalidPath {
                path: rel.to_string(),
            });
        }
        Ok(normalized.under(base))
    }
}

impl FileEmitter for FsFileEmitter {
    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let target = Self::resolve(&self.root, path)?;
        io::write_atomic(&target, content.as_bytes())?;
        tracing::debug!(path = %target.display(), "Wrote file");
        Ok(())
    }

    fn read_template(&self, name: &str) -> Result<String> {
        let path = Self::resolve(&self.templates, name)?;
        Ok(io::read_text(&path)?)
    }
}
