use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BsError, Result};
use crate::schema::field::{DEFAULT_INDEX_FIELDS, FieldSpec};
use crate::schema::naming;

pub const PROJECT_CONFIG_FILE: &str = "bookseek.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

impl Config {
    /// Defaults, then the global and project files (or only `explicit_path`
    /// / `BOOKSEEK_CONFIG` when given), then `BOOKSEEK_*` overrides.
    pub fn load(explicit_path: Option<&Path>, root: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("BOOKSEEK_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?
                .ok_or_else(|| BsError::ConfigNotFound(path.display().to_string()))?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_project(root)? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;
        config.validate()?;

        Ok(config)
    }

    /// Database path, resolved against `root` when relative.
    #[must_use]
    pub fn database_path(&self, root: &Path) -> PathBuf {
        let path = PathBuf::from(&self.database.path);
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }

    /// The field specs to index, in declaration order.
    ///
    /// Each name in `index.fields` resolves to its explicit entry in
    /// `index.specs` if there is one, else to the book dataset's type table.
    /// Explicit specs not named in `fields` are appended.
    #[must_use]
    pub fn index_specs(&self) -> Vec<FieldSpec> {
        let mut specs: Vec<FieldSpec> = self
            .index
            .fields
            .iter()
            .map(|field| self.spec_for(field))
            .collect();
        for spec in &self.index.specs {
            if !self.index.fields.contains(&spec.field_name) {
                specs.push(spec.clone());
            }
        }
        specs
    }

    /// Spec for a single field name.
    #[must_use]
    pub fn spec_for(&self, field: &str) -> FieldSpec {
        self.index
            .specs
            .iter()
            .find(|spec| spec.field_name == field)
            .cloned()
            .unwrap_or_else(|| FieldSpec::for_book_field(field))
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let path = dirs::config_dir()
            .ok_or_else(|| BsError::MissingConfig("config directory not found".to_string()))?
            .join("bookseek/config.toml");
        Self::load_patch(&path)
    }

    fn load_project(root: &Path) -> Result<Option<ConfigPatch>> {
        let path = root.join(PROJECT_CONFIG_FILE);
        Self::load_patch(&path)
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| BsError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| BsError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.database {
            self.database.merge(patch);
        }
        if let Some(patch) = patch.collection {
            self.collection.merge(patch);
        }
        if let Some(patch) = patch.index {
            self.index.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_string("BOOKSEEK_DATABASE") {
            self.database.path = value;
        }
        if let Some(value) = env_string("BOOKSEEK_COLLECTION") {
            self.collection.name = value;
        }
        if let Some(value) = env_usize("BOOKSEEK_BATCH_SIZE")? {
            self.collection.batch_size = value;
        }
        if let Some(values) = env_list("BOOKSEEK_INDEX_FIELDS")? {
            self.index.fields = values;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(BsError::MissingConfig("database.path".to_string()));
        }
        naming::validate_collection_name(&self.collection.name)
            .map_err(|err| BsError::Config(format!("collection.name: {err}")))?;
        if self.collection.batch_size == 0 {
            return Err(BsError::Config("collection.batch_size must be at least 1".to_string()));
        }
        for field in &self.index.fields {
            naming::validate_field_name(field)
                .map_err(|err| BsError::Config(format!("index.fields: {err}")))?;
        }
        for spec in &self.index.specs {
            spec.validate()
                .map_err(|err| BsError::Config(format!("index.specs: {err}")))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "bookseek.db".to_string(),
        }
    }
}

impl DatabaseConfig {
    fn merge(&mut self, patch: DatabasePatch) {
        if let Some(value) = patch.path {
            self.path = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub batch_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            name: "book_info".to_string(),
            batch_size: 100,
        }
    }
}

impl CollectionConfig {
    fn merge(&mut self, patch: CollectionPatch) {
        if let Some(value) = patch.name {
            self.name = value;
        }
        if let Some(value) = patch.batch_size {
            self.batch_size = value;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub specs: Vec<FieldSpec>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            fields: DEFAULT_INDEX_FIELDS.iter().map(ToString::to_string).collect(),
            specs: Vec::new(),
        }
    }
}

impl IndexConfig {
    fn merge(&mut self, patch: IndexPatch) {
        if let Some(values) = patch.fields {
            self.fields = values;
        }
        if let Some(specs) = patch.specs {
            for spec in specs {
                match self
                    .specs
                    .iter_mut()
                    .find(|existing| existing.field_name == spec.field_name)
                {
                    Some(existing) => *existing = spec,
                    None => self.specs.push(spec),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub database: Option<DatabasePatch>,
    pub collection: Option<CollectionPatch>,
    pub index: Option<IndexPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabasePatch {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CollectionPatch {
    pub name: Option<String>,
    pub batch_size: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct IndexPatch {
    pub fields: Option<Vec<String>>,
    pub specs: Option<Vec<FieldSpec>>,
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value.parse::<usize>().map(Some).map_err(|err| {
            BsError::Config(format!("invalid {key} value {value}: {err}"))
        }),
        Err(_) => Ok(None),
    }
}

fn env_list(key: &str) -> Result<Option<Vec<String>>> {
    match std::env::var(key) {
        Ok(value) => {
            let list = value
                .split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            Ok(Some(list))
        }
        Err(_) => Ok(None),
    }
}
