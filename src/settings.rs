//! Settings for the `cellfinder` binary.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables prefixed with `CELLFINDER` (nested keys separated by
//! `__`, e.g. `CELLFINDER_CACHE__CAPACITY=1`).
//!
//! The binary only reads: `database.path` must point at a database that was
//! filled through [`crate::persist::SqliteStore`].
//!
//! ```toml
//! subjects = ["Alice", "Bob"]
//!
//! [database]
//! path = "wiki.db"
//!
//! [[properties]]
//! name = "Has address"
//! type_id = "_rec"
//! fields = ["_txt", "_num"]
//!
//! [[columns]]
//! mode = "categories"
//! limit = 2
//! order = "asc"
//!
//! [[columns]]
//! mode = "property"
//! data = "Has address"
//! index = 2
//! ```

use ::config::{Config, Environment, File};
use serde::Deserialize;

use crate::cache::DEFAULT_CAPACITY;
use crate::datatype::WikiPage;
use crate::error::{CellfinderError, Result};
use crate::persist::PersistenceMode;
use crate::printout::PrintRequest;
use crate::property::{PropertyRegistry, TypeDescriptor};

pub const DEFAULT_CONFIG_FILE: &str = "cellfinder.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseSettings {
    // no path keeps everything in memory
    pub path: Option<String>,
}

impl DatabaseSettings {
    pub fn mode(&self) -> PersistenceMode {
        match &self.path {
            Some(path) => PersistenceMode::File(path.clone()),
            None => PersistenceMode::InMemory,
        }
    }
    /// The mode for reading an existing database. An in-memory store would
    /// start out empty, so a path is required.
    pub fn existing_file(&self) -> Result<PersistenceMode> {
        match self.path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => Ok(PersistenceMode::File(path.to_string())),
            _ => Err(CellfinderError::Config(String::from(
                "'database.path' must name a database filled through SqliteStore",
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySettings {
    pub name: String,
    pub type_id: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl PropertySettings {
    pub fn declare(&self, registry: &mut PropertyRegistry) -> Result<()> {
        let descriptor = TypeDescriptor::from_type_id(&self.type_id, &self.fields)?;
        registry.declare(&self.name, descriptor)?;
        Ok(())
    }
}

/// One output column as declared in the settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSettings {
    pub mode: String,
    pub label: Option<String>,
    pub data: Option<String>,
    pub limit: Option<usize>,
    pub order: Option<String>,
    pub index: Option<usize>,
}

impl ColumnSettings {
    fn data(&self) -> Result<&str> {
        self.data
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                CellfinderError::InvalidPrintRequest(format!("mode '{}' needs 'data'", self.mode))
            })
    }

    pub fn to_print_request(&self, registry: &PropertyRegistry) -> Result<PrintRequest> {
        let mode = self.mode.trim();
        if self.index.is_some() && mode != "property" {
            return Err(CellfinderError::InvalidPrintRequest(format!(
                "'index' only applies to property columns, not '{}'",
                mode
            )));
        }
        let request = match mode {
            "this" => PrintRequest::this(self.label.as_deref().unwrap_or("")),
            "categories" => PrintRequest::categories(self.label.as_deref().unwrap_or("Category")),
            "category" => {
                let category = WikiPage::category(self.data()?);
                let label = self.label.clone().unwrap_or_else(|| category.title());
                PrintRequest::category_check(&label, category)
            }
            "property" => {
                let value = registry.property_value(self.data()?);
                let label = self.label.clone().unwrap_or_else(|| value.label().to_string());
                match self.index {
                    Some(index) => PrintRequest::property_component(&label, value, index),
                    None => PrintRequest::property(&label, value),
                }
            }
            other => {
                return Err(CellfinderError::InvalidPrintRequest(format!(
                    "unknown mode '{}'",
                    other
                )));
            }
        };
        let request = match self.limit {
            Some(limit) => request.with_limit(limit),
            None => request,
        };
        Ok(match &self.order {
            Some(order) => request.with_order(order),
            None => request,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub database: DatabaseSettings,
    pub log: LogSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub properties: Vec<PropertySettings>,
    #[serde(default)]
    pub columns: Vec<ColumnSettings>,
    #[serde(default)]
    pub subjects: Vec<String>,
}

impl Settings {
    /// Loads settings from `path` (or `cellfinder.toml`), which may be
    /// missing, with environment overrides on top.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let settings = Config::builder()
            .set_default("log.filter", "info")?
            .set_default("cache.capacity", DEFAULT_CAPACITY as u64)?
            .add_source(File::with_name(path.unwrap_or(DEFAULT_CONFIG_FILE)).required(path.is_some()))
            .add_source(
                Environment::with_prefix("CELLFINDER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn registry(&self) -> Result<PropertyRegistry> {
        let mut registry = PropertyRegistry::new();
        for property in &self.properties {
            property.declare(&mut registry)?;
        }
        Ok(registry)
    }

    pub fn print_requests(&self, registry: &PropertyRegistry) -> Result<Vec<PrintRequest>> {
        self.columns
            .iter()
            .map(|column| column.to_print_request(registry))
            .collect()
    }
}
