// type descriptors are kept once and shared by every property value using them
use std::sync::Arc;

use core::hash::BuildHasherDefault;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use seahash::SeaHasher;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

// used to print out readable forms of a property
use std::fmt;

use crate::datatype::{normalize_db_key, DataItemKind};
use crate::error::{CellfinderError, Result};

pub type KeyHasher = BuildHasherDefault<SeaHasher>;

// the predefined property linking a page to its categories
pub const INSTANCE_OF: &str = "_INST";

pub const TYPE_PAGE: &str = "_wpg";
pub const TYPE_TEXT: &str = "_txt";
pub const TYPE_NUMBER: &str = "_num";
pub const TYPE_BOOLEAN: &str = "_boo";
pub const TYPE_TIME: &str = "_dat";
pub const TYPE_RECORD: &str = "_rec";

lazy_static! {
    static ref ILLEGAL_KEY_CHARACTERS: Regex = Regex::new(r"[\[\]{}|#<>]").unwrap();
}

// ------------- Property -------------
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Property {
    key: String,
    inverse: bool,
}

impl Property {
    pub fn new(label: &str, inverse: bool) -> Result<Self> {
        let label = label.trim();
        // predefined keys are taken verbatim
        let key = if label.starts_with('_') {
            label.to_string()
        } else {
            normalize_db_key(label)
        };
        if key.trim_matches('_').is_empty() {
            return Err(CellfinderError::InvalidProperty(format!(
                "'{}' does not name a property",
                label
            )));
        }
        if ILLEGAL_KEY_CHARACTERS.is_match(&key) {
            return Err(CellfinderError::InvalidProperty(format!(
                "'{}' contains characters not allowed in a property name",
                label
            )));
        }
        Ok(Self { key, inverse })
    }
    pub fn instance_of() -> Self {
        Self {
            key: String::from(INSTANCE_OF),
            inverse: false,
        }
    }
    pub fn key(&self) -> &str {
        &self.key
    }
    pub fn is_inverse(&self) -> bool {
        self.inverse
    }
    pub fn is_predefined(&self) -> bool {
        self.key.starts_with('_')
    }
    // the same property read in the direction it was stored
    pub fn forward(&self) -> Self {
        Self {
            key: self.key.clone(),
            inverse: false,
        }
    }
    pub fn label(&self) -> String {
        let name = if self.key == INSTANCE_OF {
            String::from("Category")
        } else {
            self.key.replace('_', " ")
        };
        if self.inverse { format!("-{}", name) } else { name }
    }
}
impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ------------- TypeDescriptor -------------
fn kind_of_type(id: &str) -> Option<DataItemKind> {
    match id {
        TYPE_PAGE => Some(DataItemKind::WikiPage),
        TYPE_TEXT => Some(DataItemKind::Blob),
        TYPE_NUMBER => Some(DataItemKind::Number),
        TYPE_BOOLEAN => Some(DataItemKind::Boolean),
        TYPE_TIME => Some(DataItemKind::Time),
        TYPE_RECORD => Some(DataItemKind::Record),
        _ => None,
    }
}

/// Declared type of a property. Record types list the kinds of their fields,
/// which makes them multi-component; every other type has no fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    id: String,
    kind: DataItemKind,
    fields: Vec<DataItemKind>,
}

impl TypeDescriptor {
    fn simple(id: &str, kind: DataItemKind) -> Self {
        Self {
            id: String::from(id),
            kind,
            fields: Vec::new(),
        }
    }
    pub fn page() -> Self {
        Self::simple(TYPE_PAGE, DataItemKind::WikiPage)
    }
    pub fn text() -> Self {
        Self::simple(TYPE_TEXT, DataItemKind::Blob)
    }
    pub fn number() -> Self {
        Self::simple(TYPE_NUMBER, DataItemKind::Number)
    }
    pub fn boolean() -> Self {
        Self::simple(TYPE_BOOLEAN, DataItemKind::Boolean)
    }
    pub fn time() -> Self {
        Self::simple(TYPE_TIME, DataItemKind::Time)
    }
    pub fn record(fields: Vec<DataItemKind>) -> Result<Self> {
        if fields.is_empty() {
            return Err(CellfinderError::InvalidProperty(String::from(
                "a record type needs at least one field",
            )));
        }
        if fields.contains(&DataItemKind::Record) {
            return Err(CellfinderError::InvalidProperty(String::from(
                "record fields cannot themselves be records",
            )));
        }
        Ok(Self {
            id: String::from(TYPE_RECORD),
            kind: DataItemKind::Record,
            fields,
        })
    }
    /// Builds a descriptor from a type id such as `_num`, with field type ids
    /// for records (`_rec` with `["_txt", "_num"]`).
    pub fn from_type_id<S: AsRef<str>>(id: &str, fields: &[S]) -> Result<Self> {
        let id = id.trim();
        let kind = kind_of_type(id)
            .ok_or_else(|| CellfinderError::InvalidProperty(format!("unknown type '{}'", id)))?;
        match kind {
            DataItemKind::Record => {
                let mut field_kinds = Vec::with_capacity(fields.len());
                for field in fields {
                    let field = field.as_ref().trim();
                    let field_kind = kind_of_type(field).ok_or_else(|| {
                        CellfinderError::InvalidProperty(format!("unknown field type '{}'", field))
                    })?;
                    field_kinds.push(field_kind);
                }
                Self::record(field_kinds)
            }
            _ if !fields.is_empty() => Err(CellfinderError::InvalidProperty(format!(
                "type '{}' does not take fields",
                id
            ))),
            _ => Ok(Self::simple(id, kind)),
        }
    }
    pub fn id(&self) -> &str {
        &self.id
    }
    pub fn kind(&self) -> DataItemKind {
        self.kind
    }
    pub fn fields(&self) -> &[DataItemKind] {
        &self.fields
    }
    pub fn is_multi_component(&self) -> bool {
        !self.fields.is_empty()
    }
    pub fn component_count(&self) -> usize {
        self.fields.len()
    }
    // 1-based like record indexes
    pub fn field(&self, index: usize) -> Option<DataItemKind> {
        index.checked_sub(1).and_then(|i| self.fields.get(i).copied())
    }
}

// ------------- PropertyValue -------------
/// A property as referenced by a print request: the parsed property (if the
/// label named one), its declared type and any problems found on the way.
#[derive(Clone, Debug)]
pub struct PropertyValue {
    label: String,
    property: Option<Property>,
    descriptor: Arc<TypeDescriptor>,
    errors: Vec<String>,
}

impl PropertyValue {
    pub fn new(property: Property, descriptor: Arc<TypeDescriptor>) -> Self {
        let mut errors = Vec::new();
        if property.is_inverse() && descriptor.kind() != DataItemKind::WikiPage {
            errors.push(format!(
                "'{}' can only be inverted when it holds pages, it is of type {}",
                property.key(),
                descriptor.id()
            ));
        }
        Self {
            label: property.label(),
            property: Some(property),
            descriptor,
            errors,
        }
    }
    pub fn invalid(label: &str, error: String) -> Self {
        Self {
            label: String::from(label),
            property: None,
            descriptor: Arc::new(TypeDescriptor::page()),
            errors: vec![error],
        }
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn property(&self) -> Option<&Property> {
        self.property.as_ref()
    }
    pub fn type_descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }
    pub fn errors(&self) -> &[String] {
        &self.errors
    }
    pub fn is_valid(&self) -> bool {
        self.property.is_some() && self.errors.is_empty()
    }
}

// ------------- PropertyRegistry -------------
/// Keeps the declared type of every known property. Undeclared properties
/// hold pages.
#[derive(Debug)]
pub struct PropertyRegistry {
    kept: HashMap<String, Arc<TypeDescriptor>, KeyHasher>,
    default: Arc<TypeDescriptor>,
}

impl PropertyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            kept: HashMap::default(),
            default: Arc::new(TypeDescriptor::page()),
        };
        registry.keep(&Property::instance_of(), TypeDescriptor::page());
        registry
    }
    // The first declaration of a property wins.
    pub fn keep(&mut self, property: &Property, descriptor: TypeDescriptor) -> (Arc<TypeDescriptor>, bool) {
        match self.kept.entry(property.key().to_string()) {
            Entry::Vacant(e) => (Arc::clone(e.insert(Arc::new(descriptor))), false),
            Entry::Occupied(e) => {
                if **e.get() != descriptor {
                    warn!(
                        property = property.key(),
                        kept = e.get().id(),
                        ignored = descriptor.id(),
                        "property already declared with another type"
                    );
                }
                (Arc::clone(e.get()), true)
            }
        }
    }
    pub fn declare(&mut self, label: &str, descriptor: TypeDescriptor) -> Result<Arc<TypeDescriptor>> {
        let property = Property::new(label, false)?;
        let (kept, _) = self.keep(&property, descriptor);
        Ok(kept)
    }
    pub fn descriptor(&self, property: &Property) -> Arc<TypeDescriptor> {
        Arc::clone(self.kept.get(property.key()).unwrap_or(&self.default))
    }
    pub fn is_declared(&self, property: &Property) -> bool {
        self.kept.contains_key(property.key())
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
    pub fn is_empty(&self) -> bool {
        self.kept.is_empty()
    }
    /// Resolves a label such as `Has mother` or `-Has mother` (inverse) into a
    /// property value. Labels that do not name a property give an invalid
    /// value instead of an error.
    pub fn property_value(&self, label: &str) -> PropertyValue {
        let trimmed = label.trim();
        let (name, inverse) = match trimmed.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };
        match Property::new(name, inverse) {
            Ok(property) => {
                let descriptor = self.descriptor(&property);
                PropertyValue::new(property, descriptor)
            }
            Err(e) => PropertyValue::invalid(trimmed, e.to_string()),
        }
    }
}

impl Default for PropertyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
