use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::datatype::{DataItem, WikiPage};
use crate::error::{CellfinderError, Result};
use crate::options::RequestOptions;
use crate::property::Property;

/// Read access to per-subject property values.
///
/// Implementations return values in their natural order unless the options
/// ask for a sort, honour the limit when one is given, and answer with an
/// empty vector (not an error) when the subject has no values. An inverse
/// property yields the pages that hold the subject as a value.
pub trait Store: Send + Sync {
    fn property_values(
        &self,
        subject: &DataItem,
        property: &Property,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>>;
}

impl<S: Store + ?Sized> Store for Arc<S> {
    fn property_values(
        &self,
        subject: &DataItem,
        property: &Property,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>> {
        (**self).property_values(subject, property, options)
    }
}

// ------------- MemoryStore -------------
#[derive(Debug)]
struct Triple {
    subject: WikiPage,
    property: Property,
    value: DataItem,
}

/// Keeps values in insertion order and counts every fetch, which makes it
/// handy for observing how often a caller goes to the store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    triples: RwLock<Vec<Triple>>,
    fetches: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
    /// Adds a value, returning false when the exact triple was already kept.
    pub fn add_value(&self, subject: &WikiPage, property: &Property, value: DataItem) -> Result<bool> {
        if property.is_inverse() {
            return Err(CellfinderError::InvalidProperty(format!(
                "values are added through '{}', not its inverse",
                property.key()
            )));
        }
        let mut triples = self.triples.write()?;
        let previously_kept = triples
            .iter()
            .any(|t| &t.subject == subject && t.property == *property && t.value == value);
        if !previously_kept {
            triples.push(Triple {
                subject: subject.clone(),
                property: property.clone(),
                value,
            });
        }
        Ok(!previously_kept)
    }
    pub fn add_category(&self, subject: &WikiPage, category: &WikiPage) -> Result<bool> {
        self.add_value(subject, &Property::instance_of(), DataItem::WikiPage(category.clone()))
    }
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
    pub fn reset_fetch_count(&self) {
        self.fetches.store(0, Ordering::SeqCst);
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.triples.read()?.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

impl Store for MemoryStore {
    fn property_values(
        &self,
        subject: &DataItem,
        property: &Property,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let page = match subject.as_page() {
            Some(page) => page,
            None => return Ok(Vec::new()),
        };
        let triples = self.triples.read()?;
        let values: Vec<DataItem> = if property.is_inverse() {
            triples
                .iter()
                .filter(|t| t.property.key() == property.key() && t.value.as_page() == Some(page))
                .map(|t| DataItem::WikiPage(t.subject.clone()))
                .collect()
        } else {
            triples
                .iter()
                .filter(|t| &t.subject == page && t.property.key() == property.key())
                .map(|t| t.value.clone())
                .collect()
        };
        trace!(subject = %page, property = %property, found = values.len(), "memory fetch");
        Ok(match options {
            Some(options) => options.apply(values),
            None => values,
        })
    }
}
