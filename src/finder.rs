//! Resolution of a single result cell.
//!
//! [`ResultFieldMatchFinder`] answers, for one subject and one
//! [`PrintRequest`], which values go into the cell where the subject's row
//! meets the request's column. Absence is never an error: an unknown
//! property, a subject without values or a record without the requested
//! component all give fewer (or no) values. Store failures are passed on
//! unchanged.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::CategoryCache;
use crate::datatype::{DataItem, WikiPage};
use crate::error::Result;
use crate::options::RequestOptions;
use crate::printout::{PrintMode, PrintRequest};
use crate::property::{Property, PropertyValue};
use crate::record::extract_component;
use crate::store::Store;

pub struct ResultFieldMatchFinder<'s> {
    store: &'s dyn Store,
    cache: Arc<CategoryCache>,
}

impl<'s> ResultFieldMatchFinder<'s> {
    /// A finder sharing the process wide category cache.
    pub fn new(store: &'s dyn Store) -> Self {
        Self::with_cache(store, CategoryCache::global())
    }
    pub fn with_cache(store: &'s dyn Store, cache: Arc<CategoryCache>) -> Self {
        Self { store, cache }
    }
    pub fn cache(&self) -> &Arc<CategoryCache> {
        &self.cache
    }

    /// The values of the cell for `subject` under `request`, in order.
    pub fn results_for(&self, subject: &DataItem, request: &PrintRequest) -> Result<Vec<DataItem>> {
        match request.mode() {
            // the limit is ignored here
            PrintMode::This => Ok(vec![subject.clone()]),
            PrintMode::Categories => self.categories(subject, request),
            // the limit is ignored here too
            PrintMode::CategoryCheck { category } => self.category_check(subject, category),
            PrintMode::Property { value, index } => self.property_values(subject, request, value, *index),
        }
    }

    // Always refetched so the requested order is respected. The limit is
    // applied afterwards, which keeps the cached list complete for category
    // checks later in the same row.
    fn categories(&self, subject: &DataItem, request: &PrintRequest) -> Result<Vec<DataItem>> {
        let options = RequestOptions::for_print_request(request, false);
        let categories = self
            .cache
            .list_categories(self.store, subject, options.as_ref())?;
        Ok(match request.limit() {
            Some(limit) => categories.iter().take(limit).cloned().collect(),
            None => categories.to_vec(),
        })
    }

    fn category_check(&self, subject: &DataItem, category: &WikiPage) -> Result<Vec<DataItem>> {
        let found = self.cache.is_member(self.store, subject, category)?;
        trace!(subject = %subject, category = %category, found, "category check");
        Ok(vec![DataItem::boolean(found)])
    }

    fn property_values(
        &self,
        subject: &DataItem,
        request: &PrintRequest,
        value: &PropertyValue,
        index: Option<usize>,
    ) -> Result<Vec<DataItem>> {
        let property = match value.property() {
            Some(property) if value.is_valid() => property,
            _ => {
                debug!(label = value.label(), errors = ?value.errors(), "skipping invalid property");
                return Ok(Vec::new());
            }
        };
        let options = RequestOptions::for_print_request(request, true);
        let content = self.fetch_property_values(std::slice::from_ref(subject), property, options.as_ref())?;

        let descriptor = value.type_descriptor();
        match index {
            Some(index) if descriptor.is_multi_component() => Ok(content
                .iter()
                .filter_map(|item| extract_component(item, descriptor, index))
                .collect()),
            _ => Ok(content),
        }
    }

    // Only pages have property values, anything else is skipped.
    fn fetch_property_values(
        &self,
        subjects: &[DataItem],
        property: &Property,
        options: Option<&RequestOptions>,
    ) -> Result<Vec<DataItem>> {
        let mut values = Vec::new();
        for subject in subjects {
            if subject.as_page().is_none() {
                trace!(kind = %subject.kind(), "not a page, no property values");
                continue;
            }
            values.extend(self.store.property_values(subject, property, options)?);
        }
        Ok(values)
    }
}
