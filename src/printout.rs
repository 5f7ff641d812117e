//! Print requests: the description of one output column of a query result.
//!
//! A [`PrintRequest`] couples a [`PrintMode`] with the display options that
//! apply to the column (`limit` and `order`). Every mode carries exactly what
//! it needs, so a category check always names its category and only a
//! property printout can carry a record index.

use std::fmt;

use crate::datatype::WikiPage;
use crate::property::{PropertyValue, TYPE_BOOLEAN, TYPE_PAGE};

// ------------- SortOrder -------------
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Unordered,
    Ascending,
    Descending,
}

impl SortOrder {
    /// Reads an `order` parameter. Surrounding whitespace is ignored, the
    /// match itself is case-sensitive and anything unrecognised leaves the
    /// column unordered.
    pub fn from_parameter(raw: &str) -> Self {
        match raw.trim() {
            "descending" | "reverse" | "desc" => SortOrder::Descending,
            "ascending" | "asc" => SortOrder::Ascending,
            _ => SortOrder::Unordered,
        }
    }
}

// ------------- PrintMode -------------
#[derive(Clone, Debug)]
pub enum PrintMode {
    /// The subject itself.
    This,
    /// All categories of the subject.
    Categories,
    /// Whether the subject is in the given category.
    CategoryCheck { category: WikiPage },
    /// The values of a property, or one component of each when `index` is
    /// set and the property holds records.
    Property {
        value: PropertyValue,
        index: Option<usize>,
    },
}

// ------------- PrintRequest -------------
#[derive(Clone, Debug)]
pub struct PrintRequest {
    label: String,
    mode: PrintMode,
    limit: Option<usize>,
    order: SortOrder,
}

impl PrintRequest {
    fn with_mode(label: &str, mode: PrintMode) -> Self {
        Self {
            label: String::from(label),
            mode,
            limit: None,
            order: SortOrder::Unordered,
        }
    }
    pub fn this(label: &str) -> Self {
        Self::with_mode(label, PrintMode::This)
    }
    pub fn categories(label: &str) -> Self {
        Self::with_mode(label, PrintMode::Categories)
    }
    pub fn category_check(label: &str, category: WikiPage) -> Self {
        Self::with_mode(label, PrintMode::CategoryCheck { category })
    }
    pub fn property(label: &str, value: PropertyValue) -> Self {
        Self::with_mode(label, PrintMode::Property { value, index: None })
    }
    pub fn property_component(label: &str, value: PropertyValue, index: usize) -> Self {
        Self::with_mode(
            label,
            PrintMode::Property {
                value,
                index: Some(index),
            },
        )
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn with_order(mut self, order: &str) -> Self {
        self.order = SortOrder::from_parameter(order);
        self
    }
    pub fn label(&self) -> &str {
        &self.label
    }
    pub fn mode(&self) -> &PrintMode {
        &self.mode
    }
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
    pub fn order(&self) -> SortOrder {
        self.order
    }
    pub fn index(&self) -> Option<usize> {
        match &self.mode {
            PrintMode::Property { index, .. } => *index,
            _ => None,
        }
    }
    /// Type id of the values this column yields.
    pub fn type_id(&self) -> &str {
        match &self.mode {
            PrintMode::This | PrintMode::Categories => TYPE_PAGE,
            PrintMode::CategoryCheck { .. } => TYPE_BOOLEAN,
            PrintMode::Property { value, .. } => value.type_descriptor().id(),
        }
    }
}

impl fmt::Display for PrintRequest {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.mode {
            PrintMode::This => write!(f, "?")?,
            PrintMode::Categories => write!(f, "?Category")?,
            PrintMode::CategoryCheck { category } => write!(f, "?{}", category)?,
            PrintMode::Property { value, .. } => write!(f, "?{}", value.label())?,
        }
        if !self.label.is_empty() {
            write!(f, "={}", self.label)?;
        }
        Ok(())
    }
}
