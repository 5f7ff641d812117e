use crate::datatype::DataItem;
use crate::printout::{PrintRequest, SortOrder};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Request shaping handed to a store: how many values at most and in which
/// order. A limit of zero asks for nothing and is not the same as no limit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    limit: Option<usize>,
    sort: Option<SortDirection>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
    pub fn with_sort(mut self, direction: SortDirection) -> Self {
        self.sort = Some(direction);
        self
    }
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
    pub fn sort(&self) -> Option<SortDirection> {
        self.sort
    }
    pub fn is_ascending(&self) -> bool {
        self.sort != Some(SortDirection::Descending)
    }

    /// Options for fetching the values of a print request, or `None` when
    /// the request neither limits nor orders. With `use_limit` off the limit
    /// is not read at all, which is what callers want when the fetched
    /// values are cached and limited afterwards.
    pub fn for_print_request(request: &PrintRequest, use_limit: bool) -> Option<Self> {
        let limit = if use_limit { request.limit() } else { None };
        let sort = match request.order() {
            SortOrder::Ascending => Some(SortDirection::Ascending),
            SortOrder::Descending => Some(SortDirection::Descending),
            SortOrder::Unordered => None,
        };
        if limit.is_none() && sort.is_none() {
            return None;
        }
        Some(Self { limit, sort })
    }

    /// Sorts and truncates values the way a store is expected to. The sort
    /// is stable, so equal keys keep their natural order.
    pub fn apply(&self, mut values: Vec<DataItem>) -> Vec<DataItem> {
        match self.sort {
            Some(SortDirection::Ascending) => values.sort_by_key(DataItem::sort_key),
            Some(SortDirection::Descending) => {
                values.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()))
            }
            None => (),
        }
        if let Some(limit) = self.limit {
            values.truncate(limit);
        }
        values
    }
}
