//! Cellfinder – resolves the values of a single cell in a semantic query result.
//!
//! A query result is a table: one row per matching subject, one column per
//! *print request*. Deciding which subjects match is the query engine's job
//! and rendering the table is the output layer's; this crate sits between
//! them and answers the question in the middle: given a subject and a print
//! request, which typed values belong in that cell?
//!
//! * A [`datatype::DataItem`] is an immutable typed value (page, text, number,
//!   boolean, time or record) identified by a stable content hash.
//! * A [`printout::PrintRequest`] describes a column: the subject itself, its
//!   categories, membership in one category, or the values of a property
//!   (optionally one component of a record valued property), together with
//!   the `limit` and `order` display options.
//! * A [`store::Store`] hands out property values per subject.
//! * The [`finder::ResultFieldMatchFinder`] puts these together.
//!
//! ## Modules
//! * [`datatype`] – Data items, pages, records and their hashes.
//! * [`property`] – Properties, type descriptors and the registry that keeps them.
//! * [`printout`] – Print requests and their modes.
//! * [`options`] – Translation of display options into store fetch options.
//! * [`cache`] – Per-subject category cache.
//! * [`record`] – Component access on record values.
//! * [`finder`] – The cell resolver.
//! * [`store`] – The store interface and an in-memory store.
//! * [`persist`] – A SQLite store organised in property tables.
//! * [`settings`] – Layered settings for the binary.
//!
//! ## Quick Start
//! ```
//! use std::sync::Arc;
//! use cellfinder::{cache::CategoryCache, finder::ResultFieldMatchFinder, store::MemoryStore};
//! use cellfinder::datatype::{DataItem, WikiPage, NS_MAIN};
//! use cellfinder::printout::PrintRequest;
//! let store = MemoryStore::new();
//! let alice = WikiPage::new("Alice", NS_MAIN);
//! store.add_category(&alice, &WikiPage::category("Person")).unwrap();
//! let finder = ResultFieldMatchFinder::with_cache(&store, Arc::new(CategoryCache::single_slot()));
//! let column = PrintRequest::category_check("Person", WikiPage::category("Person"));
//! let cell = finder.results_for(&DataItem::from(alice), &column).unwrap();
//! assert_eq!(cell, vec![DataItem::boolean(true)]);
//! ```
//!
//! ## Categories and the cache
//! Category listings are always fetched afresh so that the requested order
//! is honoured, and their limit is applied only after the fetch. The complete
//! list is remembered per subject in a [`cache::CategoryCache`] so that
//! category checks later in the same row need no further store round trip.
//! The cache is shared (a process wide instance unless one is injected) and
//! can be reset at any time.

pub mod cache;
pub mod datatype;
pub mod error;
pub mod finder;
pub mod options;
pub mod persist;
pub mod printout;
pub mod property;
pub mod record;
pub mod settings;
pub mod store;

pub use crate::error::{CellfinderError, Result};
