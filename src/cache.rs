//! Category membership cache.
//!
//! A result row often asks for the categories of its subject and then checks
//! the same subject against one or more categories. [`CategoryCache`] keeps
//! the last fetched category list per subject, keyed by the subject's
//! [`ItemHash`], so such checks can be answered without going back to the
//! store. An entry is only trusted when its key equals the hash of the
//! subject at hand; anything else is a miss and leads to a fetch.
//!
//! The store is never called while the cache is locked. Two threads working
//! on the same subject may therefore both fetch, but neither can observe
//! another subject's categories.

use core::hash::BuildHasherDefault;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use lazy_static::lazy_static;
use seahash::SeaHasher;
use tracing::{debug, trace};

use crate::datatype::{DataItem, ItemHash, WikiPage};
use crate::error::Result;
use crate::options::RequestOptions;
use crate::property::Property;
use crate::store::Store;

pub type ItemHasher = BuildHasherDefault<SeaHasher>;

pub const DEFAULT_CAPACITY: usize = 256;

lazy_static! {
    static ref GLOBAL: Arc<CategoryCache> = Arc::new(CategoryCache::new(DEFAULT_CAPACITY));
}

#[derive(Debug, Default)]
struct Slots {
    entries: HashMap<ItemHash, Arc<Vec<DataItem>>, ItemHasher>,
    // insertion order, oldest first, for eviction
    arrival: VecDeque<ItemHash>,
}

#[derive(Debug)]
pub struct CategoryCache {
    capacity: usize,
    slots: Mutex<Slots>,
}

impl CategoryCache {
    /// A cache holding at most `capacity` subjects (at least one). When full,
    /// the subject cached first is evicted.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            slots: Mutex::new(Slots::default()),
        }
    }
    /// Remembers only the most recent subject.
    pub fn single_slot() -> Self {
        Self::new(1)
    }
    /// The process wide instance shared by finders that were not handed a
    /// cache of their own. Long running jobs should `reset` it between
    /// result sets.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL)
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Always fetches the categories of `subject` with the given options and
    /// remembers them for later membership checks. A fetch that was limited
    /// is returned but not remembered, the cached list must be complete.
    pub fn list_categories(
        &self,
        store: &dyn Store,
        subject: &DataItem,
        options: Option<&RequestOptions>,
    ) -> Result<Arc<Vec<DataItem>>> {
        let categories = Arc::new(store.property_values(subject, &Property::instance_of(), options)?);
        debug!(subject = %subject, found = categories.len(), "listed categories");
        if options.is_none_or(|o| o.limit().is_none()) {
            self.remember(subject.item_hash(), Arc::clone(&categories))?;
        }
        Ok(categories)
    }

    /// The full category list of `subject`, from the cache unless it has no
    /// entry for the subject or `force_refresh` is set.
    pub fn categories(
        &self,
        store: &dyn Store,
        subject: &DataItem,
        force_refresh: bool,
    ) -> Result<Arc<Vec<DataItem>>> {
        let hash = subject.item_hash();
        if !force_refresh {
            if let Some(categories) = self.lookup(&hash)? {
                trace!(subject = %subject, "category cache hit");
                return Ok(categories);
            }
        }
        let categories = Arc::new(store.property_values(subject, &Property::instance_of(), None)?);
        debug!(subject = %subject, found = categories.len(), force_refresh, "fetched categories");
        self.remember(hash, Arc::clone(&categories))?;
        Ok(categories)
    }

    /// Whether `category` is among the categories of `subject`, comparing
    /// storage keys.
    pub fn is_member(&self, store: &dyn Store, subject: &DataItem, category: &WikiPage) -> Result<bool> {
        let categories = self.categories(store, subject, false)?;
        Ok(categories
            .iter()
            .any(|c| c.db_key() == Some(category.db_key())))
    }

    pub fn cached(&self, subject: &DataItem) -> Result<Option<Arc<Vec<DataItem>>>> {
        self.lookup(&subject.item_hash())
    }
    pub fn invalidate(&self, subject: &DataItem) -> Result<bool> {
        let hash = subject.item_hash();
        let mut slots = self.slots.lock()?;
        let removed = slots.entries.remove(&hash).is_some();
        if removed {
            slots.arrival.retain(|h| *h != hash);
        }
        Ok(removed)
    }
    pub fn reset(&self) -> Result<()> {
        let mut slots = self.slots.lock()?;
        slots.entries.clear();
        slots.arrival.clear();
        Ok(())
    }
    pub fn len(&self) -> Result<usize> {
        Ok(self.slots.lock()?.entries.len())
    }
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn lookup(&self, hash: &ItemHash) -> Result<Option<Arc<Vec<DataItem>>>> {
        let slots = self.slots.lock()?;
        Ok(slots.entries.get(hash).map(Arc::clone))
    }
    fn remember(&self, hash: ItemHash, categories: Arc<Vec<DataItem>>) -> Result<()> {
        let mut slots = self.slots.lock()?;
        if slots.entries.insert(hash, categories).is_none() {
            slots.arrival.push_back(hash);
            while slots.entries.len() > self.capacity {
                match slots.arrival.pop_front() {
                    Some(oldest) => {
                        slots.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
        }
        Ok(())
    }
}

impl Default for CategoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
