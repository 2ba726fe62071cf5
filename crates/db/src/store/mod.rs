//! Conditional write engine over the single table.
//!
//! [`ItemStore`] is the only concurrency-control surface of the library:
//!
//! - [`ItemStore::create`] fails with `AlreadyExists` if the key is occupied;
//! - [`ItemStore::update`] and [`ItemStore::delete`] fail with `NotFound` if
//!   the key is absent at the time of the write;
//! - [`WriteOp::UpdateIf`] additionally fails with `Conflict` unless one
//!   attribute of the stored item still holds the value the caller read;
//! - [`ItemStore::transact_write`] applies a batch all-or-nothing, with the
//!   same guards per operation.
//!
//! Query results are ordered by sort key (index queries by index sort key,
//! then primary key) and paged with limit+1 reads, so a page's `last_key` is
//! `Some` exactly when more items follow.

use async_trait::async_trait;
use soundshelf_core::cursor::StartKey;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{IndexName, ItemKey};

use crate::item::Item;

pub mod memory;
pub mod pg;

pub use memory::MemoryItemStore;
pub use pg::PgItemStore;

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// A range read over one partition of the table or of an index.
#[derive(Debug, Clone)]
pub struct Query {
    pub index: Option<IndexName>,
    pub partition: String,
    pub sk_prefix: Option<String>,
    pub order: SortOrder,
    pub limit: usize,
    pub start: Option<StartKey>,
}

impl Query {
    /// Read a primary-key partition.
    pub fn partition(pk: impl Into<String>) -> Self {
        Self {
            index: None,
            partition: pk.into(),
            sk_prefix: None,
            order: SortOrder::Ascending,
            limit: soundshelf_core::cursor::DEFAULT_PAGE_LIMIT,
            start: None,
        }
    }

    /// Read a partition of an index projection.
    pub fn index(index: IndexName, pk: impl Into<String>) -> Self {
        Self {
            index: Some(index),
            ..Self::partition(pk)
        }
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sk_prefix = Some(prefix.into());
        self
    }

    pub fn descending(mut self) -> Self {
        self.order = SortOrder::Descending;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn start_after(mut self, start: Option<StartKey>) -> Self {
        self.start = start;
        self
    }

    /// Reject a start key that belongs to a different partition or access path.
    pub fn validate_start(&self) -> Result<(), CoreError> {
        let Some(start) = &self.start else {
            return Ok(());
        };
        if start.index.is_some() != self.index.is_some() {
            return Err(CoreError::InvalidCursor(
                "cursor was issued for a different listing".into(),
            ));
        }
        if start.partition() != self.partition {
            return Err(CoreError::InvalidCursor(
                "cursor was issued for a different partition".into(),
            ));
        }
        Ok(())
    }

    /// Start key that resumes right after `item` in this query.
    pub fn start_key_for(&self, item: &Item) -> StartKey {
        StartKey {
            primary: item.key.clone(),
            index: self.index.and_then(|ix| item.index_key(ix).cloned()),
        }
    }
}

/// One page of raw items.
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    pub items: Vec<Item>,
    /// Resume position; `Some` iff more items follow.
    pub last_key: Option<StartKey>,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// One member of a [`ItemStore::transact_write`] batch.
#[derive(Debug, Clone)]
pub enum WriteOp {
    /// Insert; fails with `AlreadyExists` if the key is occupied.
    Create(Item),
    /// Replace; fails with `NotFound` if the key is absent.
    Update(Item),
    /// Replace while `attribute` of the stored item still equals
    /// `expected`; fails with `Conflict` otherwise and `NotFound` if the key
    /// is absent.
    UpdateIf {
        item: Item,
        attribute: &'static str,
        expected: serde_json::Value,
    },
    /// Unconditional upsert.
    Put(Item),
    /// Remove; fails with `NotFound` if the key is absent.
    Delete(ItemKey),
    /// Assert the key exists without writing it.
    ConditionCheck(ItemKey),
}

impl WriteOp {
    pub fn key(&self) -> &ItemKey {
        match self {
            Self::Create(item) | Self::Update(item) | Self::Put(item) => &item.key,
            Self::UpdateIf { item, .. } => &item.key,
            Self::Delete(key) | Self::ConditionCheck(key) => key,
        }
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, CoreError>;

    async fn create(&self, item: Item) -> Result<(), CoreError>;

    async fn update(&self, item: Item) -> Result<(), CoreError>;

    async fn put(&self, item: Item) -> Result<(), CoreError>;

    /// Single-item [`WriteOp::UpdateIf`].
    async fn update_if(
        &self,
        item: Item,
        attribute: &'static str,
        expected: serde_json::Value,
    ) -> Result<(), CoreError> {
        self.transact_write(vec![WriteOp::UpdateIf {
            item,
            attribute,
            expected,
        }])
        .await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), CoreError>;

    async fn query(&self, query: &Query) -> Result<QueryPage, CoreError>;

    /// Apply every operation or none of them.
    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), CoreError>;
}

/// Read every item matching `query`, following pages to the end.
pub async fn query_all(store: &dyn ItemStore, query: Query) -> Result<Vec<Item>, CoreError> {
    let mut query = query.limit(soundshelf_core::cursor::MAX_PAGE_LIMIT);
    let mut items = Vec::new();
    loop {
        let page = store.query(&query).await?;
        items.extend(page.items);
        match page.last_key {
            Some(start) => query.start = Some(start),
            None => return Ok(items),
        }
    }
}

/// Attach an entity label and id to a guard failure raised by the store.
pub fn relabel(err: CoreError, entity: &'static str, id: &str) -> CoreError {
    match err {
        CoreError::NotFound { .. } => CoreError::not_found(entity, id),
        CoreError::AlreadyExists { .. } => CoreError::already_exists(entity, id),
        other => other,
    }
}

pub(crate) fn guard_not_found(key: &ItemKey) -> CoreError {
    CoreError::not_found("item", key)
}

pub(crate) fn guard_stale(key: &ItemKey, attribute: &str) -> CoreError {
    CoreError::Conflict(format!("{attribute} of {key} changed since it was read"))
}

pub(crate) fn guard_exists(key: &ItemKey) -> CoreError {
    CoreError::already_exists("item", key)
}
