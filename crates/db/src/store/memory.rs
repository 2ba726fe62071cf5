//! In-process [`ItemStore`] used by tests and local tooling.
//!
//! Items live in a `BTreeMap` behind a single async lock; every operation
//! (including whole transactions) holds the lock for its duration, which
//! gives the same guard semantics as the Postgres store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::ItemKey;
use tokio::sync::RwLock;

use super::{guard_exists, guard_not_found, guard_stale, ItemStore, Query, QueryPage, SortOrder, WriteOp};
use crate::item::Item;

#[derive(Debug, Default)]
pub struct MemoryItemStore {
    items: RwLock<BTreeMap<ItemKey, Item>>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored item, in primary-key order.
    pub async fn snapshot(&self) -> Vec<Item> {
        self.items.read().await.values().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

fn apply(map: &mut BTreeMap<ItemKey, Item>, op: WriteOp) -> Result<(), CoreError> {
    match op {
        WriteOp::Create(item) => {
            if map.contains_key(&item.key) {
                return Err(guard_exists(&item.key));
            }
            map.insert(item.key.clone(), item);
        }
        WriteOp::Update(item) => {
            if !map.contains_key(&item.key) {
                return Err(guard_not_found(&item.key));
            }
            map.insert(item.key.clone(), item);
        }
        WriteOp::UpdateIf {
            item,
            attribute,
            expected,
        } => {
            let current = map
                .get(&item.key)
                .ok_or_else(|| guard_not_found(&item.key))?;
            if current.attributes.get(attribute) != Some(&expected) {
                return Err(guard_stale(&item.key, attribute));
            }
            map.insert(item.key.clone(), item);
        }
        WriteOp::Put(item) => {
            map.insert(item.key.clone(), item);
        }
        WriteOp::Delete(key) => {
            if map.remove(&key).is_none() {
                return Err(guard_not_found(&key));
            }
        }
        WriteOp::ConditionCheck(key) => {
            if !map.contains_key(&key) {
                return Err(guard_not_found(&key));
            }
        }
    }
    Ok(())
}

/// Ordering tuple of an item within a query: (sort key, pk, sk).
fn order_key<'a>(query: &Query, item: &'a Item) -> Option<(&'a str, &'a str, &'a str)> {
    match query.index {
        Some(index) => {
            let ix = item.index_key(index)?;
            (ix.pk == query.partition).then_some((ix.sk.as_str(), item.key.pk.as_str(), item.key.sk.as_str()))
        }
        None => (item.key.pk == query.partition)
            .then_some((item.key.sk.as_str(), item.key.pk.as_str(), item.key.sk.as_str())),
    }
}

#[async_trait]
impl ItemStore for MemoryItemStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, CoreError> {
        Ok(self.items.read().await.get(key).cloned())
    }

    async fn create(&self, item: Item) -> Result<(), CoreError> {
        apply(&mut *self.items.write().await, WriteOp::Create(item))
    }

    async fn update(&self, item: Item) -> Result<(), CoreError> {
        apply(&mut *self.items.write().await, WriteOp::Update(item))
    }

    async fn put(&self, item: Item) -> Result<(), CoreError> {
        apply(&mut *self.items.write().await, WriteOp::Put(item))
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), CoreError> {
        apply(&mut *self.items.write().await, WriteOp::Delete(key.clone()))
    }

    async fn query(&self, query: &Query) -> Result<QueryPage, CoreError> {
        query.validate_start()?;
        let map = self.items.read().await;

        let start = query.start.as_ref().map(|s| {
            let sort = s.index.as_ref().map_or(s.primary.sk.as_str(), |ix| ix.sk.as_str());
            (sort, s.primary.pk.as_str(), s.primary.sk.as_str())
        });

        let mut matched: Vec<((&str, &str, &str), &Item)> = map
            .values()
            .filter_map(|item| order_key(query, item).map(|k| (k, item)))
            .filter(|(k, _)| {
                query
                    .sk_prefix
                    .as_deref()
                    .is_none_or(|prefix| k.0.starts_with(prefix))
            })
            .filter(|(k, _)| match (start, query.order) {
                (None, _) => true,
                (Some(s), SortOrder::Ascending) => *k > s,
                (Some(s), SortOrder::Descending) => *k < s,
            })
            .collect();

        matched.sort_by(|a, b| a.0.cmp(&b.0));
        if query.order == SortOrder::Descending {
            matched.reverse();
        }

        let limit = query.limit.max(1);
        let has_more = matched.len() > limit;
        let items: Vec<Item> = matched
            .into_iter()
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect();
        let last_key = if has_more {
            items.last().map(|item| query.start_key_for(item))
        } else {
            None
        };

        Ok(QueryPage { items, last_key })
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), CoreError> {
        let mut map = self.items.write().await;
        let mut scratch = map.clone();
        for op in ops {
            apply(&mut scratch, op)?;
        }
        *map = scratch;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::query_all;
    use assert_matches::assert_matches;
    use serde_json::json;
    use soundshelf_core::keys::{EntityType, IndexName};

    fn item(pk: &str, sk: &str) -> Item {
        Item::new(ItemKey::new(pk, sk), EntityType::Track, &json!({ "sk": sk })).unwrap()
    }

    #[tokio::test]
    async fn create_twice_conflicts() {
        let store = MemoryItemStore::new();
        store.create(item("P", "A")).await.unwrap();
        assert_matches!(
            store.create(item("P", "A")).await,
            Err(CoreError::AlreadyExists { .. })
        );
    }

    #[tokio::test]
    async fn update_and_delete_require_existing() {
        let store = MemoryItemStore::new();
        assert_matches!(store.update(item("P", "A")).await, Err(CoreError::NotFound { .. }));
        assert_matches!(
            store.delete(&ItemKey::new("P", "A")).await,
            Err(CoreError::NotFound { .. })
        );
    }

    #[tokio::test]
    async fn transaction_is_all_or_nothing() {
        let store = MemoryItemStore::new();
        store.create(item("P", "A")).await.unwrap();
        let result = store
            .transact_write(vec![
                WriteOp::Put(item("P", "B")),
                WriteOp::Create(item("P", "A")),
            ])
            .await;
        assert_matches!(result, Err(CoreError::AlreadyExists { .. }));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_if_requires_the_value_read() {
        let store = MemoryItemStore::new();
        let v0 = |sk: &str, version: u64| {
            Item::new(ItemKey::new("P", sk), EntityType::Playlist, &json!({ "version": version })).unwrap()
        };
        store.create(v0("A", 0)).await.unwrap();

        store.update_if(v0("A", 1), "version", json!(0)).await.unwrap();
        assert_matches!(
            store.update_if(v0("A", 1), "version", json!(0)).await,
            Err(CoreError::Conflict(_))
        );
        assert_matches!(
            store.update_if(v0("B", 1), "version", json!(0)).await,
            Err(CoreError::NotFound { .. })
        );
        let stored = store.get(&ItemKey::new("P", "A")).await.unwrap().unwrap();
        assert_eq!(stored.attributes["version"], json!(1));
    }

    #[tokio::test]
    async fn query_pages_without_overlap() {
        let store = MemoryItemStore::new();
        for i in 0..5 {
            store.create(item("P", &format!("K{i}"))).await.unwrap();
        }
        store.create(item("Q", "K0")).await.unwrap();

        let first = store.query(&Query::partition("P").limit(2)).await.unwrap();
        assert_eq!(first.items.len(), 2);
        let second = store
            .query(&Query::partition("P").limit(2).start_after(first.last_key))
            .await
            .unwrap();
        assert_eq!(second.items[0].key.sk, "K2");
        let third = store
            .query(&Query::partition("P").limit(2).start_after(second.last_key))
            .await
            .unwrap();
        assert_eq!(third.items.len(), 1);
        assert!(third.last_key.is_none());
    }

    #[tokio::test]
    async fn exact_fit_page_reports_no_more() {
        let store = MemoryItemStore::new();
        for i in 0..2 {
            store.create(item("P", &format!("K{i}"))).await.unwrap();
        }
        let page = store.query(&Query::partition("P").limit(2)).await.unwrap();
        assert!(page.last_key.is_none());
    }

    #[tokio::test]
    async fn index_query_orders_by_index_sort_key() {
        let store = MemoryItemStore::new();
        for (sk, ix) in [("A", "3"), ("B", "1"), ("C", "2")] {
            let it = item("P", sk).with_index(IndexName::Index2, Some(ItemKey::new("IX", ix)));
            store.create(it).await.unwrap();
        }
        store.create(item("P", "D")).await.unwrap();

        let all = query_all(&store, Query::index(IndexName::Index2, "IX")).await.unwrap();
        let order: Vec<_> = all.iter().map(|i| i.key.sk.as_str()).collect();
        assert_eq!(order, ["B", "C", "A"]);

        let desc = store
            .query(&Query::index(IndexName::Index2, "IX").descending())
            .await
            .unwrap();
        assert_eq!(desc.items[0].key.sk, "A");
    }

    #[tokio::test]
    async fn prefix_filters_sort_key() {
        let store = MemoryItemStore::new();
        store.create(item("P", "TRACK#1")).await.unwrap();
        store.create(item("P", "ALBUM#1")).await.unwrap();
        let page = store
            .query(&Query::partition("P").prefix("TRACK#"))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
    }

    #[tokio::test]
    async fn cursor_from_other_partition_is_rejected() {
        let store = MemoryItemStore::new();
        for i in 0..3 {
            store.create(item("P", &format!("K{i}"))).await.unwrap();
        }
        let page = store.query(&Query::partition("P").limit(1)).await.unwrap();
        assert_matches!(
            store
                .query(&Query::partition("Q").start_after(page.last_key))
                .await,
            Err(CoreError::InvalidCursor(_))
        );
    }
}
