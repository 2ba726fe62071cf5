//! Stored item representation.
//!
//! An [`Item`] is one row of the single table: its primary key, its entity
//! discriminator, up to three index projections, and the entity's fields as
//! a JSON document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{EntityType, IndexName, ItemKey};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub key: ItemKey,
    pub item_type: String,
    pub index1: Option<ItemKey>,
    pub index2: Option<ItemKey>,
    pub index3: Option<ItemKey>,
    pub attributes: serde_json::Value,
}

impl Item {
    /// Build an item with no index projections.
    pub fn new<T: Serialize>(
        key: ItemKey,
        entity_type: EntityType,
        attributes: &T,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            key,
            item_type: entity_type.name().to_string(),
            index1: None,
            index2: None,
            index3: None,
            attributes: serde_json::to_value(attributes)?,
        })
    }

    /// Set (or clear, with `None`) one index projection.
    pub fn with_index(mut self, index: IndexName, key: Option<ItemKey>) -> Self {
        *self.index_slot(index) = key;
        self
    }

    fn index_slot(&mut self, index: IndexName) -> &mut Option<ItemKey> {
        match index {
            IndexName::Index1 => &mut self.index1,
            IndexName::Index2 => &mut self.index2,
            IndexName::Index3 => &mut self.index3,
        }
    }

    pub fn index_key(&self, index: IndexName) -> Option<&ItemKey> {
        match index {
            IndexName::Index1 => self.index1.as_ref(),
            IndexName::Index2 => self.index2.as_ref(),
            IndexName::Index3 => self.index3.as_ref(),
        }
    }

    pub fn entity_type(&self) -> Result<EntityType, CoreError> {
        EntityType::from_name(&self.item_type)
    }

    /// Deserialize the attribute document into an entity model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, CoreError> {
        serde_json::from_value(self.attributes.clone()).map_err(|e| {
            CoreError::Internal(format!(
                "Failed to decode {} item {}: {e}",
                self.item_type, self.key
            ))
        })
    }
}

/// Entities that know how to lay themselves out as a stored item.
pub trait Storable: Serialize + DeserializeOwned {
    const ENTITY_TYPE: EntityType;

    /// Primary key of this entity.
    fn key(&self) -> Result<ItemKey, CoreError>;

    /// Index projections this entity currently requires.
    fn indexes(&self) -> Vec<(IndexName, ItemKey)> {
        Vec::new()
    }

    /// Full item, with every projection set or cleared to match the entity.
    fn to_item(&self) -> Result<Item, CoreError> {
        let mut item = Item::new(self.key()?, Self::ENTITY_TYPE, self)?;
        for (index, key) in self.indexes() {
            item = item.with_index(index, Some(key));
        }
        Ok(item)
    }

    fn from_item(item: &Item) -> Result<Self, CoreError> {
        if item.item_type != Self::ENTITY_TYPE.name() {
            return Err(CoreError::Internal(format!(
                "Expected {} item at {}, found {}",
                Self::ENTITY_TYPE.name(),
                item.key,
                item.item_type
            )));
        }
        item.decode()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_index_sets_and_clears() {
        let key = ItemKey::new("OWNER#u", "TRACK#t");
        let item = Item::new(key, EntityType::Track, &json!({"title": "x"}))
            .unwrap()
            .with_index(IndexName::Index2, Some(ItemKey::new("PUBLIC_TRACK", "s")));
        assert!(item.index_key(IndexName::Index2).is_some());
        let cleared = item.with_index(IndexName::Index2, None);
        assert!(cleared.index_key(IndexName::Index2).is_none());
    }

    #[test]
    fn decode_reports_item_key_on_failure() {
        let key = ItemKey::new("OWNER#u", "TRACK#t");
        let item = Item::new(key, EntityType::Track, &json!({"title": 5})).unwrap();
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            title: String,
        }
        let err = item.decode::<Strict>().unwrap_err();
        assert!(err.to_string().contains("OWNER#u|TRACK#t"));
    }
}
