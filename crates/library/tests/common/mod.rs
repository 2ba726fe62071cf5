//! Shared harness: a [`Library`] wired to in-memory collaborators.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use soundshelf_cloud::identity::MemoryIdentityProvider;
use soundshelf_cloud::search::MemorySearchIndex;
use soundshelf_cloud::storage::MemoryObjectStorage;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::ItemKey;
use soundshelf_core::visibility::Visibility;
use soundshelf_db::item::Item;
use soundshelf_db::models::track::{CreateTrack, Track};
use soundshelf_db::models::user::{CreateUser, User};
use soundshelf_db::store::{ItemStore, MemoryItemStore, Query, QueryPage, WriteOp};
use soundshelf_library::{Library, LibraryConfig};

pub struct Harness {
    pub library: Library,
    pub store: Arc<FlakyStore>,
    pub identity: Arc<MemoryIdentityProvider>,
    pub storage: Arc<MemoryObjectStorage>,
    pub search: Arc<MemorySearchIndex>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: LibraryConfig) -> Self {
        let store = Arc::new(FlakyStore::default());
        let identity = Arc::new(MemoryIdentityProvider::new());
        let storage = Arc::new(MemoryObjectStorage::new("test-bucket"));
        let search = Arc::new(MemorySearchIndex::new());
        let library = Library::new(
            config,
            store.clone(),
            identity.clone(),
            storage.clone(),
            search.clone(),
        );
        Self {
            library,
            store,
            identity,
            storage,
            search,
        }
    }

    pub async fn user(&self, id: &str) -> User {
        self.library
            .users()
            .create_user(CreateUser {
                id: id.into(),
                email: format!("{id}@example.com"),
                display_name: id.to_uppercase(),
            })
            .await
            .unwrap()
    }

    pub async fn track(&self, owner_id: &str, title: &str, duration_secs: u32) -> Track {
        self.library
            .tracks()
            .create_track(owner_id, new_track(title, "Test Artist", duration_secs))
            .await
            .unwrap()
    }

    pub async fn items(&self) -> Vec<Item> {
        self.store.inner.snapshot().await
    }
}

pub fn test_config() -> LibraryConfig {
    LibraryConfig {
        cursor_secret: "test-cursor-secret".into(),
        identity_timeout: Duration::from_millis(200),
        ..LibraryConfig::default()
    }
}

pub fn new_track(title: &str, artist: &str, duration_secs: u32) -> CreateTrack {
    CreateTrack {
        title: title.into(),
        artist: artist.into(),
        album: None,
        album_id: None,
        genre: Some("Electronic".into()),
        year: Some(2024),
        track_number: None,
        duration_secs,
        file_key: format!("media/{title}.flac"),
        cover_art_key: None,
        file_size: 1024,
        format: Some("flac".into()),
        visibility: Visibility::Private,
    }
}

/// Memory store whose single-item updates can be made to fail, for
/// exercising compensation paths, and whose transactions can be held back
/// to force concurrent writers to overlap.
#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryItemStore,
    /// Updates still allowed before every later one fails; `None` never fails.
    updates_left: Mutex<Option<usize>>,
    transaction_delay: Mutex<Option<Duration>>,
}

impl FlakyStore {
    /// Let `n` more updates through, then fail the rest.
    pub fn fail_updates_after(&self, n: usize) {
        *self.updates_left.lock().unwrap() = Some(n);
    }

    pub fn allow_updates(&self) {
        *self.updates_left.lock().unwrap() = None;
    }

    /// Sleep before applying each transaction.
    pub fn delay_transactions(&self, delay: Duration) {
        *self.transaction_delay.lock().unwrap() = Some(delay);
    }

    fn take_update(&self) -> bool {
        let mut left = self.updates_left.lock().unwrap();
        match left.as_mut() {
            None => true,
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }
}

#[async_trait]
impl ItemStore for FlakyStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, CoreError> {
        self.inner.get(key).await
    }

    async fn create(&self, item: Item) -> Result<(), CoreError> {
        self.inner.create(item).await
    }

    async fn update(&self, item: Item) -> Result<(), CoreError> {
        if !self.take_update() {
            return Err(CoreError::Storage("injected update failure".into()));
        }
        self.inner.update(item).await
    }

    async fn put(&self, item: Item) -> Result<(), CoreError> {
        self.inner.put(item).await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), CoreError> {
        self.inner.delete(key).await
    }

    async fn query(&self, query: &Query) -> Result<QueryPage, CoreError> {
        self.inner.query(query).await
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), CoreError> {
        let delay = *self.transaction_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.transact_write(ops).await
    }
}
