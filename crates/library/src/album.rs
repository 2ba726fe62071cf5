//! Albums.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;
use soundshelf_core::types::new_id;
use soundshelf_db::models::album::{Album, CreateAlbum, UpdateAlbum};
use soundshelf_db::repositories::AlbumRepo;
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

#[derive(Clone)]
pub struct AlbumService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl AlbumService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn create_album(&self, owner_id: &str, input: CreateAlbum) -> Result<Album, CoreError> {
        validate_input(&input)?;
        keys::validate_segment("artist", &input.artist)?;
        let now = Utc::now();
        let album = Album {
            id: new_id(),
            owner_id: owner_id.to_string(),
            title: input.title,
            artist: input.artist,
            year: input.year,
            genre: input.genre,
            cover_art_key: input.cover_art_key,
            created_at: now,
            updated_at: now,
        };
        AlbumRepo::create(self.store.as_ref(), &album).await?;
        tracing::info!(album_id = %album.id, owner_id, "Album created");
        Ok(album)
    }

    pub async fn get_album(&self, owner_id: &str, album_id: &str) -> Result<Album, CoreError> {
        AlbumRepo::find(self.store.as_ref(), owner_id, album_id)
            .await?
            .ok_or_else(|| CoreError::not_found("album", album_id))
    }

    pub async fn update_album(
        &self,
        owner_id: &str,
        album_id: &str,
        input: UpdateAlbum,
    ) -> Result<Album, CoreError> {
        validate_input(&input)?;
        let mut album = self.get_album(owner_id, album_id).await?;
        if let Some(title) = input.title {
            album.title = title;
        }
        if let Some(artist) = input.artist {
            keys::validate_segment("artist", &artist)?;
            album.artist = artist;
        }
        if input.year.is_some() {
            album.year = input.year;
        }
        if input.genre.is_some() {
            album.genre = input.genre;
        }
        if input.cover_art_key.is_some() {
            album.cover_art_key = input.cover_art_key;
        }
        album.updated_at = Utc::now();
        AlbumRepo::update(self.store.as_ref(), &album).await?;
        Ok(album)
    }

    pub async fn delete_album(&self, owner_id: &str, album_id: &str) -> Result<(), CoreError> {
        AlbumRepo::delete(self.store.as_ref(), owner_id, album_id).await?;
        tracing::info!(album_id, "Album deleted");
        Ok(())
    }

    pub async fn list_albums(&self, owner_id: &str, request: &PageRequest) -> Result<Page<Album>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = AlbumRepo::list_by_owner(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }

    /// Albums credited to `artist`, by release year.
    pub async fn list_albums_by_artist(
        &self,
        owner_id: &str,
        artist: &str,
        request: &PageRequest,
    ) -> Result<Page<Album>, CoreError> {
        keys::validate_segment("artist", artist)?;
        let (limit, start) = self.pager.start(request)?;
        let page = AlbumRepo::list_by_artist(self.store.as_ref(), owner_id, artist, limit, start).await?;
        self.pager.finish(page)
    }
}
