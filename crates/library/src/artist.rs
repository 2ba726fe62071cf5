//! Artists, listed by sort name.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::naming::generate_sort_name;
use soundshelf_core::types::new_id;
use soundshelf_db::models::artist::{Artist, CreateArtist, UpdateArtist};
use soundshelf_db::repositories::ArtistRepo;
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

#[derive(Clone)]
pub struct ArtistService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl ArtistService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn create_artist(&self, owner_id: &str, input: CreateArtist) -> Result<Artist, CoreError> {
        validate_input(&input)?;
        let now = Utc::now();
        let artist = Artist {
            id: new_id(),
            owner_id: owner_id.to_string(),
            sort_name: generate_sort_name(&input.name),
            name: input.name,
            bio: input.bio,
            image_key: input.image_key,
            genres: input.genres,
            created_at: now,
            updated_at: now,
        };
        ArtistRepo::create(self.store.as_ref(), &artist).await?;
        tracing::info!(artist_id = %artist.id, sort_name = %artist.sort_name, "Artist created");
        Ok(artist)
    }

    pub async fn get_artist(&self, owner_id: &str, artist_id: &str) -> Result<Artist, CoreError> {
        ArtistRepo::find(self.store.as_ref(), owner_id, artist_id)
            .await?
            .ok_or_else(|| CoreError::not_found("artist", artist_id))
    }

    /// Renaming recomputes the sort name, which moves the artist within the
    /// sorted listing.
    pub async fn update_artist(
        &self,
        owner_id: &str,
        artist_id: &str,
        input: UpdateArtist,
    ) -> Result<Artist, CoreError> {
        validate_input(&input)?;
        let mut artist = self.get_artist(owner_id, artist_id).await?;
        if let Some(name) = input.name {
            artist.sort_name = generate_sort_name(&name);
            artist.name = name;
        }
        if input.bio.is_some() {
            artist.bio = input.bio;
        }
        if input.image_key.is_some() {
            artist.image_key = input.image_key;
        }
        if let Some(genres) = input.genres {
            artist.genres = genres;
        }
        artist.updated_at = Utc::now();
        ArtistRepo::update(self.store.as_ref(), &artist).await?;
        Ok(artist)
    }

    pub async fn delete_artist(&self, owner_id: &str, artist_id: &str) -> Result<(), CoreError> {
        ArtistRepo::delete(self.store.as_ref(), owner_id, artist_id).await
    }

    pub async fn list_artists(&self, owner_id: &str, request: &PageRequest) -> Result<Page<Artist>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = ArtistRepo::list_sorted(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }
}
