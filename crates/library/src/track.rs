//! Track catalogue, play tracking and playback URLs.
//!
//! The search index mirrors tracks on a best-effort basis: index failures
//! are logged and never fail the store operation that triggered them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use soundshelf_cloud::cdn::CdnSigner;
use soundshelf_cloud::search::{BulkIndexOutcome, SearchDocument, SearchIndex};
use soundshelf_cloud::storage::ObjectStorage;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;
use soundshelf_core::types::new_id;
use soundshelf_db::models::track::{CreateTrack, Track, UpdateTrack};
use soundshelf_db::repositories::{RightsRepo, TagRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::{external, validate_input};

/// A time-limited URL for streaming a track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackUrl {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TrackService {
    store: Arc<dyn ItemStore>,
    storage: Arc<dyn ObjectStorage>,
    cdn: Option<Arc<dyn CdnSigner>>,
    search: Arc<dyn SearchIndex>,
    pager: Pager,
    url_ttl: Duration,
}

impl TrackService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        storage: Arc<dyn ObjectStorage>,
        cdn: Option<Arc<dyn CdnSigner>>,
        search: Arc<dyn SearchIndex>,
        pager: Pager,
        url_ttl: Duration,
    ) -> Self {
        Self {
            store,
            storage,
            cdn,
            search,
            pager,
            url_ttl,
        }
    }

    pub async fn create_track(&self, owner_id: &str, input: CreateTrack) -> Result<Track, CoreError> {
        validate_input(&input)?;
        keys::validate_segment("owner id", owner_id)?;
        keys::validate_segment("artist", &input.artist)?;
        let now = Utc::now();
        let track = Track {
            id: new_id(),
            owner_id: owner_id.to_string(),
            title: input.title,
            artist: input.artist,
            album: input.album,
            album_id: input.album_id,
            genre: input.genre,
            year: input.year,
            track_number: input.track_number,
            duration_secs: input.duration_secs,
            file_key: input.file_key,
            cover_art_key: input.cover_art_key,
            file_size: input.file_size,
            format: input.format,
            visibility: input.visibility,
            play_count: 0,
            last_played_at: None,
            created_at: now,
            updated_at: now,
        };
        TrackRepo::create(self.store.as_ref(), &track).await?;
        tracing::info!(track_id = %track.id, owner_id, "Track created");

        self.reindex(&track, Vec::new()).await;
        Ok(track)
    }

    pub async fn get_track(&self, owner_id: &str, track_id: &str) -> Result<Track, CoreError> {
        TrackRepo::get(self.store.as_ref(), owner_id, track_id).await
    }

    pub async fn update_track(
        &self,
        owner_id: &str,
        track_id: &str,
        input: UpdateTrack,
    ) -> Result<Track, CoreError> {
        validate_input(&input)?;
        let mut track = TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;
        if let Some(title) = input.title {
            track.title = title;
        }
        if let Some(artist) = input.artist {
            keys::validate_segment("artist", &artist)?;
            track.artist = artist;
        }
        if input.album.is_some() {
            track.album = input.album;
        }
        if input.album_id.is_some() {
            track.album_id = input.album_id;
        }
        if input.genre.is_some() {
            track.genre = input.genre;
        }
        if input.year.is_some() {
            track.year = input.year;
        }
        if input.track_number.is_some() {
            track.track_number = input.track_number;
        }
        if input.cover_art_key.is_some() {
            track.cover_art_key = input.cover_art_key;
        }
        track.updated_at = Utc::now();
        TrackRepo::update(self.store.as_ref(), &track).await?;

        index_track(self.store.as_ref(), self.search.as_ref(), &track).await;
        Ok(track)
    }

    /// Delete a track with its tag joins and rights entries in one
    /// transaction, then drop its search document.
    pub async fn delete_track(&self, owner_id: &str, track_id: &str) -> Result<(), CoreError> {
        let track = TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;

        let mut dependents = TagRepo::join_keys_for_track(self.store.as_ref(), owner_id, track_id).await?;
        dependents.extend(RightsRepo::keys_for_track(self.store.as_ref(), owner_id, track_id).await?);
        let cascaded = dependents.len();
        TrackRepo::delete_with_dependents(self.store.as_ref(), owner_id, track_id, dependents).await?;
        tracing::info!(track_id, cascaded, "Track deleted");

        if let Err(e) = self.search.delete(track_id).await {
            tracing::warn!(track_id, error = %e, "Failed to remove track from search index");
        }
        let objects = std::iter::once(&track.file_key)
            .chain(track.cover_art_key.as_ref())
            .filter(|key| !key.is_empty());
        for key in objects {
            if let Err(e) = self.storage.delete_object(key).await {
                tracing::warn!(track_id, key = %key, error = %e, "Failed to delete track object");
            }
        }
        Ok(())
    }

    pub async fn list_tracks(
        &self,
        owner_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = TrackRepo::list_by_owner(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }

    pub async fn list_tracks_by_artist(
        &self,
        owner_id: &str,
        artist: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>, CoreError> {
        keys::validate_segment("artist", artist)?;
        let (limit, start) = self.pager.start(request)?;
        let page =
            TrackRepo::list_by_artist(self.store.as_ref(), owner_id, artist, limit, start).await?;
        self.pager.finish(page)
    }

    pub async fn record_play(&self, owner_id: &str, track_id: &str) -> Result<Track, CoreError> {
        let mut track = TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;
        let now = Utc::now();
        track.play_count += 1;
        track.last_played_at = Some(now);
        track.updated_at = now;
        TrackRepo::update(self.store.as_ref(), &track).await?;
        tracing::debug!(track_id, play_count = track.play_count, "Play recorded");
        Ok(track)
    }

    /// Streaming URL for the track's file: CDN-signed when a signer is
    /// configured, otherwise a presigned storage download.
    pub async fn playback_url(&self, owner_id: &str, track_id: &str) -> Result<PlaybackUrl, CoreError> {
        let track = TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;
        let ttl = chrono::Duration::from_std(self.url_ttl)
            .map_err(|e| CoreError::Internal(format!("url ttl out of range: {e}")))?;
        let expires_at = Utc::now() + ttl;

        let url = match &self.cdn {
            Some(cdn) => cdn
                .sign_url(&track.file_key, self.url_ttl)
                .map_err(|e| external("cdn", e))?,
            None => self
                .storage
                .presign_download(&track.file_key, self.url_ttl)
                .await
                .map_err(|e| external("storage", e))?,
        };
        Ok(PlaybackUrl { url, expires_at })
    }

    /// Push every track of an owner to the search index.
    pub async fn reindex_owner(&self, owner_id: &str) -> Result<BulkIndexOutcome, CoreError> {
        let mut docs = Vec::new();
        let mut request = PageRequest::first(soundshelf_core::cursor::MAX_PAGE_LIMIT);
        loop {
            let page = self.list_tracks(owner_id, &request).await?;
            for track in &page.items {
                let tags = tag_names(self.store.as_ref(), track).await;
                docs.push(search_document(track, tags));
            }
            match page.next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => break,
            }
        }
        if docs.is_empty() {
            return Ok(BulkIndexOutcome::default());
        }

        let outcome = self
            .search
            .bulk_index(&docs)
            .await
            .map_err(|e| external("search", e))?;
        tracing::info!(
            owner_id,
            indexed = outcome.indexed,
            failed = outcome.failed.len(),
            "Owner tracks reindexed"
        );
        Ok(outcome)
    }

    async fn reindex(&self, track: &Track, tags: Vec<String>) {
        if let Err(e) = self.search.index(&search_document(track, tags)).await {
            tracing::warn!(track_id = %track.id, error = %e, "Failed to index track");
        }
    }
}

/// Best-effort refresh of a track's search document, tags included.
pub(crate) async fn index_track(store: &dyn ItemStore, search: &dyn SearchIndex, track: &Track) {
    let tags = tag_names(store, track).await;
    if let Err(e) = search.index(&search_document(track, tags)).await {
        tracing::warn!(track_id = %track.id, error = %e, "Failed to index track");
    }
}

async fn tag_names(store: &dyn ItemStore, track: &Track) -> Vec<String> {
    match TagRepo::tags_for_track(store, &track.owner_id, &track.id).await {
        Ok(joins) => joins.into_iter().map(|j| j.tag_name).collect(),
        Err(e) => {
            tracing::warn!(track_id = %track.id, error = %e, "Failed to read track tags for indexing");
            Vec::new()
        }
    }
}

fn search_document(track: &Track, tags: Vec<String>) -> SearchDocument {
    SearchDocument {
        id: track.id.clone(),
        owner_id: track.owner_id.clone(),
        kind: "track".into(),
        title: track.title.clone(),
        artist: Some(track.artist.clone()),
        album: track.album.clone(),
        genre: track.genre.clone(),
        tags,
        visibility: track.visibility.name().to_string(),
        created_at: track.created_at,
    }
}
