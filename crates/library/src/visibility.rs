//! Visibility changes and public discovery listings.
//!
//! A visibility change is one guarded update of the entity item: the new
//! visibility and the matching discovery projection (present only for
//! `Public`) land together, so no reader sees one without the other. The
//! track's search document is refreshed afterwards, best effort.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_cloud::search::SearchIndex;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::visibility::Visibility;
use soundshelf_db::models::playlist::Playlist;
use soundshelf_db::models::track::Track;
use soundshelf_db::repositories::{PlaylistRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::track::index_track;

#[derive(Clone)]
pub struct VisibilityService {
    store: Arc<dyn ItemStore>,
    search: Arc<dyn SearchIndex>,
    pager: Pager,
}

impl VisibilityService {
    pub fn new(store: Arc<dyn ItemStore>, search: Arc<dyn SearchIndex>, pager: Pager) -> Self {
        Self {
            store,
            search,
            pager,
        }
    }

    pub async fn set_track_visibility(
        &self,
        owner_id: &str,
        track_id: &str,
        visibility: Visibility,
    ) -> Result<Track, CoreError> {
        let mut track = TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;
        if track.visibility == visibility {
            return Ok(track);
        }
        let previous = track.visibility;
        track.visibility = visibility;
        track.updated_at = Utc::now();
        TrackRepo::update(self.store.as_ref(), &track).await?;
        index_track(self.store.as_ref(), self.search.as_ref(), &track).await;

        tracing::info!(
            track_id = %track.id,
            from = previous.name(),
            to = visibility.name(),
            "Track visibility changed"
        );
        Ok(track)
    }

    pub async fn set_playlist_visibility(
        &self,
        owner_id: &str,
        playlist_id: &str,
        visibility: Visibility,
    ) -> Result<Playlist, CoreError> {
        let mut playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        if playlist.visibility == visibility {
            return Ok(playlist);
        }
        let previous = playlist.visibility;
        playlist.visibility = visibility;
        playlist.updated_at = Utc::now();
        PlaylistRepo::update(self.store.as_ref(), &mut playlist).await?;

        tracing::info!(
            playlist_id = %playlist.id,
            from = previous.name(),
            to = visibility.name(),
            "Playlist visibility changed"
        );
        Ok(playlist)
    }

    /// Public tracks, newest first.
    pub async fn list_public_tracks(&self, request: &PageRequest) -> Result<Page<Track>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = TrackRepo::list_public(self.store.as_ref(), limit, start).await?;
        self.pager.finish(page)
    }

    /// Public playlists, newest first.
    pub async fn list_public_playlists(
        &self,
        request: &PageRequest,
    ) -> Result<Page<Playlist>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = PlaylistRepo::list_public(self.store.as_ref(), limit, start).await?;
        self.pager.finish(page)
    }
}
