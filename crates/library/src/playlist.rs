//! Playlists and their ordered membership.
//!
//! Every membership change reads the current positions, applies one of the
//! `ordering` algorithms, recomputes the playlist stats from the resulting
//! sequence and writes the changed suffix plus the playlist item in one
//! transaction. A change that races another change to the same playlist
//! fails with `Conflict` and can be retried against the new membership.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;
use soundshelf_core::ordering;
use soundshelf_core::types::new_id;
use soundshelf_db::models::playlist::{
    CreatePlaylist, Playlist, PlaylistTrack, PlaylistWithTracks, UpdatePlaylist,
};
use soundshelf_db::repositories::{PlaylistRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

/// A track that `add_tracks` did not add, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedTrack {
    pub track_id: String,
    pub reason: String,
}

/// Per-track result of [`PlaylistService::add_tracks`].
#[derive(Debug, Clone, Serialize)]
pub struct AddTracksOutcome {
    pub playlist: Playlist,
    pub added: Vec<String>,
    pub skipped: Vec<SkippedTrack>,
}

#[derive(Clone)]
pub struct PlaylistService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl PlaylistService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn create_playlist(
        &self,
        owner_id: &str,
        input: CreatePlaylist,
    ) -> Result<Playlist, CoreError> {
        validate_input(&input)?;
        keys::validate_segment("owner id", owner_id)?;
        let now = Utc::now();
        let playlist = Playlist {
            id: new_id(),
            owner_id: owner_id.to_string(),
            name: input.name,
            description: input.description,
            visibility: input.visibility,
            cover_art_key: input.cover_art_key,
            track_count: 0,
            total_duration_secs: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        PlaylistRepo::create(self.store.as_ref(), &playlist).await?;
        tracing::info!(playlist_id = %playlist.id, owner_id, "Playlist created");
        Ok(playlist)
    }

    /// Playlist with its entries in position order and the tracks they
    /// reference. Entries whose track no longer exists are kept in
    /// `entries` but have no counterpart in `tracks`.
    pub async fn get_playlist(
        &self,
        owner_id: &str,
        playlist_id: &str,
    ) -> Result<PlaylistWithTracks, CoreError> {
        let playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        let entries = PlaylistRepo::members(self.store.as_ref(), playlist_id).await?;
        let lookups = entries
            .iter()
            .map(|entry| TrackRepo::find(self.store.as_ref(), owner_id, &entry.track_id));
        let tracks = futures::future::try_join_all(lookups)
            .await?
            .into_iter()
            .flatten()
            .collect();
        Ok(PlaylistWithTracks {
            playlist,
            entries,
            tracks,
        })
    }

    pub async fn update_playlist(
        &self,
        owner_id: &str,
        playlist_id: &str,
        input: UpdatePlaylist,
    ) -> Result<Playlist, CoreError> {
        validate_input(&input)?;
        let mut playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        if let Some(name) = input.name {
            playlist.name = name;
        }
        if let Some(description) = input.description {
            playlist.description = Some(description);
        }
        if let Some(cover) = input.cover_art_key {
            playlist.cover_art_key = Some(cover);
        }
        playlist.updated_at = Utc::now();
        PlaylistRepo::update(self.store.as_ref(), &mut playlist).await?;
        Ok(playlist)
    }

    pub async fn delete_playlist(&self, owner_id: &str, playlist_id: &str) -> Result<(), CoreError> {
        let removed =
            PlaylistRepo::delete_with_members(self.store.as_ref(), owner_id, playlist_id).await?;
        tracing::info!(playlist_id, removed, "Playlist deleted");
        Ok(())
    }

    pub async fn list_playlists(
        &self,
        owner_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Playlist>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = PlaylistRepo::list_by_owner(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }

    /// Append tracks in the given order.
    ///
    /// Unknown tracks, tracks already in the playlist and repeats within
    /// `track_ids` are skipped. The added ones are written in one
    /// transaction.
    pub async fn add_tracks(
        &self,
        owner_id: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<AddTracksOutcome, CoreError> {
        let mut playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        let before = PlaylistRepo::members(self.store.as_ref(), playlist_id).await?;

        let mut present: HashSet<&str> = before.iter().map(|m| m.track_id.as_str()).collect();
        let mut added = Vec::new();
        let mut skipped = Vec::new();
        let mut entries = Vec::new();
        let now = Utc::now();

        for track_id in track_ids {
            let skip = |reason: &str| SkippedTrack {
                track_id: track_id.clone(),
                reason: reason.to_string(),
            };
            if present.contains(track_id.as_str()) {
                skipped.push(skip("already in playlist"));
                continue;
            }
            if keys::validate_segment("track id", track_id).is_err() {
                skipped.push(skip("invalid track id"));
                continue;
            }
            let Some(track) = TrackRepo::find(self.store.as_ref(), owner_id, track_id).await? else {
                skipped.push(skip("track not found"));
                continue;
            };
            present.insert(track_id.as_str());
            added.push(track.id.clone());
            entries.push(PlaylistTrack {
                playlist_id: playlist.id.clone(),
                track_id: track.id,
                position: 0,
                duration_secs: track.duration_secs,
                added_at: now,
            });
        }

        if !entries.is_empty() {
            let mut after = before.clone();
            ordering::append(&mut after, entries);
            self.commit(&mut playlist, &before, after).await?;
        }

        tracing::info!(
            playlist_id,
            added = added.len(),
            skipped = skipped.len(),
            "Tracks added to playlist"
        );
        Ok(AddTracksOutcome {
            playlist,
            added,
            skipped,
        })
    }

    /// Remove every occurrence of the given tracks, closing the gaps.
    /// Returns the updated playlist; ids that are not members are ignored.
    pub async fn remove_tracks(
        &self,
        owner_id: &str,
        playlist_id: &str,
        track_ids: &[String],
    ) -> Result<Playlist, CoreError> {
        let mut playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        let before = PlaylistRepo::members(self.store.as_ref(), playlist_id).await?;

        let mut after = before.clone();
        let removed = ordering::remove_where(&mut after, |m| track_ids.contains(&m.track_id));
        if removed > 0 {
            self.commit(&mut playlist, &before, after).await?;
        }
        tracing::info!(playlist_id, removed, "Tracks removed from playlist");
        Ok(playlist)
    }

    /// Move a member to `new_position` (clamped to the last slot) and
    /// return the resulting order.
    pub async fn reorder_track(
        &self,
        owner_id: &str,
        playlist_id: &str,
        track_id: &str,
        new_position: usize,
    ) -> Result<Vec<PlaylistTrack>, CoreError> {
        let mut playlist = PlaylistRepo::get(self.store.as_ref(), owner_id, playlist_id).await?;
        let before = PlaylistRepo::members(self.store.as_ref(), playlist_id).await?;

        let mut after = before.clone();
        let position = ordering::reorder(&mut after, |m| m.track_id == track_id, new_position)
            .ok_or_else(|| CoreError::not_found("playlist track", track_id))?;
        renumber(&mut after);
        if after != before {
            self.commit(&mut playlist, &before, after.clone()).await?;
        }
        tracing::info!(playlist_id, track_id, position, "Playlist track moved");
        Ok(after)
    }

    async fn commit(
        &self,
        playlist: &mut Playlist,
        before: &[PlaylistTrack],
        mut after: Vec<PlaylistTrack>,
    ) -> Result<(), CoreError> {
        renumber(&mut after);
        apply_stats(playlist, &after);
        playlist.updated_at = Utc::now();
        PlaylistRepo::write_membership(self.store.as_ref(), playlist, before, &after).await
    }
}

fn renumber(entries: &mut [PlaylistTrack]) {
    for (position, entry) in entries.iter_mut().enumerate() {
        entry.position = position;
    }
}

/// Stats follow the membership itself, never a running counter.
fn apply_stats(playlist: &mut Playlist, entries: &[PlaylistTrack]) {
    playlist.track_count = entries.len() as u32;
    playlist.total_duration_secs = entries.iter().map(|e| u64::from(e.duration_secs)).sum();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(track_id: &str, duration_secs: u32) -> PlaylistTrack {
        PlaylistTrack {
            playlist_id: "p".into(),
            track_id: track_id.into(),
            position: 99,
            duration_secs,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn stats_are_recomputed_from_entries() {
        let now = Utc::now();
        let mut playlist = Playlist {
            id: "p".into(),
            owner_id: "u".into(),
            name: "Mix".into(),
            description: None,
            visibility: Default::default(),
            cover_art_key: None,
            track_count: 7,
            total_duration_secs: 1,
            version: 0,
            created_at: now,
            updated_at: now,
        };
        apply_stats(&mut playlist, &[entry("a", 180), entry("b", 200)]);
        assert_eq!(playlist.track_count, 2);
        assert_eq!(playlist.total_duration_secs, 380);
    }

    #[test]
    fn renumber_makes_positions_dense() {
        let mut entries = vec![entry("a", 1), entry("b", 1), entry("c", 1)];
        renumber(&mut entries);
        let positions: Vec<_> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }
}
