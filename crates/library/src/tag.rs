//! Owner-scoped tags and their track joins.

use std::sync::Arc;

use chrono::Utc;
use soundshelf_core::cursor::{Page, PageRequest};
use soundshelf_core::error::CoreError;
use soundshelf_core::naming::{validate_hex_color, validate_tag_name};
use soundshelf_db::models::tag::{CreateTag, Tag, TagTrackOutcome, TrackTag};
use soundshelf_db::models::track::Track;
use soundshelf_db::repositories::{TagRepo, TrackRepo};
use soundshelf_db::store::ItemStore;

use crate::paging::Pager;
use crate::validate_input;

#[derive(Clone)]
pub struct TagService {
    store: Arc<dyn ItemStore>,
    pager: Pager,
}

impl TagService {
    pub fn new(store: Arc<dyn ItemStore>, pager: Pager) -> Self {
        Self { store, pager }
    }

    pub async fn create_tag(&self, owner_id: &str, input: CreateTag) -> Result<Tag, CoreError> {
        validate_input(&input)?;
        validate_tag_name(&input.name)?;
        if let Some(color) = &input.color {
            validate_hex_color(color)?;
        }
        let tag = Tag {
            owner_id: owner_id.to_string(),
            name: input.name,
            color: input.color,
            created_at: Utc::now(),
        };
        TagRepo::create(self.store.as_ref(), &tag).await?;
        tracing::info!(owner_id, tag = %tag.name, "Tag created");
        Ok(tag)
    }

    pub async fn get_tag(&self, owner_id: &str, name: &str) -> Result<Tag, CoreError> {
        TagRepo::find(self.store.as_ref(), owner_id, name)
            .await?
            .ok_or_else(|| CoreError::not_found("tag", name))
    }

    /// Delete a tag and every track join that uses it.
    pub async fn delete_tag(&self, owner_id: &str, name: &str) -> Result<usize, CoreError> {
        let untagged = TagRepo::delete_with_joins(self.store.as_ref(), owner_id, name).await?;
        tracing::info!(owner_id, tag = name, untagged, "Tag deleted");
        Ok(untagged)
    }

    pub async fn list_tags(&self, owner_id: &str, request: &PageRequest) -> Result<Page<Tag>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let page = TagRepo::list(self.store.as_ref(), owner_id, limit, start).await?;
        self.pager.finish(page)
    }

    /// Attach several tags to a track, creating missing tags on the way.
    ///
    /// Each name succeeds or is skipped on its own; only a missing track or
    /// a storage failure fails the whole call.
    pub async fn tag_track(
        &self,
        owner_id: &str,
        track_id: &str,
        names: &[String],
    ) -> Result<TagTrackOutcome, CoreError> {
        TrackRepo::get(self.store.as_ref(), owner_id, track_id).await?;

        let mut outcome = TagTrackOutcome::default();
        for name in names {
            if let Err(e) = validate_tag_name(name) {
                outcome.skipped.push((name.clone(), e.to_string()));
                continue;
            }
            let now = Utc::now();
            if TagRepo::find(self.store.as_ref(), owner_id, name).await?.is_none() {
                let tag = Tag {
                    owner_id: owner_id.to_string(),
                    name: name.clone(),
                    color: None,
                    created_at: now,
                };
                match TagRepo::create(self.store.as_ref(), &tag).await {
                    Ok(()) | Err(CoreError::AlreadyExists { .. }) => {}
                    Err(e) => return Err(e),
                }
            }

            let join = TrackTag {
                owner_id: owner_id.to_string(),
                track_id: track_id.to_string(),
                tag_name: name.clone(),
                created_at: now,
            };
            match TagRepo::add_to_track(self.store.as_ref(), &join).await {
                Ok(()) => outcome.tagged.push(name.clone()),
                Err(CoreError::AlreadyExists { .. }) => {
                    outcome.skipped.push((name.clone(), "already tagged".into()))
                }
                Err(e) => return Err(e),
            }
        }

        tracing::info!(
            track_id,
            tagged = outcome.tagged.len(),
            skipped = outcome.skipped.len(),
            "Track tagged"
        );
        Ok(outcome)
    }

    pub async fn untag_track(&self, owner_id: &str, track_id: &str, name: &str) -> Result<(), CoreError> {
        TagRepo::remove_from_track(self.store.as_ref(), owner_id, track_id, name).await
    }

    pub async fn tags_for_track(&self, owner_id: &str, track_id: &str) -> Result<Vec<String>, CoreError> {
        Ok(TagRepo::tags_for_track(self.store.as_ref(), owner_id, track_id)
            .await?
            .into_iter()
            .map(|j| j.tag_name)
            .collect())
    }

    /// Tracks carrying a tag, one page of joins at a time. Joins whose
    /// track has gone are dropped from the page.
    pub async fn tracks_by_tag(
        &self,
        owner_id: &str,
        name: &str,
        request: &PageRequest,
    ) -> Result<Page<Track>, CoreError> {
        let (limit, start) = self.pager.start(request)?;
        let joins = TagRepo::tracks_by_tag(self.store.as_ref(), owner_id, name, limit, start).await?;
        let page = self.pager.finish(joins)?;

        let mut tracks = Vec::with_capacity(page.items.len());
        for join in &page.items {
            if let Some(track) = TrackRepo::find(self.store.as_ref(), owner_id, &join.track_id).await? {
                tracks.push(track);
            }
        }
        Ok(Page {
            items: tracks,
            next_cursor: page.next_cursor,
            has_more: page.has_more,
        })
    }
}
