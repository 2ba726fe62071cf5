mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{new_track, Harness};
use soundshelf_cloud::cdn::CloudFrontSigner;
use soundshelf_core::cursor::PageRequest;
use soundshelf_core::error::CoreError;
use soundshelf_core::rights::{HolderType, RightType};
use soundshelf_db::models::album::CreateAlbum;
use soundshelf_db::models::artist::{CreateArtist, UpdateArtist};
use soundshelf_db::models::rights::{CreateRightsHolder, RightsShare};
use soundshelf_db::models::tag::CreateTag;
use soundshelf_db::models::track::UpdateTrack;
use soundshelf_db::models::user::CreateUser;
use soundshelf_db::repositories::TrackRepo;

// ---------------------------------------------------------------------------
// Duplicate creates
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_creates_conflict() {
    let h = Harness::new();
    h.user("u1").await;
    let dup_user = h
        .library
        .users()
        .create_user(CreateUser {
            id: "u1".into(),
            email: "other@example.com".into(),
            display_name: "Other".into(),
        })
        .await;
    assert_matches!(dup_user, Err(CoreError::AlreadyExists { .. }));

    let dup_email = h
        .library
        .users()
        .create_user(CreateUser {
            id: "u2".into(),
            email: "U1@Example.com".into(),
            display_name: "Other".into(),
        })
        .await;
    assert_matches!(dup_email, Err(CoreError::AlreadyExists { .. }));

    let track = h.track("u1", "Song", 100).await;
    assert_matches!(
        TrackRepo::create(h.store.as_ref(), &track).await,
        Err(CoreError::AlreadyExists { entity: "track", .. })
    );

    let tags = h.library.tags();
    let tag = CreateTag {
        name: "chill".into(),
        color: Some("#1A2B3C".into()),
    };
    tags.create_tag("u1", tag.clone()).await.unwrap();
    assert_matches!(tags.create_tag("u1", tag).await, Err(CoreError::AlreadyExists { .. }));
}

// ---------------------------------------------------------------------------
// Tracks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tracks_are_indexed_for_search() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 100).await;
    assert_eq!(h.search.document(&track.id).unwrap().title, "Song");

    h.library
        .tracks()
        .update_track(
            "u1",
            &track.id,
            UpdateTrack {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(h.search.document(&track.id).unwrap().title, "Renamed");
}

#[tokio::test]
async fn search_outage_does_not_fail_writes() {
    let h = Harness::new();
    h.search.set_failing(true);
    let track = h.track("u1", "Song", 100).await;
    h.library.tracks().delete_track("u1", &track.id).await.unwrap();
    assert!(h.search.is_empty());
}

#[tokio::test]
async fn delete_cascades_to_tags_and_rights() {
    let h = Harness::new();
    let mut input = new_track("Song", "Test Artist", 100);
    input.cover_art_key = Some("covers/song.jpg".into());
    let track = h.library.tracks().create_track("u1", input).await.unwrap();
    h.storage.put_object(&track.file_key);
    h.storage.put_object("covers/song.jpg");
    h.storage.put_object("media/other.flac");
    h.library
        .tags()
        .tag_track("u1", &track.id, &["chill".into(), "night".into()])
        .await
        .unwrap();
    let holder = h
        .library
        .rights()
        .create_holder(
            "u1",
            CreateRightsHolder {
                name: "Label".into(),
                holder_type: HolderType::Label,
                ipi: None,
                isni: None,
                email: None,
            },
        )
        .await
        .unwrap();
    h.library
        .rights()
        .set_track_rights(
            "u1",
            &track.id,
            RightType::Master,
            vec![RightsShare {
                holder_id: holder.id,
                share_percent: 100.0,
                territories: vec!["WW".into()],
                start_date: None,
                end_date: None,
            }],
        )
        .await
        .unwrap();

    h.library.tracks().delete_track("u1", &track.id).await.unwrap();

    let leftovers: Vec<_> = h
        .items()
        .await
        .into_iter()
        .filter(|i| i.key.pk.contains(&track.id) || i.key.sk.contains(&track.id))
        .collect();
    assert!(leftovers.is_empty(), "left behind: {leftovers:?}");
    assert!(h.search.document(&track.id).is_none());
    // Tags themselves survive; only the joins go.
    assert!(h.library.tags().get_tag("u1", "chill").await.is_ok());
    assert!(!h.storage.has_object(&track.file_key));
    assert!(!h.storage.has_object("covers/song.jpg"));
    assert!(h.storage.has_object("media/other.flac"));
}

#[tokio::test]
async fn delete_succeeds_when_objects_are_already_gone() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 100).await;
    h.library.tracks().delete_track("u1", &track.id).await.unwrap();
    assert_matches!(
        h.library.tracks().get_track("u1", &track.id).await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn record_play_counts_and_stamps() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 100).await;
    let tracks = h.library.tracks();
    tracks.record_play("u1", &track.id).await.unwrap();
    let played = tracks.record_play("u1", &track.id).await.unwrap();
    assert_eq!(played.play_count, 2);
    assert!(played.last_played_at.is_some());
}

#[tokio::test]
async fn playback_url_prefers_cdn() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 100).await;

    let presigned = h.library.tracks().playback_url("u1", &track.id).await.unwrap();
    assert!(presigned.url.starts_with("memory://test-bucket/"));

    let signer = CloudFrontSigner::new(
        "d123.cloudfront.net",
        "KP1",
        include_str!("../../cloud/tests/fixtures/cdn_test_key.pem"),
    )
    .unwrap();
    let library = h.library.clone().with_cdn(Arc::new(signer));
    let signed = library.tracks().playback_url("u1", &track.id).await.unwrap();
    assert!(signed
        .url
        .starts_with("https://d123.cloudfront.net/media/Song.flac?Expires="));
    assert!(signed.url.contains("&Signature="));
    assert!(signed.url.contains("Key-Pair-Id=KP1"));
}

#[tokio::test]
async fn tracks_list_by_artist() {
    let h = Harness::new();
    let tracks = h.library.tracks();
    tracks
        .create_track("u1", new_track("A", "Massive Attack", 1))
        .await
        .unwrap();
    tracks
        .create_track("u1", new_track("B", "Portishead", 1))
        .await
        .unwrap();
    tracks
        .create_track("u1", new_track("C", "Massive Attack", 1))
        .await
        .unwrap();

    let page = tracks
        .list_tracks_by_artist("u1", "Massive Attack", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.items.len(), 2);
    assert!(page.items.iter().all(|t| t.artist == "Massive Attack"));
}

#[tokio::test]
async fn reindex_pushes_every_track() {
    let h = Harness::new();
    h.search.set_failing(true);
    for i in 0..3 {
        h.track("u1", &format!("T{i}"), 1).await;
    }
    assert!(h.search.is_empty());
    h.search.set_failing(false);

    let outcome = h.library.tracks().reindex_owner("u1").await.unwrap();
    assert_eq!(outcome.indexed, 3);
    assert_eq!(h.search.len(), 3);
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[tokio::test]
async fn twenty_item_pages_do_not_overlap() {
    let h = Harness::new();
    for i in 0..45 {
        h.track("u1", &format!("T{i:02}"), 1).await;
    }
    let tracks = h.library.tracks();

    let mut seen = Vec::new();
    let mut request = PageRequest::first(20);
    let mut sizes = Vec::new();
    loop {
        let page = tracks.list_tracks("u1", &request).await.unwrap();
        sizes.push(page.items.len());
        seen.extend(page.items.into_iter().map(|t| t.id));
        match page.next_cursor {
            Some(cursor) => request = PageRequest::after(20, cursor),
            None => {
                assert!(!page.has_more);
                break;
            }
        }
    }
    assert_eq!(sizes, [20, 20, 5]);
    let total = seen.len();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), total);
}

#[tokio::test]
async fn tampered_or_foreign_cursors_are_rejected() {
    let h = Harness::new();
    for i in 0..3 {
        h.track("u1", &format!("T{i}"), 1).await;
        h.track("u2", &format!("T{i}"), 1).await;
    }
    let tracks = h.library.tracks();
    let page = tracks.list_tracks("u1", &PageRequest::first(1)).await.unwrap();
    let cursor = page.next_cursor.unwrap();

    let mut tampered = cursor.clone();
    tampered.insert(0, 'x');
    assert_matches!(
        tracks.list_tracks("u1", &PageRequest::after(1, tampered)).await,
        Err(CoreError::InvalidCursor(_))
    );
    assert_matches!(
        tracks.list_tracks("u2", &PageRequest::after(1, cursor)).await,
        Err(CoreError::InvalidCursor(_))
    );
}

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tagging_is_partial_per_tag() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 1).await;
    let tags = h.library.tags();

    let first = tags
        .tag_track("u1", &track.id, &["chill".into(), "bad#tag".into()])
        .await
        .unwrap();
    assert_eq!(first.tagged, ["chill"]);
    assert_eq!(first.skipped.len(), 1);

    let second = tags
        .tag_track("u1", &track.id, &["chill".into(), "night".into()])
        .await
        .unwrap();
    assert_eq!(second.tagged, ["night"]);
    assert_eq!(second.skipped, [("chill".to_string(), "already tagged".to_string())]);

    let mut names = tags.tags_for_track("u1", &track.id).await.unwrap();
    names.sort();
    assert_eq!(names, ["chill", "night"]);

    let tagged = tags
        .tracks_by_tag("u1", "night", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(tagged.items.len(), 1);
    assert_eq!(tagged.items[0].id, track.id);

    tags.untag_track("u1", &track.id, "night").await.unwrap();
    assert_eq!(tags.tags_for_track("u1", &track.id).await.unwrap(), ["chill"]);
    assert_matches!(
        tags.untag_track("u1", &track.id, "night").await,
        Err(CoreError::NotFound { .. })
    );
}

#[tokio::test]
async fn tagging_missing_track_is_not_found() {
    let h = Harness::new();
    assert_matches!(
        h.library.tags().tag_track("u1", "ghost", &["x".into()]).await,
        Err(CoreError::NotFound { entity: "track", .. })
    );
}

#[tokio::test]
async fn deleting_a_tag_removes_its_joins() {
    let h = Harness::new();
    let t1 = h.track("u1", "A", 1).await;
    let t2 = h.track("u1", "B", 1).await;
    let tags = h.library.tags();
    tags.tag_track("u1", &t1.id, &["chill".into()]).await.unwrap();
    tags.tag_track("u1", &t2.id, &["chill".into()]).await.unwrap();

    assert_eq!(tags.delete_tag("u1", "chill").await.unwrap(), 2);
    assert!(tags.tags_for_track("u1", &t1.id).await.unwrap().is_empty());
    let listed = tags.list_tags("u1", &PageRequest::default()).await.unwrap();
    assert!(listed.items.is_empty());
}

#[tokio::test]
async fn tag_color_must_be_hex() {
    let h = Harness::new();
    let result = h
        .library
        .tags()
        .create_tag(
            "u1",
            CreateTag {
                name: "mood".into(),
                color: Some("red".into()),
            },
        )
        .await;
    assert_matches!(result, Err(CoreError::Validation(_)));
}

// ---------------------------------------------------------------------------
// Albums, artists, users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn albums_list_by_artist_in_year_order() {
    let h = Harness::new();
    let albums = h.library.albums();
    for (title, year) in [("Mezzanine", 1998), ("Blue Lines", 1991), ("Protection", 1994)] {
        albums
            .create_album(
                "u1",
                CreateAlbum {
                    title: title.into(),
                    artist: "Massive Attack".into(),
                    year: Some(year),
                    genre: None,
                    cover_art_key: None,
                },
            )
            .await
            .unwrap();
    }
    let page = albums
        .list_albums_by_artist("u1", "Massive Attack", &PageRequest::default())
        .await
        .unwrap();
    let titles: Vec<_> = page.items.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, ["Blue Lines", "Protection", "Mezzanine"]);
}

#[tokio::test]
async fn artists_sort_without_leading_article() {
    let h = Harness::new();
    let artists = h.library.artists();
    let input = |name: &str| CreateArtist {
        name: name.into(),
        bio: None,
        image_key: None,
        genres: Vec::new(),
    };
    artists.create_artist("u1", input("The Xx")).await.unwrap();
    let beatles = artists.create_artist("u1", input("The Beatles")).await.unwrap();
    artists.create_artist("u1", input("Cocteau Twins")).await.unwrap();
    assert_eq!(beatles.sort_name, "Beatles");

    let page = artists.list_artists("u1", &PageRequest::default()).await.unwrap();
    let names: Vec<_> = page.items.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["The Beatles", "Cocteau Twins", "The Xx"]);

    let renamed = artists
        .update_artist(
            "u1",
            &beatles.id,
            UpdateArtist {
                name: Some("A Zebra".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.sort_name, "Zebra");
    let page = artists.list_artists("u1", &PageRequest::default()).await.unwrap();
    assert_eq!(page.items.last().unwrap().id, beatles.id);
}

#[tokio::test]
async fn users_resolve_by_email() {
    let h = Harness::new();
    let user = h.user("u1").await;
    let users = h.library.users();
    let found = users.find_by_email("U1@EXAMPLE.COM").await.unwrap().unwrap();
    assert_eq!(found.id, user.id);

    let renamed = users.update_display_name("u1", "  New Name ").await.unwrap();
    assert_eq!(renamed.display_name, "New Name");
    assert_matches!(
        users.update_display_name("u1", "   ").await,
        Err(CoreError::Validation(_))
    );
}
