mod common;

use common::Harness;
use soundshelf_core::cursor::PageRequest;
use soundshelf_core::keys::{DiscoveryKind, IndexName};
use soundshelf_core::visibility::Visibility;
use soundshelf_db::models::playlist::CreatePlaylist;

async fn discovery_entries(h: &Harness, kind: DiscoveryKind) -> usize {
    h.items()
        .await
        .iter()
        .filter(|i| {
            i.index_key(IndexName::Index2)
                .is_some_and(|ix| ix.pk == kind.partition())
        })
        .count()
}

#[tokio::test]
async fn private_public_private_leaves_no_discovery_entry() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 120).await;
    let visibility = h.library.visibility();

    let public = visibility
        .set_track_visibility("u1", &track.id, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(public.visibility, Visibility::Public);
    assert_eq!(discovery_entries(&h, DiscoveryKind::Track).await, 1);
    let listed = visibility
        .list_public_tracks(&PageRequest::default())
        .await
        .unwrap();
    assert_eq!(listed.items.len(), 1);

    visibility
        .set_track_visibility("u1", &track.id, Visibility::Private)
        .await
        .unwrap();
    assert_eq!(discovery_entries(&h, DiscoveryKind::Track).await, 0);
    let listed = visibility
        .list_public_tracks(&PageRequest::default())
        .await
        .unwrap();
    assert!(listed.items.is_empty());
}

#[tokio::test]
async fn unlisted_is_not_discoverable() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 120).await;
    h.library
        .visibility()
        .set_track_visibility("u1", &track.id, Visibility::Unlisted)
        .await
        .unwrap();
    assert_eq!(discovery_entries(&h, DiscoveryKind::Track).await, 0);
}

#[tokio::test]
async fn setting_the_same_value_is_a_no_op() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 120).await;
    let visibility = h.library.visibility();
    let first = visibility
        .set_track_visibility("u1", &track.id, Visibility::Public)
        .await
        .unwrap();
    let again = visibility
        .set_track_visibility("u1", &track.id, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(first.updated_at, again.updated_at);
    assert_eq!(discovery_entries(&h, DiscoveryKind::Track).await, 1);
}

#[tokio::test]
async fn public_playlists_list_newest_first() {
    let h = Harness::new();
    let playlists = h.library.playlists();
    let visibility = h.library.visibility();
    let mut ids = Vec::new();
    for name in ["First", "Second", "Third"] {
        let p = playlists
            .create_playlist(
                "u1",
                CreatePlaylist {
                    name: name.into(),
                    description: None,
                    visibility: Visibility::Private,
                    cover_art_key: None,
                },
            )
            .await
            .unwrap();
        visibility
            .set_playlist_visibility("u1", &p.id, Visibility::Public)
            .await
            .unwrap();
        ids.push(p.id);
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    let page = visibility
        .list_public_playlists(&PageRequest::default())
        .await
        .unwrap();
    let listed: Vec<_> = page.items.iter().map(|p| p.id.clone()).collect();
    ids.reverse();
    assert_eq!(listed, ids);
    assert_eq!(discovery_entries(&h, DiscoveryKind::Playlist).await, 3);
}

#[tokio::test]
async fn search_document_follows_visibility() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 120).await;
    h.library
        .tags()
        .tag_track("u1", &track.id, &["chill".into()])
        .await
        .unwrap();
    let visibility = h.library.visibility();

    visibility
        .set_track_visibility("u1", &track.id, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(h.search.document(&track.id).unwrap().visibility, "public");

    visibility
        .set_track_visibility("u1", &track.id, Visibility::Private)
        .await
        .unwrap();
    let doc = h.search.document(&track.id).unwrap();
    assert_eq!(doc.visibility, "private");
    assert_eq!(doc.tags, ["chill"]);
}

#[tokio::test]
async fn search_outage_does_not_block_visibility_change() {
    let h = Harness::new();
    let track = h.track("u1", "Song", 120).await;
    h.search.set_failing(true);

    let updated = h
        .library
        .visibility()
        .set_track_visibility("u1", &track.id, Visibility::Public)
        .await
        .unwrap();
    assert_eq!(updated.visibility, Visibility::Public);
    assert_eq!(discovery_entries(&h, DiscoveryKind::Track).await, 1);
}
