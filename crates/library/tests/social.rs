mod common;

use assert_matches::assert_matches;
use common::Harness;
use soundshelf_core::cursor::PageRequest;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys;

#[tokio::test]
async fn follow_writes_forward_and_reverse_entries() {
    let h = Harness::new();
    h.user("a").await;
    h.user("b").await;
    let follows = h.library.follows();

    follows.follow("a", "b").await.unwrap();
    let items = h.items().await;
    let forward: Vec<_> = items
        .iter()
        .filter(|i| i.key == keys::follow_key("a", "b"))
        .collect();
    let reverse: Vec<_> = items
        .iter()
        .filter(|i| i.index1.as_ref().is_some_and(|ix| ix.pk == keys::followers_partition("b")))
        .collect();
    assert_eq!(forward.len(), 1);
    assert_eq!(reverse.len(), 1);
    assert!(follows.is_following("a", "b").await.unwrap());
    assert!(!follows.is_following("b", "a").await.unwrap());
    assert_eq!(follows.follower_count("b").await.unwrap(), 1);

    follows.unfollow("a", "b").await.unwrap();
    let remaining = h
        .items()
        .await
        .into_iter()
        .filter(|i| i.item_type == "FOLLOW")
        .count();
    assert_eq!(remaining, 0);
    assert_eq!(follows.follower_count("b").await.unwrap(), 0);
}

#[tokio::test]
async fn self_follow_is_rejected_and_persists_nothing() {
    let h = Harness::new();
    h.user("a").await;
    let before = h.items().await.len();
    assert_matches!(
        h.library.follows().follow("a", "a").await,
        Err(CoreError::Validation(_))
    );
    assert_eq!(h.items().await.len(), before);
}

#[tokio::test]
async fn follow_requires_both_users() {
    let h = Harness::new();
    h.user("a").await;
    assert_matches!(
        h.library.follows().follow("a", "ghost").await,
        Err(CoreError::NotFound { entity: "user", .. })
    );
}

#[tokio::test]
async fn repeated_follow_and_missing_unfollow() {
    let h = Harness::new();
    h.user("a").await;
    h.user("b").await;
    let follows = h.library.follows();
    follows.follow("a", "b").await.unwrap();
    assert_matches!(follows.follow("a", "b").await, Err(CoreError::AlreadyExists { .. }));
    assert_matches!(follows.unfollow("b", "a").await, Err(CoreError::NotFound { .. }));
}

#[tokio::test]
async fn follower_pages_do_not_overlap() {
    let h = Harness::new();
    h.user("star").await;
    for i in 0..45 {
        let fan = format!("fan{i:02}");
        h.user(&fan).await;
        h.library.follows().follow(&fan, "star").await.unwrap();
    }

    let follows = h.library.follows();
    let mut seen = Vec::new();
    let mut request = PageRequest::first(20);
    let mut pages = 0;
    loop {
        let page = follows.list_followers("star", &request).await.unwrap();
        pages += 1;
        seen.extend(page.items.iter().map(|f| f.follower_id.clone()));
        match page.next_cursor {
            Some(cursor) => {
                assert!(page.has_more);
                request = PageRequest::after(20, cursor);
            }
            None => {
                assert!(!page.has_more);
                break;
            }
        }
    }
    assert_eq!(pages, 3);
    assert_eq!(seen.len(), 45);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 45);

    let following = follows
        .list_following("fan00", &PageRequest::default())
        .await
        .unwrap();
    assert_eq!(following.items.len(), 1);
}
