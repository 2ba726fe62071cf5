//! Postgres-backed store tests. These need a running database reachable via
//! `DATABASE_URL` and are ignored by default: `cargo test -- --ignored`.

use assert_matches::assert_matches;
use serde_json::json;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{EntityType, IndexName, ItemKey};
use soundshelf_db::item::Item;
use soundshelf_db::store::{query_all, ItemStore, PgItemStore, Query, WriteOp};
use sqlx::PgPool;

fn item(pk: &str, sk: &str) -> Item {
    Item::new(ItemKey::new(pk, sk), EntityType::Track, &json!({ "sk": sk })).unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_guarded_writes(pool: PgPool) {
    let store = PgItemStore::new(pool);

    store.create(item("OWNER#u1", "TRACK#a")).await.unwrap();
    assert_matches!(
        store.create(item("OWNER#u1", "TRACK#a")).await,
        Err(CoreError::AlreadyExists { .. })
    );
    assert_matches!(
        store.update(item("OWNER#u1", "TRACK#b")).await,
        Err(CoreError::NotFound { .. })
    );

    store.delete(&ItemKey::new("OWNER#u1", "TRACK#a")).await.unwrap();
    assert_matches!(
        store.delete(&ItemKey::new("OWNER#u1", "TRACK#a")).await,
        Err(CoreError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_concurrent_creates_yield_one_success(pool: PgPool) {
    let store = PgItemStore::new(pool);
    let (a, b) = tokio::join!(
        store.create(item("OWNER#u1", "TRACK#x")),
        store.create(item("OWNER#u1", "TRACK#x")),
    );
    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_update_if_rejects_stale_version(pool: PgPool) {
    let store = PgItemStore::new(pool);
    let versioned = |version: u64| {
        Item::new(
            ItemKey::new("OWNER#u1", "PLAYLIST#p"),
            EntityType::Playlist,
            &json!({ "version": version }),
        )
        .unwrap()
    };
    store.create(versioned(0)).await.unwrap();

    store.update_if(versioned(1), "version", json!(0)).await.unwrap();
    assert_matches!(
        store.update_if(versioned(1), "version", json!(0)).await,
        Err(CoreError::Conflict(_))
    );
    store.delete(&ItemKey::new("OWNER#u1", "PLAYLIST#p")).await.unwrap();
    assert_matches!(
        store.update_if(versioned(2), "version", json!(1)).await,
        Err(CoreError::NotFound { .. })
    );
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_transaction_rolls_back_on_guard_failure(pool: PgPool) {
    let store = PgItemStore::new(pool);
    store.create(item("P", "A")).await.unwrap();

    let result = store
        .transact_write(vec![
            WriteOp::Put(item("P", "B")),
            WriteOp::Delete(ItemKey::new("P", "missing")),
        ])
        .await;
    assert_matches!(result, Err(CoreError::NotFound { .. }));
    assert!(store.get(&ItemKey::new("P", "B")).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_index_paging_in_sort_order(pool: PgPool) {
    let store = PgItemStore::new(pool);
    for i in 0..45 {
        let it = item("OWNER#u1", &format!("TRACK#{i:03}")).with_index(
            IndexName::Index2,
            Some(ItemKey::new("PUBLIC_TRACK", format!("2026-01-01T00:00:{:02}.000Z#{i}", i % 60))),
        );
        store.create(it).await.unwrap();
    }

    let mut seen = Vec::new();
    let mut query = Query::index(IndexName::Index2, "PUBLIC_TRACK").limit(20);
    loop {
        let page = store.query(&query).await.unwrap();
        seen.extend(page.items.into_iter().map(|i| i.key.sk));
        match page.last_key {
            Some(start) => query = query.start_after(Some(start)),
            None => break,
        }
    }
    assert_eq!(seen.len(), 45);
    let mut sorted = seen.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), 45);

    let all = query_all(&store, Query::index(IndexName::Index2, "PUBLIC_TRACK"))
        .await
        .unwrap();
    assert_eq!(all.len(), 45);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore]
async fn test_position_keys_sort_bytewise(pool: PgPool) {
    let store = PgItemStore::new(pool);
    for pos in [10usize, 2, 1] {
        store
            .create(item("PLAYLIST#p", &format!("POSITION#{pos:08}")))
            .await
            .unwrap();
    }
    let page = store
        .query(&Query::partition("PLAYLIST#p").prefix("POSITION#"))
        .await
        .unwrap();
    let sks: Vec<_> = page.items.iter().map(|i| i.key.sk.as_str()).collect();
    assert_eq!(
        sks,
        ["POSITION#00000001", "POSITION#00000002", "POSITION#00000010"]
    );
}
