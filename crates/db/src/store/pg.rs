//! Postgres-backed [`ItemStore`] over the `items` table.
//!
//! Keys are stored with `COLLATE "C"` so range reads order bytewise, which
//! keeps zero-padded position keys and ISO timestamps in their natural order.

use async_trait::async_trait;
use soundshelf_core::error::CoreError;
use soundshelf_core::keys::{IndexName, ItemKey};
use sqlx::{FromRow, PgConnection};

use super::{guard_exists, guard_not_found, guard_stale, ItemStore, Query, QueryPage, SortOrder, WriteOp};
use crate::item::Item;
use crate::{storage_err, DbPool};

/// Column list for the `items` table.
const COLUMNS: &str = "pk, sk, item_type, index1_pk, index1_sk, index2_pk, index2_sk, \
    index3_pk, index3_sk, attributes";

#[derive(Debug, FromRow)]
struct ItemRow {
    pk: String,
    sk: String,
    item_type: String,
    index1_pk: Option<String>,
    index1_sk: Option<String>,
    index2_pk: Option<String>,
    index2_sk: Option<String>,
    index3_pk: Option<String>,
    index3_sk: Option<String>,
    attributes: serde_json::Value,
}

fn index_pair(pk: Option<String>, sk: Option<String>) -> Option<ItemKey> {
    match (pk, sk) {
        (Some(pk), Some(sk)) => Some(ItemKey { pk, sk }),
        _ => None,
    }
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            key: ItemKey {
                pk: row.pk,
                sk: row.sk,
            },
            item_type: row.item_type,
            index1: index_pair(row.index1_pk, row.index1_sk),
            index2: index_pair(row.index2_pk, row.index2_sk),
            index3: index_pair(row.index3_pk, row.index3_sk),
            attributes: row.attributes,
        }
    }
}

fn index_columns(index: Option<IndexName>) -> (&'static str, &'static str) {
    match index {
        None => ("pk", "sk"),
        Some(IndexName::Index1) => ("index1_pk", "index1_sk"),
        Some(IndexName::Index2) => ("index2_pk", "index2_sk"),
        Some(IndexName::Index3) => ("index3_pk", "index3_sk"),
    }
}

fn ix_pk(key: &Option<ItemKey>) -> Option<&str> {
    key.as_ref().map(|k| k.pk.as_str())
}

fn ix_sk(key: &Option<ItemKey>) -> Option<&str> {
    key.as_ref().map(|k| k.sk.as_str())
}

/// Provides the conditional write engine on a Postgres pool.
#[derive(Debug, Clone)]
pub struct PgItemStore {
    pool: DbPool,
}

impl PgItemStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Run one write against an open connection or transaction.
async fn apply_op(conn: &mut PgConnection, op: &WriteOp) -> Result<(), CoreError> {
    match op {
        WriteOp::Create(item) => {
            let query = format!(
                "INSERT INTO items ({COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (pk, sk) DO NOTHING"
            );
            let result = bind_item(sqlx::query(&query), item)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;
            if result.rows_affected() == 0 {
                return Err(guard_exists(&item.key));
            }
        }
        WriteOp::Update(item) => {
            let result = bind_item(
                sqlx::query(
                    "UPDATE items SET \
                        item_type = $3, \
                        index1_pk = $4, index1_sk = $5, \
                        index2_pk = $6, index2_sk = $7, \
                        index3_pk = $8, index3_sk = $9, \
                        attributes = $10 \
                     WHERE pk = $1 AND sk = $2",
                ),
                item,
            )
            .execute(&mut *conn)
            .await
            .map_err(storage_err)?;
            if result.rows_affected() == 0 {
                return Err(guard_not_found(&item.key));
            }
        }
        WriteOp::UpdateIf {
            item,
            attribute,
            expected,
        } => {
            let result = bind_item(
                sqlx::query(
                    "UPDATE items SET \
                        item_type = $3, \
                        index1_pk = $4, index1_sk = $5, \
                        index2_pk = $6, index2_sk = $7, \
                        index3_pk = $8, index3_sk = $9, \
                        attributes = $10 \
                     WHERE pk = $1 AND sk = $2 AND attributes -> $11 = $12",
                ),
                item,
            )
            .bind(*attribute)
            .bind(expected)
            .execute(&mut *conn)
            .await
            .map_err(storage_err)?;
            if result.rows_affected() == 0 {
                let exists: Option<i32> =
                    sqlx::query_scalar("SELECT 1 FROM items WHERE pk = $1 AND sk = $2")
                        .bind(&item.key.pk)
                        .bind(&item.key.sk)
                        .fetch_optional(&mut *conn)
                        .await
                        .map_err(storage_err)?;
                return Err(match exists {
                    Some(_) => guard_stale(&item.key, attribute),
                    None => guard_not_found(&item.key),
                });
            }
        }
        WriteOp::Put(item) => {
            let query = format!(
                "INSERT INTO items ({COLUMNS}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
                 ON CONFLICT (pk, sk) DO UPDATE SET \
                    item_type = EXCLUDED.item_type, \
                    index1_pk = EXCLUDED.index1_pk, index1_sk = EXCLUDED.index1_sk, \
                    index2_pk = EXCLUDED.index2_pk, index2_sk = EXCLUDED.index2_sk, \
                    index3_pk = EXCLUDED.index3_pk, index3_sk = EXCLUDED.index3_sk, \
                    attributes = EXCLUDED.attributes"
            );
            bind_item(sqlx::query(&query), item)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;
        }
        WriteOp::Delete(key) => {
            let result = sqlx::query("DELETE FROM items WHERE pk = $1 AND sk = $2")
                .bind(&key.pk)
                .bind(&key.sk)
                .execute(&mut *conn)
                .await
                .map_err(storage_err)?;
            if result.rows_affected() == 0 {
                return Err(guard_not_found(key));
            }
        }
        WriteOp::ConditionCheck(key) => {
            let found: Option<i32> =
                sqlx::query_scalar("SELECT 1 FROM items WHERE pk = $1 AND sk = $2 FOR SHARE")
                    .bind(&key.pk)
                    .bind(&key.sk)
                    .fetch_optional(&mut *conn)
                    .await
                    .map_err(storage_err)?;
            if found.is_none() {
                return Err(guard_not_found(key));
            }
        }
    }
    Ok(())
}

fn bind_item<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    item: &'q Item,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(&item.key.pk)
        .bind(&item.key.sk)
        .bind(&item.item_type)
        .bind(ix_pk(&item.index1))
        .bind(ix_sk(&item.index1))
        .bind(ix_pk(&item.index2))
        .bind(ix_sk(&item.index2))
        .bind(ix_pk(&item.index3))
        .bind(ix_sk(&item.index3))
        .bind(&item.attributes)
}

#[async_trait]
impl ItemStore for PgItemStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<Item>, CoreError> {
        let query = format!("SELECT {COLUMNS} FROM items WHERE pk = $1 AND sk = $2");
        let row = sqlx::query_as::<_, ItemRow>(&query)
            .bind(&key.pk)
            .bind(&key.sk)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(Item::from))
    }

    async fn create(&self, item: Item) -> Result<(), CoreError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;
        apply_op(&mut *conn, &WriteOp::Create(item)).await
    }

    async fn update(&self, item: Item) -> Result<(), CoreError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;
        apply_op(&mut *conn, &WriteOp::Update(item)).await
    }

    async fn put(&self, item: Item) -> Result<(), CoreError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;
        apply_op(&mut *conn, &WriteOp::Put(item)).await
    }

    async fn delete(&self, key: &ItemKey) -> Result<(), CoreError> {
        let mut conn = self.pool.acquire().await.map_err(storage_err)?;
        apply_op(&mut *conn, &WriteOp::Delete(key.clone())).await
    }

    async fn query(&self, query: &Query) -> Result<QueryPage, CoreError> {
        query.validate_start()?;
        let (pk_col, sk_col) = index_columns(query.index);
        let (cmp, dir) = match query.order {
            SortOrder::Ascending => (">", "ASC"),
            SortOrder::Descending => ("<", "DESC"),
        };
        let sql = format!(
            "SELECT {COLUMNS} FROM items \
             WHERE {pk_col} = $1 \
               AND ($2::text IS NULL OR starts_with({sk_col}, $2)) \
               AND ($3::text IS NULL OR ({sk_col}, pk, sk) {cmp} ($3, $4, $5)) \
             ORDER BY {sk_col} {dir}, pk {dir}, sk {dir} \
             LIMIT $6"
        );

        let start = query.start.as_ref().map(|s| {
            let sort = s
                .index
                .as_ref()
                .map_or(s.primary.sk.as_str(), |ix| ix.sk.as_str());
            (sort, s.primary.pk.as_str(), s.primary.sk.as_str())
        });
        let limit = query.limit.max(1);

        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(&query.partition)
            .bind(query.sk_prefix.as_deref())
            .bind(start.map(|s| s.0))
            .bind(start.map(|s| s.1))
            .bind(start.map(|s| s.2))
            .bind((limit + 1) as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;

        let has_more = rows.len() > limit;
        let items: Vec<Item> = rows.into_iter().take(limit).map(Item::from).collect();
        let last_key = if has_more {
            items.last().map(|item| query.start_key_for(item))
        } else {
            None
        };
        Ok(QueryPage { items, last_key })
    }

    async fn transact_write(&self, ops: Vec<WriteOp>) -> Result<(), CoreError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;
        for op in &ops {
            // Dropping `tx` on the error path rolls the batch back.
            apply_op(&mut *tx, op).await?;
        }
        tx.commit().await.map_err(storage_err)?;
        tracing::debug!(ops = ops.len(), "Committed item transaction");
        Ok(())
    }
}
