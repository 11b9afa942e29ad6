//! Document store over Postgres. Each collection is a table of
//! `(id UUID, doc JSONB)` rows; handlers work with loosely-typed JSON
//! documents and field-match filters, never with SQL.

pub mod filter;

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::StoreConfig;
use filter::DocFilter;

pub const BLOGS: &str = "blogs";
pub const COMMENTS: &str = "comments";
pub const WISHLIST: &str = "wishlist";

/// Errors from the store layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// A stored JSON document: the client-supplied fields plus the generated
/// `id` injected on the way out.
pub type Document = Map<String, Value>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertAck {
    pub acknowledged: bool,
    pub inserted_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAck {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upserted_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAck {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

/// Handle on the document store. Constructed once at startup, cloned into
/// every handler through the router state, closed on shutdown.
#[derive(Clone)]
pub struct Store {
    pool: PgPool,
}

impl Store {
    /// Open the connection pool. The pool is lazy: the server comes up even
    /// while the database is unreachable, and `health_check` reports the
    /// difference.
    pub fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| StoreError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy(&url)?;

        Ok(Self { pool })
    }

    /// Create the collection tables and the wishlist uniqueness index.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for table in [BLOGS, COMMENTS, WISHLIST] {
            let sql = format!(
                "CREATE TABLE IF NOT EXISTS \"{}\" (id UUID PRIMARY KEY, doc JSONB NOT NULL)",
                table
            );
            sqlx::query(&sql).execute(&self.pool).await?;
        }

        // one wishlist entry per (post id, email) pair
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS wishlist_post_email_key \
             ON \"wishlist\" ((doc->>'id'), (doc->>'email'))",
        )
        .execute(&self.pool)
        .await?;

        info!("store collections ready");
        Ok(())
    }

    /// Pings the pool to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("store connection pool closed");
    }

    pub fn collection(&self, name: &'static str) -> Collection {
        Collection {
            name,
            pool: self.pool.clone(),
        }
    }
}

/// Collection-scoped operations. Collection names are compile-time
/// constants, so interpolating them into statements is safe.
pub struct Collection {
    name: &'static str,
    pool: PgPool,
}

impl Collection {
    pub async fn insert_one(&self, doc: &Document) -> Result<InsertAck, StoreError> {
        let id = Uuid::new_v4();
        let sql = format!("INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)", self.name);
        sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc.clone()))
            .execute(&self.pool)
            .await?;

        Ok(InsertAck {
            acknowledged: true,
            inserted_id: id,
        })
    }

    /// Atomic conditional insert: one statement, inserting only when
    /// `unless` matches nothing in `guard`. Returns `None` when the guard
    /// blocked the insert.
    pub async fn insert_one_unless(
        &self,
        doc: &Document,
        guard: &Collection,
        unless: DocFilter,
    ) -> Result<Option<InsertAck>, StoreError> {
        let id = Uuid::new_v4();
        let (guard_sql, params) = unless.to_sql(3);
        let sql = format!(
            "INSERT INTO \"{}\" (id, doc) \
             SELECT $1, $2 WHERE NOT EXISTS (SELECT 1 FROM \"{}\" WHERE {})",
            self.name, guard.name, guard_sql
        );

        let mut query = sqlx::query(&sql).bind(id).bind(Value::Object(doc.clone()));
        for param in params.iter() {
            query = bind_param(query, param);
        }
        let result = query.execute(&self.pool).await?;

        Ok((result.rows_affected() > 0).then_some(InsertAck {
            acknowledged: true,
            inserted_id: id,
        }))
    }

    /// Insert honoring the unique index over the given document fields.
    /// Returns `None` when an equivalent document already exists.
    pub async fn insert_one_unique(
        &self,
        doc: &Document,
        unique_fields: &[&str],
    ) -> Result<Option<InsertAck>, StoreError> {
        let id = Uuid::new_v4();
        let target = unique_fields
            .iter()
            .map(|f| format!("(doc->>'{}')", f.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO \"{}\" (id, doc) VALUES ($1, $2) ON CONFLICT ({}) DO NOTHING",
            self.name, target
        );

        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc.clone()))
            .execute(&self.pool)
            .await?;

        Ok((result.rows_affected() > 0).then_some(InsertAck {
            acknowledged: true,
            inserted_id: id,
        }))
    }

    pub async fn find(&self, filter: DocFilter) -> Result<Vec<Document>, StoreError> {
        self.find_limit(filter, None).await
    }

    pub async fn find_limit(
        &self,
        filter: DocFilter,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let (where_sql, params) = filter.to_sql(1);
        let mut sql = format!("SELECT id, doc FROM \"{}\" WHERE {}", self.name, where_sql);
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {}", n));
        }

        let mut query = sqlx::query(&sql);
        for param in params.iter() {
            query = bind_param(query, param);
        }
        let rows = query.fetch_all(&self.pool).await?;

        rows.into_iter().map(row_to_document).collect()
    }

    pub async fn find_one(&self, filter: DocFilter) -> Result<Option<Document>, StoreError> {
        let (where_sql, params) = filter.to_sql(1);
        let sql = format!(
            "SELECT id, doc FROM \"{}\" WHERE {} LIMIT 1",
            self.name, where_sql
        );

        let mut query = sqlx::query(&sql);
        for param in params.iter() {
            query = bind_param(query, param);
        }
        let row = query.fetch_optional(&self.pool).await?;

        row.map(row_to_document).transpose()
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.find_one(DocFilter::new().id_eq(id)).await
    }

    /// Batched fetch of many documents by identity. Missing ids are simply
    /// absent from the result.
    pub async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Document>, StoreError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let sql = format!("SELECT id, doc FROM \"{}\" WHERE id = ANY($1)", self.name);
        let rows = sqlx::query(&sql)
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(row_to_document).collect()
    }

    /// Upsert keyed by identity with `$set` semantics: fields in `doc`
    /// overwrite the stored document, unlisted stored fields survive.
    pub async fn upsert_by_id(&self, id: Uuid, doc: &Document) -> Result<UpdateAck, StoreError> {
        let sql = format!(
            "INSERT INTO \"{0}\" (id, doc) VALUES ($1, $2) \
             ON CONFLICT (id) DO UPDATE SET doc = \"{0}\".doc || EXCLUDED.doc \
             RETURNING (xmax = 0) AS inserted",
            self.name
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .bind(Value::Object(doc.clone()))
            .fetch_one(&self.pool)
            .await?;
        let inserted: bool = row.try_get("inserted")?;

        Ok(if inserted {
            UpdateAck {
                acknowledged: true,
                matched_count: 0,
                modified_count: 0,
                upserted_id: Some(id),
            }
        } else {
            UpdateAck {
                acknowledged: true,
                matched_count: 1,
                modified_count: 1,
                upserted_id: None,
            }
        })
    }

    pub async fn delete_many(&self, filter: DocFilter) -> Result<DeleteAck, StoreError> {
        let (where_sql, params) = filter.to_sql(1);
        let sql = format!("DELETE FROM \"{}\" WHERE {}", self.name, where_sql);

        let mut query = sqlx::query(&sql);
        for param in params.iter() {
            query = bind_param(query, param);
        }
        let result = query.execute(&self.pool).await?;

        Ok(DeleteAck {
            acknowledged: true,
            deleted_count: result.rows_affected(),
        })
    }
}

fn row_to_document(row: PgRow) -> Result<Document, StoreError> {
    let id: Uuid = row.try_get("id")?;
    let doc: Value = row.try_get("doc")?;

    let mut map = match doc {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    map.insert("id".to_string(), Value::String(id.to_string()));
    Ok(map)
}

fn bind_param<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    value: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    match value {
        Value::Null => {
            let none: Option<String> = None;
            query.bind(none)
        }
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s),
        Value::Array(_) | Value::Object(_) => query.bind(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn insert_ack_uses_store_field_names() {
        let ack = InsertAck {
            acknowledged: true,
            inserted_id: Uuid::nil(),
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["acknowledged"], json!(true));
        assert!(value.get("insertedId").is_some());
    }

    #[test]
    fn update_ack_omits_absent_upserted_id() {
        let ack = UpdateAck {
            acknowledged: true,
            matched_count: 1,
            modified_count: 1,
            upserted_id: None,
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["matchedCount"], json!(1));
        assert_eq!(value["modifiedCount"], json!(1));
        assert!(value.get("upsertedId").is_none());
    }

    #[test]
    fn delete_ack_reports_count() {
        let ack = DeleteAck {
            acknowledged: true,
            deleted_count: 2,
        };
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(value["deletedCount"], json!(2));
    }
}
