use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::database::manager::DatabaseError;
use crate::database::models::{Property, PropertyId, PublicUser, UserId};
use crate::database::repository::{PropertyRepository, UserRepository};
use crate::filter::PropertyFilter;

const SCHEMA: [&str; 4] = [
    r#"CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password TEXT NOT NULL,
        profile_img TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
        updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    r#"CREATE TABLE IF NOT EXISTS properties (
        id UUID PRIMARY KEY,
        doc JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )"#,
    "CREATE INDEX IF NOT EXISTS properties_doc_idx ON properties USING GIN (doc)",
    "CREATE INDEX IF NOT EXISTS properties_created_at_idx ON properties (created_at)",
];

/// Top-level merge of `$3` into an owned document, then the owner is removed
/// from the merged bookmark set.
const UPDATE_FIELDS_SQL: &str = r#"UPDATE properties
    SET doc = (doc || $3) || jsonb_build_object('bookmarkedUsers', COALESCE((
        SELECT jsonb_agg(t.e ORDER BY t.i)
        FROM jsonb_array_elements(COALESCE((doc || $3) -> 'bookmarkedUsers', '[]'::jsonb))
            WITH ORDINALITY AS t(e, i)
        WHERE t.e <> (doc || $3) -> 'currentOwner'
    ), '[]'::jsonb))
    WHERE id = $1 AND doc ->> 'currentOwner' = $2
    RETURNING doc"#;

/// Remove `$2` from the bookmark array if present, append it otherwise.
const TOGGLE_BOOKMARK_SQL: &str = r#"UPDATE properties
    SET doc = jsonb_set(doc, '{bookmarkedUsers}',
        CASE WHEN COALESCE(doc -> 'bookmarkedUsers', '[]'::jsonb) @> jsonb_build_array($2::text)
        THEN COALESCE((
            SELECT jsonb_agg(t.e ORDER BY t.i)
            FROM jsonb_array_elements(doc -> 'bookmarkedUsers') WITH ORDINALITY AS t(e, i)
            WHERE t.e <> to_jsonb($2::text)
        ), '[]'::jsonb)
        ELSE COALESCE(doc -> 'bookmarkedUsers', '[]'::jsonb) || jsonb_build_array($2::text)
        END) || jsonb_build_object('updatedAt', $3::jsonb)
    WHERE id = $1 AND doc ->> 'currentOwner' <> $2::text
    RETURNING doc"#;

/// Property documents stored as JSONB rows in Postgres.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_deref()
            .ok_or(DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await?;

        info!("Created database pool (max {} connections)", config.max_connections);
        Ok(Self { pool })
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn bootstrap(&self) -> Result<(), DatabaseError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Database schema ready");
        Ok(())
    }

    fn select_sql(filter: &PropertyFilter) -> (String, Vec<String>) {
        let (where_clause, params) = filter.to_sql("doc", 1);
        (
            format!("SELECT doc FROM properties WHERE {} ORDER BY created_at, id", where_clause),
            params,
        )
    }

    fn count_sql(filter: &PropertyFilter) -> (String, Vec<String>) {
        let (where_clause, params) = filter.to_sql("doc", 1);
        (format!("SELECT COUNT(*) FROM properties WHERE {}", where_clause), params)
    }
}

#[async_trait]
impl PropertyRepository for PgStore {
    async fn find(&self, filter: &PropertyFilter) -> Result<Vec<Property>, DatabaseError> {
        let (sql, params) = Self::select_sql(filter);
        let mut q = sqlx::query_scalar::<_, Json<Property>>(&sql);
        for p in params.iter() {
            q = q.bind(p);
        }
        let rows = q.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(property)| property).collect())
    }

    async fn count(&self, filter: &PropertyFilter) -> Result<i64, DatabaseError> {
        let (sql, params) = Self::count_sql(filter);
        let mut q = sqlx::query_scalar::<_, i64>(&sql);
        for p in params.iter() {
            q = q.bind(p);
        }
        Ok(q.fetch_one(&self.pool).await?)
    }

    async fn find_by_id(&self, id: &PropertyId) -> Result<Option<Property>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Property>>("SELECT doc FROM properties WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(property)| property))
    }

    async fn insert(&self, property: &Property) -> Result<(), DatabaseError> {
        sqlx::query("INSERT INTO properties (id, doc, created_at) VALUES ($1, $2, $3)")
            .bind(property.id)
            .bind(Json(property))
            .bind(property.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_fields(
        &self,
        id: &PropertyId,
        owner: &UserId,
        changes: &Map<String, Value>,
    ) -> Result<Option<Property>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Property>>(UPDATE_FIELDS_SQL)
            .bind(id)
            .bind(owner.to_string())
            .bind(Json(changes))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(property)| property))
    }

    async fn toggle_bookmark(
        &self,
        id: &PropertyId,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<Option<Property>, DatabaseError> {
        let row = sqlx::query_scalar::<_, Json<Property>>(TOGGLE_BOOKMARK_SQL)
            .bind(id)
            .bind(user.to_string())
            .bind(Json(at))
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(property)| property))
    }

    async fn delete(&self, id: &PropertyId, owner: &UserId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM properties WHERE id = $1 AND doc ->> 'currentOwner' = $2")
            .bind(id)
            .bind(owner.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_public(&self, ids: &[UserId]) -> Result<Vec<PublicUser>, DatabaseError> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let ids: Vec<uuid::Uuid> = ids.iter().map(|id| *id.as_uuid()).collect();

        // Password is never selected.
        let users = sqlx::query_as::<_, PublicUser>(
            "SELECT id, username, email, profile_img, created_at
             FROM users
             WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
