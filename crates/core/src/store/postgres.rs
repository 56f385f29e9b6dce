use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, Transaction};
use uuid::Uuid;

use super::{StoreError, StoreResult, Upserted};
use crate::document::{
    ContentDocument, ContentQuery, ContentUpdate, Metadata, NewContent, NewTheme, PageView,
    Subscriber, Theme, ThemeSettings, ThemeUpdate,
};

/// Advisory lock namespace for per-type content writes.
const CONTENT_TYPE_LOCK: i32 = 7301;

const CONTENT_ORDER: &str =
    "ORDER BY (metadata->>'order')::BIGINT ASC NULLS LAST, created_at DESC";

/// Row of the `contents` table.
#[derive(Debug, FromRow)]
struct ContentRow {
    id: Uuid,
    content_type: String,
    title: String,
    description: String,
    content: Json<Value>,
    metadata: Json<Metadata>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContentRow> for ContentDocument {
    fn from(row: ContentRow) -> Self {
        ContentDocument {
            id: row.id,
            content_type: row.content_type,
            title: row.title,
            description: row.description,
            content: row.content.0,
            metadata: row.metadata.0,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Row of the `themes` table.
#[derive(Debug, FromRow)]
struct ThemeRow {
    id: Uuid,
    name: String,
    primary_color: String,
    secondary_color: String,
    accent_color: String,
    background_color: String,
    text_color: String,
    heading_font: String,
    body_font: String,
    border_radius: String,
    spacing: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ThemeRow> for Theme {
    fn from(row: ThemeRow) -> Self {
        Theme {
            id: row.id,
            settings: ThemeSettings {
                name: row.name,
                primary_color: row.primary_color,
                secondary_color: row.secondary_color,
                accent_color: row.accent_color,
                background_color: row.background_color,
                text_color: row.text_color,
                heading_font: row.heading_font,
                body_font: row.body_font,
                border_radius: row.border_radius,
                spacing: row.spacing,
            },
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SubscriberRow {
    id: Uuid,
    email: String,
    region: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Subscriber {
            id: row.id,
            email: row.email,
            region: row.region,
            created_at: row.created_at,
        }
    }
}

/// PostgreSQL-backed store. `content` and `metadata` live in JSONB columns.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the workspace migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn list_content(&self, query: &ContentQuery) -> StoreResult<Vec<ContentDocument>> {
        let sql = format!(
            r#"
            SELECT * FROM contents
            WHERE ($1::TEXT IS NULL OR content_type = $1)
              AND ($2::BOOLEAN IS NULL OR is_active = $2)
            {CONTENT_ORDER}
            "#
        );
        let rows = sqlx::query_as::<_, ContentRow>(&sql)
            .bind(query.content_type.as_deref())
            .bind(query.active)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn find_by_type(&self, content_type: &str) -> StoreResult<Option<ContentDocument>> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE content_type = $1 AND is_active
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(content_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_content(&self, new: NewContent) -> StoreResult<ContentDocument> {
        let mut tx = self.pool.begin().await?;
        let doc = insert_content(&mut tx, new).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub async fn upsert_by_type(&self, new: NewContent) -> StoreResult<Upserted<ContentDocument>> {
        let mut tx = self.pool.begin().await?;
        lock_content_type(&mut tx, &new.content_type).await?;

        let existing: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT id FROM contents
            WHERE content_type = $1
            ORDER BY updated_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(&new.content_type)
        .fetch_optional(&mut *tx)
        .await?;

        let result = match existing {
            Some(id) => {
                let update = ContentUpdate {
                    title: Some(new.title),
                    description: Some(new.description),
                    content: Some(new.content),
                    metadata: Some(new.metadata),
                    is_active: Some(new.is_active),
                };
                let doc = update_content_row(&mut tx, id, update).await?;
                Upserted {
                    // The row was locked above, so it is still there.
                    value: doc.ok_or(sqlx::Error::RowNotFound)?,
                    created: false,
                }
            }
            None => Upserted {
                value: insert_content(&mut tx, new).await?,
                created: true,
            },
        };

        tx.commit().await?;
        Ok(result)
    }

    pub async fn update_content(
        &self,
        id: Uuid,
        update: ContentUpdate,
    ) -> StoreResult<Option<ContentDocument>> {
        let mut tx = self.pool.begin().await?;
        let doc = update_content_row(&mut tx, id, update).await?;
        tx.commit().await?;
        Ok(doc)
    }

    pub async fn delete_content(&self, id: Uuid) -> StoreResult<Option<ContentDocument>> {
        let row = sqlx::query_as::<_, ContentRow>("DELETE FROM contents WHERE id = $1 RETURNING *")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn delete_by_type(&self, content_type: &str) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM contents WHERE content_type = $1")
            .bind(content_type)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn replace_type(
        &self,
        content_type: &str,
        docs: Vec<NewContent>,
    ) -> StoreResult<Vec<ContentDocument>> {
        let mut tx = self.pool.begin().await?;
        lock_content_type(&mut tx, content_type).await?;
        sqlx::query("DELETE FROM contents WHERE content_type = $1")
            .bind(content_type)
            .execute(&mut *tx)
            .await?;

        let mut inserted = Vec::with_capacity(docs.len());
        for mut new in docs {
            new.content_type = content_type.to_string();
            inserted.push(insert_content(&mut tx, new).await?);
        }

        tx.commit().await?;
        Ok(inserted)
    }

    pub async fn record_page_view(&self, path: &str) -> StoreResult<PageView> {
        let (path, count): (String, i64) = sqlx::query_as(
            r#"
            INSERT INTO page_views (path, count, updated_at)
            VALUES ($1, 1, NOW())
            ON CONFLICT (path)
            DO UPDATE SET count = page_views.count + 1, updated_at = NOW()
            RETURNING path, count
            "#,
        )
        .bind(path)
        .fetch_one(&self.pool)
        .await?;
        Ok(PageView { path, count })
    }

    pub async fn list_page_views(&self, limit: i64) -> StoreResult<Vec<PageView>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT path, count FROM page_views ORDER BY count DESC, path ASC LIMIT $1",
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(path, count)| PageView { path, count })
            .collect())
    }

    pub async fn list_themes(&self) -> StoreResult<Vec<Theme>> {
        let rows = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn active_theme(&self) -> StoreResult<Option<Theme>> {
        let row = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE is_active LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn get_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        let row = sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn create_theme(&self, new: NewTheme) -> StoreResult<Theme> {
        let mut tx = self.pool.begin().await?;
        if new.is_active {
            lock_themes(&mut tx).await?;
        }
        let s = &new.settings;
        let theme: Theme = sqlx::query_as::<_, ThemeRow>(
            r#"
            INSERT INTO themes (
                id, name, primary_color, secondary_color, accent_color, background_color,
                text_color, heading_font, body_font, border_radius, spacing, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, FALSE)
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(&s.name)
        .bind(&s.primary_color)
        .bind(&s.secondary_color)
        .bind(&s.accent_color)
        .bind(&s.background_color)
        .bind(&s.text_color)
        .bind(&s.heading_font)
        .bind(&s.body_font)
        .bind(&s.border_radius)
        .bind(&s.spacing)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let theme = if new.is_active {
            activate_in(&mut tx, theme.id).await?.unwrap_or(theme)
        } else {
            theme
        };

        tx.commit().await?;
        Ok(theme)
    }

    pub async fn update_theme(&self, id: Uuid, update: ThemeUpdate) -> StoreResult<Option<Theme>> {
        let mut tx = self.pool.begin().await?;
        if update.activates() {
            lock_themes(&mut tx).await?;
        }

        let Some(current) =
            sqlx::query_as::<_, ThemeRow>("SELECT * FROM themes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
        else {
            return Ok(None);
        };

        let mut settings = Theme::from(current).settings;
        update.apply(&mut settings);

        let theme: Theme = sqlx::query_as::<_, ThemeRow>(
            r#"
            UPDATE themes SET
                name = $2, primary_color = $3, secondary_color = $4, accent_color = $5,
                background_color = $6, text_color = $7, heading_font = $8, body_font = $9,
                border_radius = $10, spacing = $11, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&settings.name)
        .bind(&settings.primary_color)
        .bind(&settings.secondary_color)
        .bind(&settings.accent_color)
        .bind(&settings.background_color)
        .bind(&settings.text_color)
        .bind(&settings.heading_font)
        .bind(&settings.body_font)
        .bind(&settings.border_radius)
        .bind(&settings.spacing)
        .fetch_one(&mut *tx)
        .await?
        .into();

        let theme = if update.activates() {
            activate_in(&mut tx, id).await?.unwrap_or(theme)
        } else {
            theme
        };

        tx.commit().await?;
        Ok(Some(theme))
    }

    pub async fn activate_theme(&self, id: Uuid) -> StoreResult<Option<Theme>> {
        let mut tx = self.pool.begin().await?;
        lock_themes(&mut tx).await?;
        let theme = activate_in(&mut tx, id).await?;
        if theme.is_some() {
            tx.commit().await?;
        } else {
            tx.rollback().await?;
        }
        Ok(theme)
    }

    pub async fn delete_theme(&self, id: Uuid) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let active: Option<bool> =
            sqlx::query_scalar("SELECT is_active FROM themes WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        match active {
            None => Ok(false),
            Some(true) => Err(StoreError::Conflict(
                "cannot delete the active theme".to_string(),
            )),
            Some(false) => {
                sqlx::query("DELETE FROM themes WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                tx.commit().await?;
                Ok(true)
            }
        }
    }

    pub async fn subscribe(
        &self,
        email: &str,
        region: Option<String>,
    ) -> StoreResult<Upserted<Subscriber>> {
        let inserted = sqlx::query_as::<_, SubscriberRow>(
            r#"
            INSERT INTO newsletter_subscribers (id, email, region)
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(email)
        .bind(&region)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok(Upserted {
                value: row.into(),
                created: true,
            });
        }

        let existing = sqlx::query_as::<_, SubscriberRow>(
            "SELECT * FROM newsletter_subscribers WHERE email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(Upserted {
            value: existing.into(),
            created: false,
        })
    }

    pub async fn list_subscribers(&self) -> StoreResult<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT * FROM newsletter_subscribers ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

async fn insert_content(
    tx: &mut Transaction<'_, Postgres>,
    new: NewContent,
) -> StoreResult<ContentDocument> {
    let doc = new.into_document(Utc::now());
    let row = sqlx::query_as::<_, ContentRow>(
        r#"
        INSERT INTO contents (
            id, content_type, title, description, content, metadata, is_active,
            created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
        RETURNING *
        "#,
    )
    .bind(doc.id)
    .bind(&doc.content_type)
    .bind(&doc.title)
    .bind(&doc.description)
    .bind(Json(&doc.content))
    .bind(Json(&doc.metadata))
    .bind(doc.is_active)
    .bind(doc.created_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(row.into())
}

async fn update_content_row(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    update: ContentUpdate,
) -> StoreResult<Option<ContentDocument>> {
    let Some(row) = sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
    else {
        return Ok(None);
    };

    let mut doc = ContentDocument::from(row);
    update.apply(&mut doc, Utc::now());

    let row = sqlx::query_as::<_, ContentRow>(
        r#"
        UPDATE contents SET
            title = $2, description = $3, content = $4, metadata = $5,
            is_active = $6, updated_at = $7
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&doc.title)
    .bind(&doc.description)
    .bind(Json(&doc.content))
    .bind(Json(&doc.metadata))
    .bind(doc.is_active)
    .bind(doc.updated_at)
    .fetch_one(&mut **tx)
    .await?;
    Ok(Some(row.into()))
}

/// Hold writers of `content_type` off until the transaction ends, so two
/// first-time upserts cannot both insert.
async fn lock_content_type(tx: &mut Transaction<'_, Postgres>, content_type: &str) -> StoreResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
        .bind(CONTENT_TYPE_LOCK)
        .bind(content_type)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Serialise theme activations. Must run before the transaction writes to
/// `themes`; the mode conflicts with itself but not with plain reads.
async fn lock_themes(tx: &mut Transaction<'_, Postgres>) -> StoreResult<()> {
    sqlx::query("LOCK TABLE themes IN SHARE ROW EXCLUSIVE MODE")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Unset every other active theme, then set `id`, inside the caller's
/// transaction. Callers hold [`lock_themes`]; the partial unique index on
/// `themes (is_active) WHERE is_active` backs it up.
async fn activate_in(tx: &mut Transaction<'_, Postgres>, id: Uuid) -> StoreResult<Option<Theme>> {
    sqlx::query("UPDATE themes SET is_active = FALSE, updated_at = NOW() WHERE is_active AND id <> $1")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    let row = sqlx::query_as::<_, ThemeRow>(
        "UPDATE themes SET is_active = TRUE, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(row.map(Into::into))
}
