//! Database operations for `posts`.

use chrono::{DateTime, NaiveDate, Utc};
use engagedb_core::{dedupe_title, DateRange, Platform, PostMetrics, PostRecord};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const POST_COLUMNS: &str = "id, public_id, platform, title, post_url, post_date, report_date, \
     view_count, like_count, comment_count, share_count, save_count, \
     target_engagement, target_achieved_date, created_at, updated_at";

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PostRow {
    pub id: i64,
    pub public_id: Uuid,
    pub platform: String,
    pub title: String,
    pub post_url: Option<String>,
    pub post_date: NaiveDate,
    pub report_date: NaiveDate,
    pub view_count: Option<i64>,
    pub like_count: Option<i64>,
    pub comment_count: Option<i64>,
    pub share_count: Option<i64>,
    pub save_count: Option<i64>,
    pub target_engagement: Option<f64>,
    pub target_achieved_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostRow {
    #[must_use]
    pub fn metrics(&self) -> PostMetrics {
        PostMetrics {
            view: self.view_count,
            like: self.like_count,
            comment: self.comment_count,
            share: self.share_count,
            save: self.save_count,
        }
    }

    /// Convert into the domain record.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::InvalidColumn`] if the stored platform is not recognised.
    pub fn into_record(self) -> Result<PostRecord, DbError> {
        let platform: Platform = self.platform.parse().map_err(|_| DbError::InvalidColumn {
            column: "posts.platform",
            value: self.platform.clone(),
        })?;
        let metrics = self.metrics();
        Ok(PostRecord {
            id: self.id,
            public_id: self.public_id,
            platform,
            title: self.title,
            post_url: self.post_url,
            post_date: self.post_date,
            report_date: self.report_date,
            metrics,
            target_engagement: self.target_engagement,
            target_achieved_date: self.target_achieved_date,
        })
    }
}

/// Input for [`insert_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub platform: Platform,
    pub title: String,
    pub post_url: Option<String>,
    pub post_date: NaiveDate,
    pub metrics: PostMetrics,
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a post, suffixing the title with a counter if it is already taken.
///
/// Title lookup and insert share one transaction.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the lookup or insert fails, including the
/// check constraint on negative counts.
pub async fn insert_post(
    pool: &PgPool,
    post: &NewPost,
    report_date: NaiveDate,
) -> Result<PostRow, DbError> {
    let mut tx = pool.begin().await?;

    let existing: Vec<String> =
        sqlx::query_scalar::<_, String>("SELECT title FROM posts WHERE starts_with(title, $1)")
            .bind(&post.title)
            .fetch_all(&mut *tx)
            .await?;
    let title = dedupe_title(&post.title, &existing);

    let row = sqlx::query_as::<_, PostRow>(&format!(
        "INSERT INTO posts \
         (public_id, platform, title, post_url, post_date, report_date, \
          view_count, like_count, comment_count, share_count, save_count) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(post.platform.as_str())
    .bind(&title)
    .bind(post.post_url.as_deref())
    .bind(post.post_date)
    .bind(report_date)
    .bind(post.metrics.view)
    .bind(post.metrics.like)
    .bind(post.metrics.comment)
    .bind(post.metrics.share)
    .bind(post.metrics.save)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(row)
}

/// Overlays the supplied counts on a post; `None` keeps the stored value.
///
/// Returns `None` when the post does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn update_post_metrics(
    pool: &PgPool,
    id: i64,
    metrics: &PostMetrics,
) -> Result<Option<PostRow>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "UPDATE posts SET \
         view_count = COALESCE($2, view_count), \
         like_count = COALESCE($3, like_count), \
         comment_count = COALESCE($4, comment_count), \
         share_count = COALESCE($5, share_count), \
         save_count = COALESCE($6, save_count), \
         updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {POST_COLUMNS}"
    ))
    .bind(id)
    .bind(metrics.view)
    .bind(metrics.like)
    .bind(metrics.comment)
    .bind(metrics.share)
    .bind(metrics.save)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Writes both target columns.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no post has this id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_post_target(
    pool: &PgPool,
    id: i64,
    target: Option<f64>,
    achieved_date: Option<NaiveDate>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE posts \
         SET target_engagement = $2, target_achieved_date = $3, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(target)
    .bind(achieved_date)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no post has this id, or [`DbError::Sqlx`]
/// if the update fails.
pub async fn set_target_achieved_date(
    pool: &PgPool,
    id: i64,
    achieved_date: Option<NaiveDate>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE posts SET target_achieved_date = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(achieved_date)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no post has this id, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn delete_post(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM posts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_post(pool: &PgPool, id: i64) -> Result<Option<PostRow>, DbError> {
    let row = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Posts matching an optional platform and inclusive date range, ordered by
/// `post_date` then `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts(
    pool: &PgPool,
    platform: Option<Platform>,
    range: Option<DateRange>,
) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM posts \
         WHERE ($1::text IS NULL OR platform = $1) \
           AND ($2::date IS NULL OR post_date >= $2) \
           AND ($3::date IS NULL OR post_date <= $3) \
         ORDER BY post_date, id"
    ))
    .bind(platform.map(Platform::as_str))
    .bind(range.and_then(|r| r.lower_bound()))
    .bind(range.map(|r| r.end()))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Posts dated on or after `since`, newest first. These are the posts still
/// collecting metrics.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_posts_since(pool: &PgPool, since: NaiveDate) -> Result<Vec<PostRow>, DbError> {
    let rows = sqlx::query_as::<_, PostRow>(&format!(
        "SELECT {POST_COLUMNS} FROM posts \
         WHERE post_date >= $1 \
         ORDER BY post_date DESC, id DESC"
    ))
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
