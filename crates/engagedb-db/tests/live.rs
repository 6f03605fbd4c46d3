//! Live integration tests for engagedb-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/engagedb-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::NaiveDate;
use engagedb_core::{DateRange, Platform, PostMetrics, RegressionPolicy};
use engagedb_db::{
    delete_post, get_active_formula, get_post, insert_and_activate_formula, insert_post,
    latest_follower_sample, list_follower_samples, list_formula_history, list_posts,
    list_posts_since, set_post_target, update_post_metrics, upsert_follower_sample, DbError,
    NewPost, PgStore,
};
use engagedb_engine::{
    activate_formula, apply_metric_updates, EngagementCalculator, EngagementStore, MetricUpdate,
    UpdateOptions,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn new_post(title: &str, platform: Platform, posted: NaiveDate, metrics: PostMetrics) -> NewPost {
    NewPost {
        platform,
        title: title.to_string(),
        post_url: None,
        post_date: posted,
        metrics,
    }
}

fn views(n: i64) -> PostMetrics {
    PostMetrics {
        view: Some(n),
        ..PostMetrics::default()
    }
}

// ---------------------------------------------------------------------------
// Section 1: Posts
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn insert_post_dedupes_titles(pool: sqlx::PgPool) {
    let today = date(2024, 4, 10);
    let post = new_post("Launch", Platform::Tiktok, today, views(10));

    let first = insert_post(&pool, &post, today).await.expect("first insert");
    let second = insert_post(&pool, &post, today).await.expect("second insert");
    let third = insert_post(&pool, &post, today).await.expect("third insert");

    assert_eq!(first.title, "Launch");
    assert_eq!(second.title, "Launch1");
    assert_eq!(third.title, "Launch2");
    assert_eq!(first.report_date, today);
}

#[sqlx::test(migrations = "../../migrations")]
async fn update_post_metrics_keeps_unsupplied_columns(pool: sqlx::PgPool) {
    let posted = date(2024, 4, 1);
    let row = insert_post(
        &pool,
        &new_post(
            "metrics",
            Platform::Instagram,
            posted,
            PostMetrics {
                view: Some(100),
                like: Some(5),
                ..PostMetrics::default()
            },
        ),
        posted,
    )
    .await
    .expect("insert");

    let update = PostMetrics {
        like: Some(9),
        save: Some(2),
        ..PostMetrics::default()
    };
    let updated = update_post_metrics(&pool, row.id, &update)
        .await
        .expect("update")
        .expect("post exists");

    assert_eq!(updated.view_count, Some(100));
    assert_eq!(updated.like_count, Some(9));
    assert_eq!(updated.save_count, Some(2));
    assert_eq!(updated.comment_count, None);

    let missing = update_post_metrics(&pool, 9_999, &update)
        .await
        .expect("update of missing post");
    assert!(missing.is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn negative_counts_violate_check_constraint(pool: sqlx::PgPool) {
    let posted = date(2024, 4, 1);
    let result = insert_post(
        &pool,
        &new_post(
            "negative",
            Platform::Tiktok,
            posted,
            PostMetrics {
                like: Some(-1),
                ..PostMetrics::default()
            },
        ),
        posted,
    )
    .await;
    assert!(matches!(result, Err(DbError::Sqlx(_))));
}

#[sqlx::test(migrations = "../../migrations")]
async fn list_posts_filters_and_orders(pool: sqlx::PgPool) {
    for (title, platform, posted) in [
        ("c", Platform::Tiktok, date(2024, 1, 3)),
        ("a", Platform::Tiktok, date(2024, 1, 1)),
        ("b", Platform::Youtube, date(2024, 1, 2)),
        ("z", Platform::Tiktok, date(2024, 2, 1)),
    ] {
        insert_post(&pool, &new_post(title, platform, posted, views(1)), posted)
            .await
            .expect("insert");
    }

    let january = DateRange::new(date(2024, 1, 1), date(2024, 1, 31)).unwrap();
    let all = list_posts(&pool, None, Some(january)).await.expect("list");
    let titles: Vec<&str> = all.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["a", "b", "c"]);

    let tiktok = list_posts(&pool, Some(Platform::Tiktok), Some(january))
        .await
        .expect("list tiktok");
    assert_eq!(tiktok.len(), 2);

    let recent = list_posts_since(&pool, date(2024, 1, 2))
        .await
        .expect("list since");
    let titles: Vec<&str> = recent.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["z", "c", "b"]);
}

#[sqlx::test(migrations = "../../migrations")]
async fn targets_and_deletion(pool: sqlx::PgPool) {
    let posted = date(2024, 4, 1);
    let row = insert_post(&pool, &new_post("t", Platform::Tiktok, posted, views(1)), posted)
        .await
        .expect("insert");

    set_post_target(&pool, row.id, Some(3.5), Some(date(2024, 4, 2)))
        .await
        .expect("set target");
    let stored = get_post(&pool, row.id).await.expect("get").expect("exists");
    assert_eq!(stored.target_engagement, Some(3.5));
    assert_eq!(stored.target_achieved_date, Some(date(2024, 4, 2)));

    let missing = set_post_target(&pool, 9_999, Some(1.0), None).await;
    assert!(matches!(missing, Err(DbError::NotFound)));

    delete_post(&pool, row.id).await.expect("delete");
    assert!(get_post(&pool, row.id).await.expect("get").is_none());
    assert!(matches!(
        delete_post(&pool, row.id).await,
        Err(DbError::NotFound)
    ));
}

// ---------------------------------------------------------------------------
// Section 2: Follower samples
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn follower_sample_is_one_per_platform_month(pool: sqlx::PgPool) {
    upsert_follower_sample(&pool, Platform::Tiktok, 1_000, date(2024, 3, 5))
        .await
        .expect("first sample");
    upsert_follower_sample(&pool, Platform::Tiktok, 1_200, date(2024, 3, 20))
        .await
        .expect("same month");
    upsert_follower_sample(&pool, Platform::Tiktok, 1_500, date(2024, 4, 2))
        .await
        .expect("next month");
    upsert_follower_sample(&pool, Platform::Youtube, 80, date(2024, 3, 9))
        .await
        .expect("other platform");

    let tiktok = list_follower_samples(&pool, Some(Platform::Tiktok), None)
        .await
        .expect("list");
    assert_eq!(tiktok.len(), 2);
    assert_eq!(tiktok[0].follower_count, 1_200);
    assert_eq!(tiktok[0].recorded_date, date(2024, 3, 20));

    let latest = latest_follower_sample(&pool, Platform::Tiktok, date(2024, 3, 31))
        .await
        .expect("latest")
        .expect("sample exists");
    assert_eq!(latest.follower_count, 1_200);

    let none = latest_follower_sample(&pool, Platform::Tiktok, date(2024, 3, 1))
        .await
        .expect("latest before first");
    assert!(none.is_none());
}

// ---------------------------------------------------------------------------
// Section 3: Formulas
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn activating_formula_moves_pointer(pool: sqlx::PgPool) {
    assert!(get_active_formula(&pool).await.expect("active").is_none());

    let first = insert_and_activate_formula(&pool, "v1", "like / view * 100")
        .await
        .expect("first");
    let second = insert_and_activate_formula(&pool, "v2", "(like + save) / view * 100")
        .await
        .expect("second");

    let active = get_active_formula(&pool)
        .await
        .expect("active")
        .expect("one active");
    assert_eq!(active.id, second.id);

    let history = list_formula_history(&pool).await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second.id);
    assert!(history[0].is_active);
    assert_eq!(history[1].id, first.id);
    assert!(!history[1].is_active);
}

// ---------------------------------------------------------------------------
// Section 4: Engine over PgStore
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn batch_update_through_pg_store(pool: sqlx::PgPool) {
    let store = PgStore::new(pool.clone());
    let posted = date(2024, 4, 1);
    let row = insert_post(
        &pool,
        &new_post("batch", Platform::Tiktok, posted, views(100)),
        posted,
    )
    .await
    .expect("insert");
    set_post_target(&pool, row.id, Some(10.0), None)
        .await
        .expect("target");

    activate_formula(&store, "followers", "like / follower * 100")
        .await
        .expect("activate");
    let calc = EngagementCalculator::load(&store).await.expect("load");

    let updates = vec![
        MetricUpdate {
            post_id: row.id,
            metrics: PostMetrics {
                like: Some(50),
                ..PostMetrics::default()
            },
            follower: Some(400),
        },
        MetricUpdate {
            post_id: 9_999,
            metrics: views(1),
            follower: None,
        },
    ];
    let options = UpdateOptions {
        today: date(2024, 4, 5),
        regression: RegressionPolicy::Sticky,
    };
    let report = apply_metric_updates(&store, &calc, &updates, options).await;

    assert_eq!(report.updated, 1);
    assert_eq!(report.recomputed, 1);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].post_id, 9_999);

    let stored = store
        .get_post(row.id)
        .await
        .expect("get")
        .expect("exists");
    assert_eq!(stored.metrics.like, Some(50));
    assert_eq!(stored.target_achieved_date, Some(date(2024, 4, 5)));

    let sample = latest_follower_sample(&pool, Platform::Tiktok, date(2024, 4, 30))
        .await
        .expect("latest")
        .expect("recorded");
    assert_eq!(sample.follower_count, 400);
}
