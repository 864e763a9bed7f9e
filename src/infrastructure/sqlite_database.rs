use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::DatabaseConfig;
use crate::core::{PageId, Slug};
use crate::error::{AppError, AppResult};
use crate::hooks::{create_default_hook_registry, HookContext, HookOperation, HookRegistry};
use crate::infrastructure::database::PageRepository;
use crate::models::{
    CollectionStats, NewPage, Page, PageChanges, PageDraft, PageFields, PageFilter, Seo,
};

const PAGE_COLUMNS: &str = "id, title, slug, content, sort_order, is_published, published_at, \
                            is_homepage, seo, created_at, updated_at";

/// SQLite-backed page repository.
///
/// Writes are serialized by `write_lock` and each runs in one transaction:
/// read the collection stats, run the hooks, write. Any error drops the
/// transaction, which rolls it back.
pub struct SqlitePageRepository {
    pool: SqlitePool,
    hooks: HookRegistry,
    write_lock: Mutex<()>,
}

impl SqlitePageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_hooks(pool, create_default_hook_registry())
    }

    pub fn with_hooks(pool: SqlitePool, hooks: HookRegistry) -> Self {
        Self {
            pool,
            hooks,
            write_lock: Mutex::new(()),
        }
    }

    /// Open (creating if needed) the database described by `config` and
    /// make sure the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        if is_in_memory(&config.url) {
            return Self::new_in_memory().await;
        }
        ensure_parent_dir(&config.url).await?;

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| {
                AppError::Configuration(format!("Invalid DATABASE_URL {}: {}", config.url, e))
            })?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to connect to {}: {}", config.url, e))
            })?;

        let repository = Self::new(pool);
        repository.initialize().await?;
        info!(url = %config.url, "page store ready");
        Ok(repository)
    }

    /// Single-connection in-memory store, used by tests and `sqlite::memory:`.
    pub async fn new_in_memory() -> AppResult<Self> {
        // Every connection gets its own in-memory database, so keep exactly one alive.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to connect to in-memory SQLite: {}", e))
            })?;

        let repository = Self::new(pool);
        repository.initialize().await?;
        Ok(repository)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the pages table and its indexes
    pub async fn initialize(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                slug TEXT NOT NULL,
                content TEXT,
                sort_order INTEGER NOT NULL DEFAULT 0,
                is_published INTEGER NOT NULL DEFAULT 0,
                published_at TEXT,
                is_homepage INTEGER NOT NULL DEFAULT 0,
                seo TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create pages table: {}", e)))?;

        sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS idx_pages_slug ON pages(slug)")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create slug index: {}", e)))?;

        // At most one row may carry the homepage flag.
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_pages_single_homepage ON pages(is_homepage) WHERE is_homepage = 1",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create homepage index: {}", e)))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pages_published_order ON pages(is_published, sort_order, id)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to create ordering index: {}", e)))?;

        Ok(())
    }

    async fn collection_stats(conn: &mut SqliteConnection) -> AppResult<CollectionStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COALESCE(SUM(is_homepage), 0) AS homepages, MAX(sort_order) AS max_order FROM pages",
        )
        .fetch_one(&mut *conn)
        .await?;

        Ok(CollectionStats {
            total: row.try_get("total")?,
            homepages: row.try_get("homepages")?,
            max_order: row.try_get("max_order")?,
        })
    }

    async fn fetch(conn: &mut SqliteConnection, id: PageId) -> AppResult<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS))
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn fetch_existing(conn: &mut SqliteConnection, id: PageId) -> AppResult<Page> {
        Self::fetch(conn, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Page {} not found", id)))
    }

    async fn ensure_slug_available(
        conn: &mut SqliteConnection,
        slug: &Slug,
        except: Option<PageId>,
    ) -> AppResult<()> {
        let taken = sqlx::query("SELECT 1 FROM pages WHERE slug = ? AND id IS NOT ?")
            .bind(slug.as_str())
            .bind(except.map(PageId::value))
            .fetch_optional(&mut *conn)
            .await?;
        if taken.is_some() {
            return Err(AppError::Validation(format!(
                "The slug '{}' has already been taken",
                slug
            )));
        }
        Ok(())
    }

    /// Clear the homepage flag on every page except `keep`.
    async fn demote_homepages(
        conn: &mut SqliteConnection,
        keep: Option<PageId>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE pages SET is_homepage = 0, updated_at = ? WHERE is_homepage = 1 AND id IS NOT ?",
        )
        .bind(now)
        .bind(keep.map(PageId::value))
        .execute(&mut *conn)
        .await?;
        debug!(demoted = result.rows_affected(), "cleared previous homepage");
        Ok(())
    }

    async fn fetch_many(&self, sql: &str) -> AppResult<Vec<Page>> {
        let rows = sqlx::query(sql).fetch_all(&self.pool).await?;
        rows.iter().map(page_from_row).collect()
    }
}

#[async_trait]
impl PageRepository for SqlitePageRepository {
    async fn create(&self, page: NewPage) -> AppResult<Page> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let stats = Self::collection_stats(&mut tx).await?;
        let ctx = HookContext::new(HookOperation::Create, stats);
        let mut draft = PageDraft::from(page);
        self.hooks.run_before_create(&ctx, &mut draft)?;
        let fields = draft.into_fields()?;

        Self::ensure_slug_available(&mut tx, &fields.slug, None).await?;
        if fields.is_homepage && stats.homepages > 0 {
            Self::demote_homepages(&mut tx, None, ctx.now).await?;
        }

        let seo = encode_seo(&fields)?;
        let result = sqlx::query(
            "INSERT INTO pages (title, slug, content, sort_order, is_published, published_at, is_homepage, seo, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.title)
        .bind(fields.slug.as_str())
        .bind(fields.content.as_deref())
        .bind(fields.order)
        .bind(fields.is_published)
        .bind(fields.published_at)
        .bind(fields.is_homepage)
        .bind(seo)
        .bind(ctx.now)
        .bind(ctx.now)
        .execute(&mut *tx)
        .await?;

        let id = PageId::new(result.last_insert_rowid());
        let created = Self::fetch_existing(&mut tx, id).await?;
        tx.commit().await?;

        info!(page_id = %id, slug = %created.slug, is_homepage = created.is_homepage, "created page");
        Ok(created)
    }

    async fn update(&self, id: PageId, changes: PageChanges) -> AppResult<Page> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let current = Self::fetch_existing(&mut tx, id).await?;
        let stats = Self::collection_stats(&mut tx).await?;
        let ctx = HookContext::new(HookOperation::Update, stats);
        let mut draft = PageDraft::from_page(&current).apply(changes);
        self.hooks.run_before_update(&ctx, &current, &mut draft)?;
        let fields = draft.into_fields()?;

        if fields.slug != current.slug {
            Self::ensure_slug_available(&mut tx, &fields.slug, Some(id)).await?;
        }
        if fields.is_homepage && !current.is_homepage {
            Self::demote_homepages(&mut tx, Some(id), ctx.now).await?;
        }

        let seo = encode_seo(&fields)?;
        sqlx::query(
            "UPDATE pages SET title = ?, slug = ?, content = ?, sort_order = ?, is_published = ?, \
             published_at = ?, is_homepage = ?, seo = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&fields.title)
        .bind(fields.slug.as_str())
        .bind(fields.content.as_deref())
        .bind(fields.order)
        .bind(fields.is_published)
        .bind(fields.published_at)
        .bind(fields.is_homepage)
        .bind(seo)
        .bind(ctx.now)
        .bind(id.value())
        .execute(&mut *tx)
        .await?;

        let updated = Self::fetch_existing(&mut tx, id).await?;
        tx.commit().await?;

        info!(page_id = %id, slug = %updated.slug, "updated page");
        Ok(updated)
    }

    async fn delete(&self, id: PageId) -> AppResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let page = Self::fetch_existing(&mut tx, id).await?;
        let stats = Self::collection_stats(&mut tx).await?;
        let ctx = HookContext::new(HookOperation::Delete, stats);
        self.hooks.run_before_delete(&ctx, &page)?;

        sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id.value())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(page_id = %id, slug = %page.slug, "deleted page");
        Ok(())
    }

    async fn set_as_homepage(&self, id: PageId) -> AppResult<Page> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let page = Self::fetch_existing(&mut tx, id).await?;
        if page.is_homepage {
            return Ok(page);
        }

        let now = Utc::now();
        Self::demote_homepages(&mut tx, Some(id), now).await?;
        sqlx::query("UPDATE pages SET is_homepage = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.value())
            .execute(&mut *tx)
            .await?;

        let promoted = Self::fetch_existing(&mut tx, id).await?;
        tx.commit().await?;

        info!(page_id = %id, slug = %promoted.slug, "set page as homepage");
        Ok(promoted)
    }

    async fn find(&self, id: PageId) -> AppResult<Option<Page>> {
        let mut conn = self.pool.acquire().await?;
        Self::fetch(&mut conn, id).await
    }

    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {} FROM pages WHERE slug = ?", PAGE_COLUMNS))
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn find_homepage(&self) -> AppResult<Option<Page>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE is_homepage = 1 ORDER BY id LIMIT 1",
            PAGE_COLUMNS
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn count_all(&self) -> AppResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS total FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn max_order(&self) -> AppResult<Option<i64>> {
        let row = sqlx::query("SELECT MAX(sort_order) AS max_order FROM pages")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("max_order")?)
    }

    async fn list(&self, filter: PageFilter) -> AppResult<Vec<Page>> {
        let sql = match filter {
            PageFilter::All => format!("SELECT {} FROM pages ORDER BY sort_order, id", PAGE_COLUMNS),
            PageFilter::Published => format!(
                "SELECT {} FROM pages WHERE is_published = 1 ORDER BY sort_order, id",
                PAGE_COLUMNS
            ),
        };
        self.fetch_many(&sql).await
    }
}

fn page_from_row(row: &SqliteRow) -> AppResult<Page> {
    let slug: String = row.try_get("slug")?;
    let seo: Option<String> = row.try_get("seo")?;

    Ok(Page {
        id: PageId::new(row.try_get("id")?),
        title: row.try_get("title")?,
        slug: Slug::parse(&slug)
            .map_err(|_| AppError::Database(format!("Stored slug '{}' is malformed", slug)))?,
        content: row.try_get("content")?,
        order: row.try_get("sort_order")?,
        is_published: row.try_get("is_published")?,
        published_at: row.try_get("published_at")?,
        is_homepage: row.try_get("is_homepage")?,
        seo: seo
            .map(|raw| serde_json::from_str::<Seo>(&raw))
            .transpose()
            .map_err(|e| AppError::Database(format!("Stored SEO data is malformed: {}", e)))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn encode_seo(fields: &PageFields) -> AppResult<Option<String>> {
    Ok(fields.seo.as_ref().map(serde_json::to_string).transpose()?)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// `create_if_missing` creates the file but not its directory.
async fn ensure_parent_dir(url: &str) -> AppResult<()> {
    let path = url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");
    let path = path.split('?').next().unwrap_or_default();

    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Configuration(format!(
                    "Cannot create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{CANNOT_DELETE_HOMEPAGE, HOMEPAGE_REQUIRED};
    use serde_json::json;

    async fn repo() -> SqlitePageRepository {
        SqlitePageRepository::new_in_memory().await.unwrap()
    }

    async fn homepage_ids(repo: &SqlitePageRepository) -> Vec<PageId> {
        repo.list(PageFilter::All)
            .await
            .unwrap()
            .into_iter()
            .filter(|page| page.is_homepage)
            .map(|page| page.id)
            .collect()
    }

    #[tokio::test]
    async fn test_first_page_is_homepage() {
        let repo = repo().await;
        let first = repo.create(NewPage::new("First Page")).await.unwrap();
        assert!(first.is_homepage);
        assert_eq!(first.order, 1);
        assert_eq!(first.slug.as_str(), "first-page");

        let second = repo.create(NewPage::new("Second Page")).await.unwrap();
        assert!(!second.is_homepage);
        assert_eq!(second.order, 2);
    }

    #[tokio::test]
    async fn test_order_continues_from_max() {
        let repo = repo().await;
        repo.create(NewPage::new("A").order(5)).await.unwrap();
        repo.create(NewPage::new("B").order(10)).await.unwrap();
        let next = repo.create(NewPage::new("New Page")).await.unwrap();
        assert_eq!(next.order, 11);
        assert_eq!(repo.max_order().await.unwrap(), Some(11));
    }

    #[tokio::test]
    async fn test_duplicate_slug_rejected() {
        let repo = repo().await;
        repo.create(NewPage::new("About").slug("about")).await.unwrap();
        let err = repo
            .create(NewPage::new("About again").slug("about"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(repo.count_all().await.unwrap(), 1);

        let other = repo.create(NewPage::new("Contact")).await.unwrap();
        let err = repo
            .update(other.id, PageChanges::default().slug("about"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_unset_only_homepage_rejected_and_unchanged() {
        let repo = repo().await;
        let home = repo.create(NewPage::new("Home").homepage(true)).await.unwrap();
        repo.create(NewPage::new("Other")).await.unwrap();

        let err = repo
            .update(
                home.id,
                PageChanges::default().title("Changed").homepage(false),
            )
            .await
            .unwrap_err();
        match err {
            AppError::HomepageRequired(msg) => assert_eq!(msg, HOMEPAGE_REQUIRED),
            other => panic!("unexpected error: {:?}", other),
        }

        let reloaded = repo.find(home.id).await.unwrap().unwrap();
        assert!(reloaded.is_homepage);
        assert_eq!(reloaded.title, "Home");
    }

    #[tokio::test]
    async fn test_delete_homepage_rejected_while_others_exist() {
        let repo = repo().await;
        let home = repo.create(NewPage::new("Home").homepage(true)).await.unwrap();
        let other = repo.create(NewPage::new("Other")).await.unwrap();

        let err = repo.delete(home.id).await.unwrap_err();
        assert!(matches!(err, AppError::HomepageRequired(ref msg) if msg == CANNOT_DELETE_HOMEPAGE));
        assert!(repo.find(home.id).await.unwrap().is_some());

        repo.delete(other.id).await.unwrap();
        repo.delete(home.id).await.unwrap();
        assert_eq!(repo.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_missing_page() {
        let repo = repo().await;
        let err = repo.delete(PageId::new(99)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_set_as_homepage_swaps_flag() {
        let repo = repo().await;
        let first = repo.create(NewPage::new("First")).await.unwrap();
        let second = repo.create(NewPage::new("Second")).await.unwrap();

        let promoted = repo.set_as_homepage(second.id).await.unwrap();
        assert!(promoted.is_homepage);
        assert!(!repo.find(first.id).await.unwrap().unwrap().is_homepage);
        assert_eq!(homepage_ids(&repo).await, vec![second.id]);

        // Already the homepage.
        let again = repo.set_as_homepage(second.id).await.unwrap();
        assert!(again.is_homepage);
        assert_eq!(homepage_ids(&repo).await, vec![second.id]);
    }

    #[tokio::test]
    async fn test_explicit_homepage_demotes_previous() {
        let repo = repo().await;
        let first = repo.create(NewPage::new("First")).await.unwrap();
        let second = repo.create(NewPage::new("Second").homepage(true)).await.unwrap();
        assert_eq!(homepage_ids(&repo).await, vec![second.id]);

        repo.update(first.id, PageChanges::default().homepage(true))
            .await
            .unwrap();
        assert_eq!(homepage_ids(&repo).await, vec![first.id]);
        assert_eq!(repo.find_homepage().await.unwrap().unwrap().id, first.id);
    }

    #[tokio::test]
    async fn test_publish_timestamps() {
        let repo = repo().await;
        let page = repo.create(NewPage::new("Draft")).await.unwrap();
        assert!(page.published_at.is_none());

        let published = repo
            .update(page.id, PageChanges::default().published(true))
            .await
            .unwrap();
        assert!(published.published_at.is_some());

        let retitled = repo
            .update(page.id, PageChanges::default().title("Renamed"))
            .await
            .unwrap();
        assert_eq!(retitled.published_at, published.published_at);

        let unpublished = repo
            .update(page.id, PageChanges::default().published(false))
            .await
            .unwrap();
        assert!(unpublished.published_at.is_none());
    }

    #[tokio::test]
    async fn test_seo_persisted_in_nested_shape() {
        let repo = repo().await;
        let seo: Seo = serde_json::from_value(json!({
            "meta_title": "Custom Meta Title",
            "og_title": "Custom OG Title",
            "schema_type": "Article"
        }))
        .unwrap();
        let page = repo.create(NewPage::new("Seo").seo(seo.clone())).await.unwrap();
        assert_eq!(page.seo.as_ref(), Some(&seo));

        let raw: String = sqlx::query_scalar("SELECT seo FROM pages WHERE id = ?")
            .bind(page.id.value())
            .fetch_one(repo.pool())
            .await
            .unwrap();
        let stored: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(stored["meta"]["title"], json!("Custom Meta Title"));

        let cleared = repo
            .update(page.id, PageChanges::default().seo(None))
            .await
            .unwrap();
        assert!(cleared.seo.is_none());
    }

    #[tokio::test]
    async fn test_list_orders_by_order_then_id() {
        let repo = repo().await;
        repo.create(NewPage::new("C").order(3).published(true)).await.unwrap();
        repo.create(NewPage::new("A").order(1).published(true)).await.unwrap();
        repo.create(NewPage::new("B").order(1)).await.unwrap();

        let all: Vec<String> = repo
            .list(PageFilter::All)
            .await
            .unwrap()
            .into_iter()
            .map(|page| page.title)
            .collect();
        assert_eq!(all, vec!["A", "B", "C"]);

        let published: Vec<String> = repo
            .list(PageFilter::Published)
            .await
            .unwrap()
            .into_iter()
            .map(|page| page.title)
            .collect();
        assert_eq!(published, vec!["A", "C"]);
    }

    #[tokio::test]
    async fn test_update_missing_page() {
        let repo = repo().await;
        let err = repo
            .update(PageId::new(5), PageChanges::default().title("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_in_memory_detection() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite:file:pages?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite:data/pages.db"));
    }
}
