// Page Repository Interface - persistence boundary for pages
// Every write runs the page hooks and commits inside a single transaction.

use async_trait::async_trait;

use crate::core::PageId;
use crate::error::AppResult;
use crate::models::{NewPage, Page, PageChanges, PageFilter};

/// Page repository trait. Reads never run hooks; writes always do.
#[async_trait]
pub trait PageRepository: Send + Sync {
    /// Insert a page after applying create defaults.
    async fn create(&self, page: NewPage) -> AppResult<Page>;

    /// Apply a partial update. Rejected updates leave the page untouched.
    async fn update(&self, id: PageId, changes: PageChanges) -> AppResult<Page>;

    async fn delete(&self, id: PageId) -> AppResult<()>;

    /// Make `id` the only homepage. No-op if it already is.
    async fn set_as_homepage(&self, id: PageId) -> AppResult<Page>;

    async fn find(&self, id: PageId) -> AppResult<Option<Page>>;
    async fn find_by_slug(&self, slug: &str) -> AppResult<Option<Page>>;
    async fn find_homepage(&self) -> AppResult<Option<Page>>;
    async fn count_all(&self) -> AppResult<i64>;
    async fn max_order(&self) -> AppResult<Option<i64>>;

    /// Pages in navigation order: `order`, then `id`.
    async fn list(&self, filter: PageFilter) -> AppResult<Vec<Page>>;
}
