// Page Hooks - pre-commit logic run by the repository around every page mutation
//
// Hooks run inside the write transaction, after the collection stats were
// read and before anything is written. An error aborts the mutation.

pub mod page_hooks;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::{
    error::AppResult,
    models::{CollectionStats, Page, PageDraft},
};

pub use page_hooks::{
    create_default_hook_registry, HomepageHook, OrderHook, PublishHook, SlugHook, ValidationHook,
    CANNOT_DELETE_HOMEPAGE, HOMEPAGE_REQUIRED,
};

/// Types of operations that can trigger hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOperation {
    Create,
    Update,
    Delete,
}

/// Read-only state shared by every hook of one mutation
#[derive(Debug, Clone, Copy)]
pub struct HookContext {
    pub operation: HookOperation,
    pub stats: CollectionStats,
    pub now: DateTime<Utc>,
}

impl HookContext {
    pub fn new(operation: HookOperation, stats: CollectionStats) -> Self {
        Self {
            operation,
            stats,
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }
}

/// Trait for implementing page hooks. Every method defaults to a no-op.
pub trait PageHook: Send + Sync {
    /// Hook name for debugging
    fn name(&self) -> &str;

    fn before_create(&self, _ctx: &HookContext, _draft: &mut PageDraft) -> AppResult<()> {
        Ok(())
    }

    /// `current` is the persisted snapshot, `draft` the proposed one. A field
    /// is dirty when the two differ.
    fn before_update(
        &self,
        _ctx: &HookContext,
        _current: &Page,
        _draft: &mut PageDraft,
    ) -> AppResult<()> {
        Ok(())
    }

    fn before_delete(&self, _ctx: &HookContext, _page: &Page) -> AppResult<()> {
        Ok(())
    }
}

/// Ordered hook chain
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Box<dyn PageHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hooks run in registration order.
    pub fn register_hook(&mut self, hook: Box<dyn PageHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn run_before_create(&self, ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        for hook in &self.hooks {
            debug!(hook = hook.name(), "running create hook");
            hook.before_create(ctx, draft)?;
        }
        Ok(())
    }

    pub fn run_before_update(
        &self,
        ctx: &HookContext,
        current: &Page,
        draft: &mut PageDraft,
    ) -> AppResult<()> {
        for hook in &self.hooks {
            debug!(hook = hook.name(), page_id = %current.id, "running update hook");
            hook.before_update(ctx, current, draft)?;
        }
        Ok(())
    }

    pub fn run_before_delete(&self, ctx: &HookContext, page: &Page) -> AppResult<()> {
        for hook in &self.hooks {
            debug!(hook = hook.name(), page_id = %page.id, "running delete hook");
            hook.before_delete(ctx, page)?;
        }
        Ok(())
    }
}
