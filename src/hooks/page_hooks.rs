// Built-in page hooks: field defaults, the single-homepage rule, publish
// timestamps and input validation.

use tracing::warn;

use crate::{
    core::{Slug, MAX_SLUG_LEN},
    error::{AppError, AppResult},
    hooks::{HookContext, HookRegistry, PageHook},
    models::{Page, PageDraft},
};

pub const HOMEPAGE_REQUIRED: &str = "At least one page must be marked as the homepage.";
pub const CANNOT_DELETE_HOMEPAGE: &str =
    "Cannot delete the homepage. Please set another page as homepage first.";

const MAX_TITLE_LEN: usize = 255;

/// First path segments owned by the application router.
pub const RESERVED_SLUGS: &[&str] = &["admin", "health"];

/// Derives a missing slug from the title on create. Never touches an existing slug.
pub struct SlugHook;

impl PageHook for SlugHook {
    fn name(&self) -> &str {
        "slug_hook"
    }

    fn before_create(&self, _ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        if draft.slug.trim().is_empty() {
            draft.slug = Slug::from_title(&draft.title)
                .map(Slug::into_string)
                .unwrap_or_default();
        }
        Ok(())
    }
}

/// Appends new pages to the end of the navigation order.
pub struct OrderHook;

impl PageHook for OrderHook {
    fn name(&self) -> &str {
        "order_hook"
    }

    fn before_create(&self, ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        if draft.order.is_none() {
            draft.order = Some(ctx.stats.max_order.map_or(1, |max| max + 1));
        }
        Ok(())
    }
}

/// Keeps exactly one homepage once any page exists.
pub struct HomepageHook;

impl PageHook for HomepageHook {
    fn name(&self) -> &str {
        "homepage_hook"
    }

    fn before_create(&self, ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        // The first page always becomes the homepage.
        if ctx.stats.total == 0 {
            draft.is_homepage = Some(true);
        } else if draft.is_homepage.is_none() {
            draft.is_homepage = Some(false);
        }
        Ok(())
    }

    fn before_update(
        &self,
        ctx: &HookContext,
        current: &Page,
        draft: &mut PageDraft,
    ) -> AppResult<()> {
        let unsetting = current.is_homepage && draft.is_homepage == Some(false);
        if unsetting && ctx.stats.homepages == 1 {
            warn!(page_id = %current.id, "rejected removing homepage status from the only homepage");
            return Err(AppError::HomepageRequired(HOMEPAGE_REQUIRED.to_string()));
        }
        Ok(())
    }

    fn before_delete(&self, ctx: &HookContext, page: &Page) -> AppResult<()> {
        if page.is_homepage && ctx.stats.homepages == 1 && ctx.stats.total > 1 {
            warn!(page_id = %page.id, "rejected deleting the homepage while other pages exist");
            return Err(AppError::HomepageRequired(CANNOT_DELETE_HOMEPAGE.to_string()));
        }
        Ok(())
    }
}

/// Stamps `published_at` on publish and clears it on unpublish.
pub struct PublishHook;

impl PageHook for PublishHook {
    fn name(&self) -> &str {
        "publish_hook"
    }

    fn before_create(&self, ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        if draft.is_published && draft.published_at.is_none() {
            draft.published_at = Some(ctx.now);
        }
        Ok(())
    }

    fn before_update(
        &self,
        ctx: &HookContext,
        current: &Page,
        draft: &mut PageDraft,
    ) -> AppResult<()> {
        match (current.is_published, draft.is_published) {
            (false, true) if draft.published_at.is_none() => draft.published_at = Some(ctx.now),
            (true, false) => draft.published_at = None,
            _ => {}
        }
        Ok(())
    }
}

/// Validates the resolved draft. Registered last so it sees the defaults.
pub struct ValidationHook;

impl PageHook for ValidationHook {
    fn name(&self) -> &str {
        "validation_hook"
    }

    fn before_create(&self, _ctx: &HookContext, draft: &mut PageDraft) -> AppResult<()> {
        self.validate(draft)
    }

    fn before_update(
        &self,
        _ctx: &HookContext,
        _current: &Page,
        draft: &mut PageDraft,
    ) -> AppResult<()> {
        self.validate(draft)
    }
}

impl ValidationHook {
    fn validate(&self, draft: &mut PageDraft) -> AppResult<()> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(AppError::Validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }
        draft.title = title.to_string();

        if draft.slug.is_empty() {
            return Err(AppError::Validation(
                "Slug is required and could not be derived from the title".to_string(),
            ));
        }
        if draft.slug.len() > MAX_SLUG_LEN {
            return Err(AppError::Validation(format!(
                "Slug must be at most {} characters",
                MAX_SLUG_LEN
            )));
        }
        Slug::parse(&draft.slug)?;
        if RESERVED_SLUGS.contains(&draft.slug.as_str()) {
            return Err(AppError::Validation(format!(
                "The slug '{}' is reserved",
                draft.slug
            )));
        }

        draft.seo = draft.seo.take().and_then(|seo| seo.compact());
        if let Some(seo) = &draft.seo {
            seo.validate()?;
        }
        Ok(())
    }
}

/// Create default hook registry with the page invariants
pub fn create_default_hook_registry() -> HookRegistry {
    let mut registry = HookRegistry::new();
    registry.register_hook(Box::new(SlugHook));
    registry.register_hook(Box::new(OrderHook));
    registry.register_hook(Box::new(HomepageHook));
    registry.register_hook(Box::new(PublishHook));
    registry.register_hook(Box::new(ValidationHook));
    registry
}
