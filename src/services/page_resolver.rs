// PageResolver - maps a public request path to a page, a redirect, or not-found

use std::sync::Arc;
use tracing::debug;

use crate::{
    error::{AppError, AppResult},
    infrastructure::PageRepository,
    models::Page,
    views::{TemplateRef, ViewSelector},
};

/// A page ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPage {
    pub page: Page,
    pub template: TemplateRef,
}

impl ResolvedPage {
    pub fn is_homepage(&self) -> bool {
        self.page.is_homepage
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Render(ResolvedPage),
    Redirect(String),
}

/// Stateless: every call reads the current collection.
#[derive(Clone)]
pub struct PageResolver {
    repository: Arc<dyn PageRepository>,
    views: Arc<dyn ViewSelector>,
}

impl PageResolver {
    pub fn new(repository: Arc<dyn PageRepository>, views: Arc<dyn ViewSelector>) -> Self {
        Self { repository, views }
    }

    /// `/` - the published homepage. An unpublished homepage is not found.
    pub async fn resolve_root(&self) -> AppResult<ResolvedPage> {
        let page = self
            .repository
            .find_homepage()
            .await?
            .filter(|page| page.is_published)
            .ok_or_else(|| AppError::NotFound("No published homepage".to_string()))?;

        debug!(page_id = %page.id, "resolved homepage");
        Ok(self.select_view(page))
    }

    /// `/{slug}` - a published page. The homepage redirects to `/`.
    pub async fn resolve_slug(&self, slug: &str) -> AppResult<Resolution> {
        let page = self
            .repository
            .find_by_slug(slug)
            .await?
            .filter(|page| page.is_published)
            .ok_or_else(|| AppError::NotFound(format!("No published page at /{}", slug)))?;

        if page.is_homepage {
            debug!(slug, "homepage requested by slug, redirecting to /");
            return Ok(Resolution::Redirect("/".to_string()));
        }

        debug!(page_id = %page.id, slug, "resolved page");
        Ok(Resolution::Render(self.select_view(page)))
    }

    fn select_view(&self, page: Page) -> ResolvedPage {
        let template = self.views.resolve_template(page.slug.as_str());
        ResolvedPage { page, template }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqlitePageRepository;
    use crate::models::{NewPage, PageChanges};
    use std::path::PathBuf;

    struct FixedViews;

    impl ViewSelector for FixedViews {
        fn resolve_template(&self, slug_hint: &str) -> TemplateRef {
            if slug_hint == "custom" {
                TemplateRef::Custom {
                    name: "pages.custom".into(),
                    path: PathBuf::from("pages/custom.hbs"),
                }
            } else {
                TemplateRef::Default
            }
        }
    }

    async fn setup() -> (Arc<SqlitePageRepository>, PageResolver) {
        let repo = Arc::new(SqlitePageRepository::new_in_memory().await.unwrap());
        let resolver = PageResolver::new(repo.clone(), Arc::new(FixedViews));
        (repo, resolver)
    }

    #[tokio::test]
    async fn test_root_requires_published_homepage() {
        let (repo, resolver) = setup().await;
        assert!(matches!(resolver.resolve_root().await, Err(AppError::NotFound(_))));

        let home = repo.create(NewPage::new("Welcome Home")).await.unwrap();
        assert!(matches!(resolver.resolve_root().await, Err(AppError::NotFound(_))));

        repo.update(home.id, PageChanges::default().published(true))
            .await
            .unwrap();
        let resolved = resolver.resolve_root().await.unwrap();
        assert_eq!(resolved.page.title, "Welcome Home");
        assert!(resolved.is_homepage());
        assert_eq!(resolved.template, TemplateRef::Default);
    }

    #[tokio::test]
    async fn test_slug_resolution() {
        let (repo, resolver) = setup().await;
        repo.create(NewPage::new("Home").slug("home").published(true))
            .await
            .unwrap();
        repo.create(NewPage::new("About Us").slug("about-us").published(true))
            .await
            .unwrap();
        repo.create(NewPage::new("Draft").slug("draft-page")).await.unwrap();
        repo.create(NewPage::new("Custom").slug("custom").published(true))
            .await
            .unwrap();

        match resolver.resolve_slug("about-us").await.unwrap() {
            Resolution::Render(resolved) => {
                assert_eq!(resolved.page.title, "About Us");
                assert_eq!(resolved.template, TemplateRef::Default);
            }
            other => panic!("unexpected resolution: {:?}", other),
        }

        match resolver.resolve_slug("custom").await.unwrap() {
            Resolution::Render(resolved) => assert_eq!(resolved.template.name(), "pages.custom"),
            other => panic!("unexpected resolution: {:?}", other),
        }

        assert_eq!(
            resolver.resolve_slug("home").await.unwrap(),
            Resolution::Redirect("/".to_string())
        );
        assert!(matches!(
            resolver.resolve_slug("draft-page").await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            resolver.resolve_slug("missing").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_unpublished_homepage_slug_is_not_found() {
        let (repo, resolver) = setup().await;
        repo.create(NewPage::new("Home").slug("home")).await.unwrap();
        assert!(matches!(
            resolver.resolve_slug("home").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_redirect_follows_homepage_changes() {
        let (repo, resolver) = setup().await;
        repo.create(NewPage::new("Home").published(true)).await.unwrap();
        let about = repo
            .create(NewPage::new("About").published(true))
            .await
            .unwrap();

        assert!(matches!(
            resolver.resolve_slug("about").await.unwrap(),
            Resolution::Render(_)
        ));

        repo.set_as_homepage(about.id).await.unwrap();
        assert_eq!(
            resolver.resolve_slug("about").await.unwrap(),
            Resolution::Redirect("/".to_string())
        );
        assert_eq!(resolver.resolve_root().await.unwrap().page.id, about.id);
    }
}
