// PageRenderer - Handlebars rendering for pages and the not-found page

use chrono::{Datelike, Utc};
use handlebars::Handlebars;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::{
    config::SiteConfig,
    error::{AppError, AppResult},
    models::{Page, TwitterCardKind},
    services::ResolvedPage,
    views::TemplateRef,
};

const SEO_HEAD_PARTIAL: &str = "seo_head";
const NOT_FOUND_TEMPLATE: &str = "errors.404";

const SHOW_SOURCE: &str = include_str!("templates/show.hbs");
const SEO_HEAD_SOURCE: &str = include_str!("templates/seo_head.hbs");
const NOT_FOUND_SOURCE: &str = include_str!("templates/404.hbs");

pub struct PageRenderer {
    registry: Handlebars<'static>,
    site: SiteConfig,
}

#[derive(Debug, Serialize)]
struct PageView {
    title: String,
    slug: String,
    content: Option<String>,
    url: String,
    is_homepage: bool,
}

/// Resolved head tags. Every fallback has been applied already.
#[derive(Debug, Serialize)]
struct SeoView {
    title: String,
    description: Option<String>,
    keywords: Option<String>,
    robots: Option<String>,
    canonical: String,
    og_type: String,
    og_title: String,
    og_description: Option<String>,
    og_image: Option<String>,
    twitter_card: &'static str,
    twitter_title: String,
    twitter_description: Option<String>,
    twitter_image: Option<String>,
}

#[derive(Debug, Serialize)]
struct NavItem {
    title: String,
    url: String,
    is_current: bool,
}

#[derive(Debug, Serialize)]
struct ShowContext {
    site_name: String,
    year: i32,
    page: PageView,
    seo: SeoView,
    json_ld: Option<String>,
    navigation: Vec<NavItem>,
}

#[derive(Debug, Serialize)]
struct NotFoundContext {
    site_name: String,
    year: i32,
    pages: Vec<NavItem>,
}

impl PageRenderer {
    pub fn new(site: SiteConfig) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_partial(SEO_HEAD_PARTIAL, SEO_HEAD_SOURCE)?;
        registry.register_template_string(TemplateRef::Default.name(), SHOW_SOURCE)?;
        registry.register_template_string(NOT_FOUND_TEMPLATE, NOT_FOUND_SOURCE)?;

        Ok(Self { registry, site })
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Render a resolved page. Custom templates are read from disk on every
    /// call and may use the `seo_head` partial.
    pub async fn render_page(&self, resolved: &ResolvedPage, navigation: &[Page]) -> AppResult<String> {
        let context = self.show_context(&resolved.page, navigation)?;

        match &resolved.template {
            TemplateRef::Default => Ok(self.registry.render(TemplateRef::Default.name(), &context)?),
            TemplateRef::Custom { name, path } => {
                debug!(template = %name, path = %path.display(), "rendering custom template");
                let source = tokio::fs::read_to_string(path).await.map_err(|e| {
                    AppError::Internal(format!("Failed to read template {}: {}", path.display(), e))
                })?;
                Ok(self.registry.render_template(&source, &context)?)
            }
        }
    }

    /// The 404 page lists published pages other than the homepage.
    pub fn render_not_found(&self, pages: &[Page]) -> AppResult<String> {
        let context = NotFoundContext {
            site_name: self.site.name.clone(),
            year: Utc::now().year(),
            pages: pages
                .iter()
                .filter(|page| page.is_published && !page.is_homepage)
                .map(|page| NavItem {
                    title: page.title.clone(),
                    url: page.path(),
                    is_current: false,
                })
                .collect(),
        };

        Ok(self.registry.render(NOT_FOUND_TEMPLATE, &context)?)
    }

    fn absolute_url(&self, page: &Page) -> String {
        format!("{}{}", self.site.base_url, page.path())
    }

    fn show_context(&self, page: &Page, navigation: &[Page]) -> AppResult<ShowContext> {
        let url = self.absolute_url(page);
        let seo = page.seo.clone().unwrap_or_default();

        let title = seo.meta.title.clone().unwrap_or_else(|| page.title.clone());
        let seo_view = SeoView {
            og_title: seo.open_graph.title.clone().unwrap_or_else(|| title.clone()),
            twitter_title: seo.twitter.title.clone().unwrap_or_else(|| title.clone()),
            title,
            description: seo.meta.description.clone(),
            keywords: seo.meta.keywords.clone(),
            robots: seo.meta.robots.clone(),
            canonical: seo.meta.canonical.clone().unwrap_or_else(|| url.clone()),
            og_type: seo
                .open_graph
                .og_type
                .clone()
                .unwrap_or_else(|| "website".to_string()),
            og_description: seo.open_graph.description.clone(),
            og_image: seo.open_graph.image.clone(),
            twitter_card: seo
                .twitter
                .card
                .unwrap_or(TwitterCardKind::SummaryLargeImage)
                .as_str(),
            twitter_description: seo.twitter.description.clone(),
            twitter_image: seo.twitter.image.clone(),
        };

        let json_ld = match &seo.schema {
            Some(schema) => Some(encode_json_ld(&schema.to_json_ld(&page.title, &url))?),
            None => None,
        };

        Ok(ShowContext {
            site_name: self.site.name.clone(),
            year: Utc::now().year(),
            page: PageView {
                title: page.title.clone(),
                slug: page.slug.to_string(),
                content: page.content.clone(),
                url,
                is_homepage: page.is_homepage,
            },
            seo: seo_view,
            json_ld,
            navigation: navigation
                .iter()
                .filter(|nav| nav.is_published)
                .map(|nav| NavItem {
                    title: nav.title.clone(),
                    url: nav.path(),
                    is_current: nav.id == page.id,
                })
                .collect(),
        })
    }
}

/// JSON for a `<script>` block: `</` is escaped so the document cannot
/// close the element early.
fn encode_json_ld(doc: &Value) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(doc)?.replace("</", "<\\/"))
}
