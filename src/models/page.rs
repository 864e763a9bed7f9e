// Page entity, its write inputs, and the snapshots the hooks operate on

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::core::{PageId, Slug};
use crate::error::{AppError, AppResult};
use crate::models::seo::Seo;

/// A persisted page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: String,
    pub slug: Slug,
    pub content: Option<String>,
    pub order: i64,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_homepage: bool,
    pub seo: Option<Seo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Public path of the page. The homepage is only served at `/`.
    pub fn path(&self) -> String {
        if self.is_homepage {
            "/".to_string()
        } else {
            format!("/{}", self.slug)
        }
    }
}

/// Fields for a page that does not exist yet. Unset fields get defaults
/// from the create hooks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewPage {
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_homepage: Option<bool>,
    #[serde(default)]
    pub seo: Option<Seo>,
}

impl NewPage {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = is_published;
        self
    }

    pub fn published_at(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn homepage(mut self, is_homepage: bool) -> Self {
        self.is_homepage = Some(is_homepage);
        self
    }

    pub fn seo(mut self, seo: Seo) -> Self {
        self.seo = Some(seo);
        self
    }
}

/// A partial update. `None` leaves a field untouched; for nullable fields
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub content: Option<Option<String>>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub published_at: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    pub is_homepage: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub seo: Option<Option<Seo>>,
}

impl PageChanges {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    pub fn content(mut self, content: Option<String>) -> Self {
        self.content = Some(content);
        self
    }

    pub fn order(mut self, order: i64) -> Self {
        self.order = Some(order);
        self
    }

    pub fn published(mut self, is_published: bool) -> Self {
        self.is_published = Some(is_published);
        self
    }

    pub fn published_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.published_at = Some(at);
        self
    }

    pub fn homepage(mut self, is_homepage: bool) -> Self {
        self.is_homepage = Some(is_homepage);
        self
    }

    pub fn seo(mut self, seo: Option<Seo>) -> Self {
        self.seo = Some(seo);
        self
    }
}

// Distinguishes an absent key (outer None) from an explicit null (Some(None)).
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Proposed state of a page before it is written. On create, an empty
/// `slug` and `None` for `order`/`is_homepage` mean "not provided".
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub title: String,
    pub slug: String,
    pub content: Option<String>,
    pub order: Option<i64>,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_homepage: Option<bool>,
    pub seo: Option<Seo>,
}

impl From<NewPage> for PageDraft {
    fn from(page: NewPage) -> Self {
        Self {
            title: page.title,
            slug: page.slug.unwrap_or_default(),
            content: page.content,
            order: page.order,
            is_published: page.is_published,
            published_at: page.published_at,
            is_homepage: page.is_homepage,
            seo: page.seo,
        }
    }
}

impl PageDraft {
    /// Snapshot of a persisted page.
    pub fn from_page(page: &Page) -> Self {
        Self {
            title: page.title.clone(),
            slug: page.slug.as_str().to_string(),
            content: page.content.clone(),
            order: Some(page.order),
            is_published: page.is_published,
            published_at: page.published_at,
            is_homepage: Some(page.is_homepage),
            seo: page.seo.clone(),
        }
    }

    pub fn apply(mut self, changes: PageChanges) -> Self {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(slug) = changes.slug {
            self.slug = slug;
        }
        if let Some(content) = changes.content {
            self.content = content;
        }
        if let Some(order) = changes.order {
            self.order = Some(order);
        }
        if let Some(is_published) = changes.is_published {
            self.is_published = is_published;
        }
        if let Some(published_at) = changes.published_at {
            self.published_at = published_at;
        }
        if let Some(is_homepage) = changes.is_homepage {
            self.is_homepage = Some(is_homepage);
        }
        if let Some(seo) = changes.seo {
            self.seo = seo;
        }
        self
    }

    /// Resolve into the values that get written. Fails if a hook left a
    /// required field unset.
    pub fn into_fields(self) -> AppResult<PageFields> {
        let slug = Slug::parse(&self.slug)?;
        let order = self
            .order
            .ok_or_else(|| AppError::Internal("page order was not resolved".to_string()))?;
        let is_homepage = self
            .is_homepage
            .ok_or_else(|| AppError::Internal("homepage flag was not resolved".to_string()))?;

        Ok(PageFields {
            title: self.title,
            slug,
            content: self.content,
            order,
            is_published: self.is_published,
            published_at: self.published_at,
            is_homepage,
            seo: self.seo,
        })
    }
}

/// Fully resolved column values for an insert or update
#[derive(Debug, Clone, PartialEq)]
pub struct PageFields {
    pub title: String,
    pub slug: Slug,
    pub content: Option<String>,
    pub order: i64,
    pub is_published: bool,
    pub published_at: Option<DateTime<Utc>>,
    pub is_homepage: bool,
    pub seo: Option<Seo>,
}

/// Aggregate state of the page collection, read inside the write transaction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    pub total: i64,
    pub homepages: i64,
    pub max_order: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFilter {
    All,
    Published,
}
