// SEO metadata - typed per channel (meta, Open Graph, Twitter, schema.org)
//
// The nested layout is the only one written. The legacy flat layouts
// (`meta_title`, `og_title`, ... and the dotted `seo.meta_title` form) are
// accepted on read and folded into the same typed value.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::{AppError, AppResult};

static SCHEMA_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("schema type pattern compiles"));

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "SeoLayout")]
pub struct Seo {
    #[serde(skip_serializing_if = "MetaTags::is_empty")]
    pub meta: MetaTags,
    #[serde(skip_serializing_if = "OpenGraph::is_empty")]
    pub open_graph: OpenGraph,
    #[serde(skip_serializing_if = "TwitterMeta::is_empty")]
    pub twitter: TwitterMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaOrg>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetaTags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub robots: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OpenGraph {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub og_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TwitterCardKind {
    Summary,
    SummaryLargeImage,
    App,
    Player,
}

impl TwitterCardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TwitterCardKind::Summary => "summary",
            TwitterCardKind::SummaryLargeImage => "summary_large_image",
            TwitterCardKind::App => "app",
            TwitterCardKind::Player => "player",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwitterMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<TwitterCardKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// schema.org structured data emitted as JSON-LD
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaOrg {
    #[serde(rename = "type")]
    pub schema_type: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl MetaTags {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.keywords.is_none()
            && self.robots.is_none()
            && self.canonical.is_none()
    }
}

impl OpenGraph {
    pub fn is_empty(&self) -> bool {
        self.og_type.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
    }
}

impl TwitterMeta {
    pub fn is_empty(&self) -> bool {
        self.card.is_none()
            && self.title.is_none()
            && self.description.is_none()
            && self.image.is_none()
    }
}

impl SchemaOrg {
    /// Build the JSON-LD document for a page with the given name and URL.
    /// Entries in `data` come after the fixed keys and cannot override them.
    pub fn to_json_ld(&self, name: &str, url: &str) -> Value {
        let mut doc = Map::new();
        doc.insert("@context".into(), Value::String("https://schema.org".into()));
        doc.insert("@type".into(), Value::String(self.schema_type.clone()));
        doc.insert("name".into(), Value::String(name.to_string()));
        doc.insert("url".into(), Value::String(url.to_string()));
        for (key, value) in &self.data {
            doc.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(doc)
    }
}

impl Seo {
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
            && self.open_graph.is_empty()
            && self.twitter.is_empty()
            && self.schema.is_none()
    }

    /// Trim every text field, drop blank ones, and collapse an empty result to `None`.
    pub fn compact(mut self) -> Option<Self> {
        for field in [
            &mut self.meta.title,
            &mut self.meta.description,
            &mut self.meta.keywords,
            &mut self.meta.robots,
            &mut self.meta.canonical,
            &mut self.open_graph.og_type,
            &mut self.open_graph.title,
            &mut self.open_graph.description,
            &mut self.open_graph.image,
            &mut self.twitter.title,
            &mut self.twitter.description,
            &mut self.twitter.image,
        ] {
            *field = field
                .take()
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty());
        }
        if let Some(schema) = &mut self.schema {
            schema.schema_type = schema.schema_type.trim().to_string();
        }
        if self
            .schema
            .as_ref()
            .is_some_and(|schema| schema.schema_type.is_empty())
        {
            self.schema = None;
        }

        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_link("seo.meta.canonical", self.meta.canonical.as_deref())?;
        validate_link("seo.open_graph.image", self.open_graph.image.as_deref())?;
        validate_link("seo.twitter.image", self.twitter.image.as_deref())?;

        if let Some(schema) = &self.schema {
            if !SCHEMA_TYPE_PATTERN.is_match(&schema.schema_type) {
                return Err(AppError::Validation(format!(
                    "seo.schema.type '{}' is not a schema.org type name",
                    schema.schema_type
                )));
            }
            if let Some(key) = schema.data.keys().find(|key| key.starts_with('@')) {
                return Err(AppError::Validation(format!(
                    "seo.schema.data key '{}' is reserved",
                    key
                )));
            }
        }
        Ok(())
    }
}

fn validate_link(field: &str, value: Option<&str>) -> AppResult<()> {
    match value {
        None => Ok(()),
        Some(link)
            if link.starts_with("https://")
                || link.starts_with("http://")
                || (link.starts_with('/') && !link.starts_with("//")) =>
        {
            Ok(())
        }
        Some(link) => Err(AppError::Validation(format!(
            "{} must be an http(s) URL or a root-relative path, got '{}'",
            field, link
        ))),
    }
}

const NESTED_SECTIONS: [&str; 4] = ["meta", "open_graph", "twitter", "schema"];

/// Any nested section key selects the nested layout; otherwise the object is
/// read as the flat layout. Errors come from the selected layout.
enum SeoLayout {
    Flat(FlatSeo),
    Nested(NestedSeo),
}

impl<'de> Deserialize<'de> for SeoLayout {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let fields = Map::<String, Value>::deserialize(deserializer)?;
        let nested = fields
            .keys()
            .any(|key| NESTED_SECTIONS.contains(&key.as_str()));
        let value = Value::Object(fields);

        let layout = if nested {
            NestedSeo::deserialize(value).map(SeoLayout::Nested)
        } else {
            FlatSeo::deserialize(value).map(SeoLayout::Flat)
        };
        layout.map_err(|e| de::Error::custom(format!("invalid seo: {}", e)))
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NestedSeo {
    #[serde(default)]
    meta: MetaTags,
    #[serde(default)]
    open_graph: OpenGraph,
    #[serde(default)]
    twitter: TwitterMeta,
    #[serde(default)]
    schema: Option<SchemaOrg>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct FlatSeo {
    #[serde(default, alias = "seo.meta_title")]
    meta_title: Option<String>,
    #[serde(default, alias = "seo.meta_description")]
    meta_description: Option<String>,
    #[serde(default, alias = "seo.meta_keywords")]
    meta_keywords: Option<String>,
    #[serde(default, alias = "seo.robots")]
    robots: Option<String>,
    #[serde(default, alias = "seo.canonical")]
    canonical: Option<String>,
    #[serde(default, alias = "seo.og_type")]
    og_type: Option<String>,
    #[serde(default, alias = "seo.og_title")]
    og_title: Option<String>,
    #[serde(default, alias = "seo.og_description")]
    og_description: Option<String>,
    #[serde(default, alias = "seo.og_image")]
    og_image: Option<String>,
    #[serde(default, alias = "seo.twitter_card")]
    twitter_card: Option<TwitterCardKind>,
    #[serde(default, alias = "seo.twitter_title")]
    twitter_title: Option<String>,
    #[serde(default, alias = "seo.twitter_description")]
    twitter_description: Option<String>,
    #[serde(default, alias = "seo.twitter_image")]
    twitter_image: Option<String>,
    #[serde(default, alias = "seo.schema_type")]
    schema_type: Option<String>,
    #[serde(default, alias = "seo.schema_data")]
    schema_data: Option<BTreeMap<String, Value>>,
}

impl From<SeoLayout> for Seo {
    fn from(layout: SeoLayout) -> Self {
        match layout {
            SeoLayout::Nested(nested) => Seo {
                meta: nested.meta,
                open_graph: nested.open_graph,
                twitter: nested.twitter,
                schema: nested.schema,
            },
            SeoLayout::Flat(flat) => Seo {
                meta: MetaTags {
                    title: flat.meta_title,
                    description: flat.meta_description,
                    keywords: flat.meta_keywords,
                    robots: flat.robots,
                    canonical: flat.canonical,
                },
                open_graph: OpenGraph {
                    og_type: flat.og_type,
                    title: flat.og_title,
                    description: flat.og_description,
                    image: flat.og_image,
                },
                twitter: TwitterMeta {
                    card: flat.twitter_card,
                    title: flat.twitter_title,
                    description: flat.twitter_description,
                    image: flat.twitter_image,
                },
                schema: flat
                    .schema_type
                    .filter(|schema_type| !schema_type.trim().is_empty())
                    .map(|schema_type| SchemaOrg {
                        schema_type,
                        data: flat.schema_data.unwrap_or_default(),
                    }),
            },
        }
    }
}
