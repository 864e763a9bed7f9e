// Strong Types - newtypes for page identity and URL slugs

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AppError, AppResult};

pub const MAX_SLUG_LEN: usize = 255;

static SLUG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug pattern compiles"));

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("separator pattern compiles"));

/// Store-assigned page identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub i64);

impl PageId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for PageId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<PageId> for i64 {
    fn from(id: PageId) -> Self {
        id.0
    }
}

/// URL-safe page identifier: lowercase ASCII letters and digits joined by single hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Validate an explicitly provided slug.
    pub fn parse(raw: &str) -> AppResult<Self> {
        if raw.is_empty() {
            return Err(AppError::Validation("Slug cannot be empty".to_string()));
        }
        if raw.len() > MAX_SLUG_LEN {
            return Err(AppError::Validation(format!(
                "Slug must be at most {} characters",
                MAX_SLUG_LEN
            )));
        }
        if !SLUG_PATTERN.is_match(raw) {
            return Err(AppError::Validation(format!(
                "Slug '{}' may only contain lowercase letters, digits and single hyphens",
                raw
            )));
        }
        Ok(Self(raw.to_string()))
    }

    /// Derive a slug from free text. Returns `None` when nothing URL-safe is left.
    pub fn from_title(title: &str) -> Option<Self> {
        let slug = slugify(title);
        if slug.is_empty() {
            None
        } else {
            Some(Self(slug))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lowercase, fold common Latin accents, collapse every non-alphanumeric run
/// into one hyphen and trim hyphens from both ends.
pub fn slugify(text: &str) -> String {
    let folded: String = text.to_lowercase().chars().map(fold_accent).collect();
    let hyphenated = SEPARATOR_RUNS.replace_all(&folded, "-");
    let trimmed = hyphenated.trim_matches('-');

    if trimmed.len() <= MAX_SLUG_LEN {
        return trimmed.to_string();
    }
    // ASCII only at this point, so byte slicing is safe.
    trimmed[..MAX_SLUG_LEN].trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' => 'a',
        'ç' | 'ć' | 'č' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' => 'i',
        'ñ' | 'ń' | 'ň' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' => 'u',
        'ý' | 'ÿ' => 'y',
        'ś' | 'š' => 's',
        'ź' | 'ż' | 'ž' => 'z',
        'ł' => 'l',
        'ř' => 'r',
        'ď' => 'd',
        'ť' => 't',
        other => other,
    }
}
