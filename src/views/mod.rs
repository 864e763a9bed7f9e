// View selection and HTML rendering

pub mod renderer;

use std::path::{Path, PathBuf};

use crate::core::Slug;

pub use renderer::PageRenderer;

/// Template chosen for a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateRef {
    /// A slug-specific template on disk, e.g. `pages/about-us.hbs`
    Custom { name: String, path: PathBuf },
    /// The built-in page template
    Default,
}

impl TemplateRef {
    pub fn name(&self) -> &str {
        match self {
            TemplateRef::Custom { name, .. } => name,
            TemplateRef::Default => "pages.show",
        }
    }
}

/// Maps a slug to a template. Implementations must not cache: a template
/// added or removed on disk takes effect on the next request.
pub trait ViewSelector: Send + Sync {
    fn resolve_template(&self, slug_hint: &str) -> TemplateRef;
}

/// Looks for `{templates_dir}/pages/{slug}.hbs`
#[derive(Debug, Clone)]
pub struct FsViewSelector {
    pages_dir: PathBuf,
}

impl FsViewSelector {
    pub fn new(templates_dir: impl AsRef<Path>) -> Self {
        Self {
            pages_dir: templates_dir.as_ref().join("pages"),
        }
    }
}

impl ViewSelector for FsViewSelector {
    fn resolve_template(&self, slug_hint: &str) -> TemplateRef {
        // Only well-formed slugs may name a file.
        if Slug::parse(slug_hint).is_err() {
            return TemplateRef::Default;
        }

        let path = self.pages_dir.join(format!("{}.hbs", slug_hint));
        if path.is_file() {
            TemplateRef::Custom {
                name: format!("pages.{}", slug_hint),
                path,
            }
        } else {
            TemplateRef::Default
        }
    }
}
