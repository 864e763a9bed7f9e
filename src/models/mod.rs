// Page domain model

pub mod page;
pub mod seo;

pub use page::{CollectionStats, NewPage, Page, PageChanges, PageDraft, PageFields, PageFilter};
pub use seo::{MetaTags, OpenGraph, SchemaOrg, Seo, TwitterCardKind, TwitterMeta};
