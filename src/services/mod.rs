// Services - request-level logic above the repository

pub mod page_resolver;

pub use page_resolver::{PageResolver, ResolvedPage, Resolution};
