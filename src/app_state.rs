use std::sync::Arc;

use crate::{
    config::Config,
    error::AppResult,
    infrastructure::{PageRepository, SqlitePageRepository},
    services::PageResolver,
    views::{FsViewSelector, PageRenderer},
};

#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn PageRepository>,
    pub resolver: PageResolver,
    pub renderer: Arc<PageRenderer>,
    pub config: Config,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let repository = SqlitePageRepository::connect(&config.database).await?;
        Self::from_repository(config, Arc::new(repository))
    }

    /// Wire the services around an existing repository.
    pub fn from_repository(config: Config, repository: Arc<dyn PageRepository>) -> AppResult<Self> {
        let views = Arc::new(FsViewSelector::new(&config.site.templates_dir));
        let resolver = PageResolver::new(repository.clone(), views);
        let renderer = Arc::new(PageRenderer::new(config.site.clone())?);

        Ok(Self {
            repository,
            resolver,
            renderer,
            config,
        })
    }
}
