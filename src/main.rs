// Pagesite server

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagesite::{app_state::AppState, config::Config, http::create_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("pagesite=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let app_state = AppState::new(config.clone()).await?;
    let app = create_router(app_state);

    let addr = config.server_address();
    let listener = TcpListener::bind(&addr).await?;
    info!(
        %addr,
        database = %config.database.url,
        templates = %config.site.templates_dir.display(),
        "pagesite listening"
    );
    info!("  GET    /                                - homepage");
    info!("  GET    /{{slug}}                          - published page");
    info!("  GET    /health                          - health check");
    info!("  *      /admin/api/pages[/{{id}}]           - authoring API");

    axum::serve(listener, app).await?;

    Ok(())
}
