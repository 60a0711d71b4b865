use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{Extension, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

use gig_listings::shared::infrastructure::document_store::in_memory::InMemoryDocumentStore;
use gig_listings::shell::config::AppConfig;
use gig_listings::shell::graphql::{AppSchema, build_schema};
use gig_listings::shell::http::router;
use gig_listings::shell::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = AppConfig::from_env()?;

    // In-memory backend for now, optionally seeded from a JSON file
    let store = match &config.seed_file {
        Some(path) => {
            let json = tokio::fs::read_to_string(path).await?;
            tracing::info!(path = %path.display(), "seeding document store");
            InMemoryDocumentStore::from_seed_json(&json)?
        }
        None => InMemoryDocumentStore::new(),
    };

    let state = AppState::connect(&config, Arc::new(store)).await?;
    let schema = build_schema(state.clone());

    let app = router(state.clone())
        .route("/gql", get(graphiql).post(graphql))
        .layer(Extension(schema))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("GraphQL endpoint: http://{}/gql", config.bind_addr);
    let served = serve(config.bind_addr, app).await;
    state.shutdown().await;
    served
}

async fn serve(addr: std::net::SocketAddr, app: axum::Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn graphql(Extension(schema): Extension<AppSchema>, req: GraphQLRequest) -> GraphQLResponse {
    schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> axum::response::Html<String> {
    use async_graphql::http::GraphiQLSource;
    axum::response::Html(GraphiQLSource::build().endpoint("/gql").finish())
}
