use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post},
    Router,
};
use skilltrack_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    middleware::auth::require_bearer_auth,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route(
            "/api/tests",
            get(routes::tests::list_tests).post(routes::tests::create_test),
        )
        .route("/api/tests/assign", post(routes::tests::assign_test))
        .route(
            "/api/tests/assignments",
            get(routes::tests::my_assignments),
        )
        .route(
            "/api/tests/:id",
            get(routes::tests::get_test)
                .patch(routes::tests::update_test)
                .delete(routes::tests::delete_test),
        )
        .route("/api/tests/:id/take", get(routes::tests::take_test))
        .route("/api/tests/:id/submit", post(routes::tests::submit_test))
        .route(
            "/api/tests/:id/certificate",
            post(routes::tests::issue_certificate),
        )
        .route(
            "/api/certificates",
            get(routes::certificates::my_certificates),
        )
        .route(
            "/api/certificates/:id",
            delete(routes::certificates::revoke_certificate),
        )
        .route(
            "/api/certificates/:id/download",
            get(routes::certificates::download_certificate),
        )
        .layer(middleware::from_fn(require_bearer_auth));

    let app = base_routes
        .merge(api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
