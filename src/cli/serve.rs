use tracing::info;

use crate::api;
use crate::cli::commands::ServeArgs;
use crate::cli::context::CliContext;
use crate::errors::VulnmapError;

pub async fn handle_serve(ctx: &CliContext, args: ServeArgs) -> Result<(), VulnmapError> {
    let host = args.host.unwrap_or_else(|| ctx.config.api_host());
    let port = args.port.unwrap_or_else(|| ctx.config.api_port());
    info!(host = %host, port, db = %ctx.db_path, "Starting API server");

    let db = ctx.open_database()?;
    let state = api::AppState::new(db.clone(), ctx.dispatcher(&db, false));
    if state.api_token.is_none() {
        info!("{} not set, rebuild routes are unauthenticated", api::API_TOKEN_ENV);
    }
    let app = api::build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| VulnmapError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
