//! ASI-TRACK Web 聊天 API
//!
//! 启动: cargo run --bin asi-track-web --features web
//! POST http://127.0.0.1:3000/api/chat  `{"message": "...", "history": []}`

#![cfg(feature = "web")]

use std::sync::Arc;

use asi_track::agent::create_agent_builder;
use asi_track::integrations::web::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    asi_track::observability::init();

    let builder = create_agent_builder(None);
    let cfg = builder.config().clone();
    let agent = Arc::new(builder.build_async().await);

    let app = create_router(agent);
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    tracing::info!("ASI-TRACK web API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
