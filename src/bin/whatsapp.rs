//! ASI-TRACK WhatsApp 服务
//!
//! 环境变量:
//! - WHATSAPP_ACCESS_TOKEN: Meta WhatsApp API 访问令牌
//! - WHATSAPP_PHONE_NUMBER_ID: 企业电话号码 ID（也可写在 [whatsapp].phone_number_id）
//! - WHATSAPP_VERIFY_TOKEN: Webhook 验证令牌 (默认 "asi-track")
//! - DEEPSEEK_API_KEY 或 OPENAI_API_KEY: LLM API Key
//! - SUPABASE_SERVICE_KEY: 业务数据库密钥
//!
//! 启动: cargo run --bin asi-track-whatsapp --features whatsapp

#[cfg(feature = "whatsapp")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use std::sync::Arc;

    use anyhow::Context;
    use asi_track::agent::create_agent_builder;
    use asi_track::integrations::whatsapp::{create_router, GraphApiSender, WhatsappState};

    asi_track::observability::init();

    let builder = create_agent_builder(None);
    let cfg = builder.config().clone();

    let access_token = std::env::var("WHATSAPP_ACCESS_TOKEN").context("WHATSAPP_ACCESS_TOKEN must be set")?;
    let phone_number_id = std::env::var("WHATSAPP_PHONE_NUMBER_ID")
        .ok()
        .or_else(|| cfg.whatsapp.phone_number_id.clone())
        .context("WHATSAPP_PHONE_NUMBER_ID must be set")?;
    let verify_token = std::env::var("WHATSAPP_VERIFY_TOKEN").unwrap_or_else(|_| "asi-track".to_string());

    let agent = builder.build_async().await;
    let state = Arc::new(WhatsappState {
        agent: Arc::new(agent),
        sender: Arc::new(GraphApiSender::new(access_token, &phone_number_id, &cfg.whatsapp.api_version)),
        verify_token,
    });

    let app = create_router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    tracing::info!("ASI-TRACK WhatsApp server listening on http://{}", addr);
    tracing::info!("Webhook URL: http://YOUR_HOST:{}/webhook", cfg.server.port);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(not(feature = "whatsapp"))]
fn main() {
    eprintln!("请使用 --features whatsapp 编译: cargo run --bin asi-track-whatsapp --features whatsapp");
    std::process::exit(1);
}
