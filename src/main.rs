use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use image_upload::{AppConfig, routes, upload::IMAGES_DIR};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env();
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let images_dir = config.upload_root.join(IMAGES_DIR);
    if !images_dir.is_dir() {
        tracing::warn!(
            path = %images_dir.display(),
            "images directory does not exist, uploads will fail until it is created"
        );
    }

    let uploader = Arc::new(routes::uploader_from_config(&config));
    let router = routes::router(uploader);
    let bind_address = config.bind_address();
    let tcp_listener = tokio::net::TcpListener::bind(&bind_address).await?;

    tracing::info!(
        address = %bind_address,
        field = %config.field_name,
        max_upload_size = config.max_upload_size,
        "image upload server started"
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
