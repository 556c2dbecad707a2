use std::sync::Arc;

use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkly_client::render::ConsoleRenderer;
use linkly_client::{ClientConfig, HttpLinkApi, LinkClient, SessionEnd};

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();

    // Logs go to stderr so they never interleave with the rendered history
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkly_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("Using backend {}", config.api_base_url);
    tracing::info!("History storage: {:?}", config.storage);

    let storage = config.storage.open().await?;
    let api = Arc::new(HttpLinkApi::new(config.api_base_url.clone()));

    let client = LinkClient::new(api, storage, &config.history);
    client.subscribe(Arc::new(ConsoleRenderer::default()));
    client.start().await;

    eprintln!("Enter a URL to shorten (Ctrl-D to quit):");

    let input = BufReader::new(tokio::io::stdin());
    let end = client
        .run_lines(input, tokio::signal::ctrl_c(), |e| eprintln!("{}", e.user_message()))
        .await?;

    if end == SessionEnd::Interrupted {
        tracing::info!("Interrupted");
    }

    client.shutdown();
    Ok(())
}
