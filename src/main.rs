use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use fake_news_detector::config::{Cli, Command, ServeConfig, TrainConfig};
use fake_news_detector::model::train;
use fake_news_detector::service::http;
use fake_news_detector::{InferenceService, Model};

async fn serve(config: ServeConfig) -> Result<()> {
    info!(artifacts = %config.artifacts.display(), "loading model");
    let dir = config.artifacts.clone();
    let model = tokio::task::spawn_blocking(move || Model::load(&dir))
        .await
        .context("model loading task failed")?
        .inspect_err(|e| error!(error = %e, "startup failed"))
        .with_context(|| format!("could not load model from {}", config.artifacts.display()))?;

    let cors = http::cors_layer(&config.allowed_origins).context("invalid --allowed-origin")?;
    let app = http::router(Arc::new(InferenceService::new(model)), cors);
    http::serve(config.bind_addr(), app).await.context("server error")
}

async fn train(config: TrainConfig) -> Result<()> {
    let options = config.fit_options();
    let report = tokio::task::spawn_blocking(move || {
        train::run(&config.data, &config.out, config.sample_frac, &options)
    })
    .await
    .context("training task failed")?
    .context("training failed")?;

    match report.accuracy {
        Some(accuracy) => info!(
            train_rows = report.train_rows,
            test_rows = report.test_rows,
            accuracy,
            "training finished"
        ),
        None => info!(train_rows = report.train_rows, "training finished without a test split"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match Cli::parse().command {
        Command::Serve(config) => serve(config).await,
        Command::Train(config) => train(config).await,
    }
}
