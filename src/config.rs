//! Command line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::model::train::FitOptions;
use crate::vectorizer::DEFAULT_MAX_FEATURES;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "http://127.0.0.1:3000"];

#[derive(Debug, Parser)]
#[command(name = "fnd", version, about = "Fake news classifier service")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load the model artifacts and serve the HTTP API
    Serve(ServeConfig),
    /// Fit a model from labelled CSV data and write its artifacts
    Train(TrainConfig),
}

#[derive(Debug, Clone, Args)]
pub struct ServeConfig {
    #[arg(long, env = "FND_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    #[arg(long, env = "FND_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Directory holding the six model artifacts
    #[arg(long, env = "FND_ARTIFACTS", default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Origin allowed by CORS; repeat or comma-separate for several
    #[arg(
        long = "allowed-origin",
        env = "FND_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_values = DEFAULT_ORIGINS
    )]
    pub allowed_origins: Vec<String>,
}

impl ServeConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            artifacts: PathBuf::from("artifacts"),
            allowed_origins: DEFAULT_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TrainConfig {
    /// CSV files with `text` and `label` columns (0 = fake, 1 = real)
    #[arg(long, required = true, num_args = 1..)]
    pub data: Vec<PathBuf>,

    /// Output directory for the artifacts
    #[arg(long, default_value = "artifacts")]
    pub out: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MAX_FEATURES)]
    pub max_features: usize,

    /// Fraction of each file to keep
    #[arg(long, default_value_t = 1.0, value_parser = fraction)]
    pub sample_frac: f64,

    /// Fraction held out for evaluation
    #[arg(long, default_value_t = 0.2, value_parser = fraction)]
    pub test_size: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Indicator words kept per class
    #[arg(long, default_value_t = 100)]
    pub top_words: usize,

    /// Additive smoothing
    #[arg(long, default_value_t = 1.0, value_parser = positive)]
    pub alpha: f64,
}

impl TrainConfig {
    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            max_features: self.max_features,
            test_size: self.test_size,
            seed: self.seed,
            top_words: self.top_words,
            alpha: self.alpha,
        }
    }
}

fn fraction(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("{value} is not between 0 and 1"))
    }
}

fn positive(raw: &str) -> Result<f64, String> {
    let value: f64 = raw.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} must be a positive number"))
    }
}
