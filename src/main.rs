//! PiiGuard - PII detection and redaction for documents
//!
//! Extracts text from plain text, PDFs and scanned images, detects PII
//! under a declarative policy, and returns the redacted text together with
//! the list of detections.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use piiguard::{
    api::{build_app, AppState},
    config::{LogFormat, PiiGuardConfig},
    pipeline::Pipeline,
    privacy::{load_policy, PrivacyEngines},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Content type used when the input extension is not recognized
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Parser)]
#[command(name = "piiguard")]
#[command(version)]
#[command(about = "PII detection and redaction for text, PDFs and images")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "PIIGUARD_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Redact a single file
    Redact {
        /// Input file (text, PDF or image)
        #[arg(short, long)]
        input: PathBuf,

        /// Write the redacted text here
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the detections as JSON here
        #[arg(long)]
        entities_json: Option<PathBuf>,

        /// Override the content type guessed from the file extension
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Validate and list the redaction policy
    Policy {
        /// Policy file (defaults to the configured path)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = PiiGuardConfig::load(cli.config.as_deref())?;
    init_logging(&config, cli.verbose, cli.log_format);

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Redact {
            input,
            out,
            entities_json,
            content_type,
        } => {
            run_redact(config, &input, out, entities_json, content_type).await?;
        }
        Commands::Policy { path } => {
            show_policy(path.as_deref().unwrap_or(config.policy.path.as_path()))?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}

fn init_logging(config: &PiiGuardConfig, verbose: bool, format: Option<LogFormat>) {
    let level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("piiguard={},tower_http={}", level, level).into());

    match format.unwrap_or(config.logging.format) {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
}

async fn run_server(mut config: PiiGuardConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting PiiGuard API");

    let engines = Arc::new(PrivacyEngines::from_config(&config.ner));
    engines.warm_up().await?;
    let pipeline = Arc::new(Pipeline::new(&config, engines)?);
    let app = build_app(AppState { pipeline }, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    tracing::info!(%addr, "PiiGuard API is running. Press Ctrl+C to stop.");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

async fn run_redact(
    config: PiiGuardConfig,
    input: &Path,
    out: Option<PathBuf>,
    entities_json: Option<PathBuf>,
    content_type: Option<String>,
) -> Result<()> {
    let content_type = content_type.unwrap_or_else(|| {
        mime_guess::from_path(input)
            .first()
            .map(|mime| mime.essence_str().to_string())
            .unwrap_or_else(|| FALLBACK_CONTENT_TYPE.to_string())
    });
    let data = tokio::fs::read(input)
        .await
        .with_context(|| format!("failed to read {}", input.display()))?;

    let engines = Arc::new(PrivacyEngines::from_config(&config.ner));
    let pipeline = Pipeline::new(&config, engines)?;
    let result = pipeline.process(data.into(), &content_type).await?;

    let summary = serde_json::json!({
        "content_type": result.content_type,
        "text_length": result.text_length,
        "entities_count": result.entities.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = out {
        tokio::fs::write(&path, &result.redacted_text)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    if let Some(path) = entities_json {
        let json = serde_json::to_string_pretty(&result.entities)?;
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(())
}

fn show_policy(path: &Path) -> Result<()> {
    let policies = load_policy(path)?;

    println!("Policy: {}", path.display());
    if let Some(version) = policies.version() {
        println!("Version: {}", version);
    }
    println!("Entities: {}", policies.len());
    for policy in policies.iter() {
        if policy.has_context_gate() {
            let keywords: Vec<&str> = policy.context_keywords.iter().map(String::as_str).collect();
            println!(
                "  {:<16} -> {}  (near [{}] within {} chars)",
                policy.name,
                policy.replace_with,
                keywords.join(", "),
                policy.window
            );
        } else {
            println!("  {:<16} -> {}", policy.name, policy.replace_with);
        }
    }
    Ok(())
}

fn show_config(config: &PiiGuardConfig) -> Result<()> {
    let toml = toml::to_string_pretty(&config.masked())?;
    println!("{}", toml);
    Ok(())
}
