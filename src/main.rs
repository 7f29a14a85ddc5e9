//! Logseq MCP server CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logseq_mcp::logging::{install, LogPipeline, Severity};
use logseq_mcp::mcp::ToolName;
use logseq_mcp::{
    setup_logging, LoggingConfig, LogseqClient, LogseqConfig, McpServer, ToolHandler,
    ToolInvocationLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "logseq-mcp")]
#[command(about = "Model Context Protocol server for Logseq with privacy-preserving logs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (TRACE, DEBUG, INFO, WARNING, ERROR); overrides LOGSEQ_MCP_LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Log file path; overrides LOGSEQ_MCP_LOG_FILE
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Logging mode (privacy, debug, minimal); overrides LOGSEQ_MCP_LOG_MODE
    #[arg(long)]
    log_mode: Option<String>,

    /// Size threshold for log rotation, e.g. "10MB"
    #[arg(long)]
    log_max_size: Option<String>,

    /// Switch to daily rotation keeping this many days
    #[arg(long)]
    log_retention_days: Option<u32>,

    /// Mirror log records to stdout
    #[arg(long)]
    debug: bool,

    /// Root directory for the default logs/ folder
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Logseq API host (overrides LOGSEQ_API_HOST)
    #[arg(long)]
    host: Option<String>,

    /// Logseq API port (overrides LOGSEQ_API_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Logseq API token
    #[arg(long, env = "LOGSEQ_API_TOKEN", hide_env_values = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start MCP server (stdio mode, default)
    Serve,

    /// Print the tool catalogue as JSON
    Tools,
}

impl Cli {
    fn logging_config(&self) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_file: self.log_file.clone(),
            mode: self.log_mode.clone(),
            max_file_size: self.log_max_size.clone(),
            backup_count: None,
            retention_days: self.log_retention_days,
            debug: self.debug.then_some(true),
            project_root: self.project_root.clone(),
        }
    }

    fn logseq_config(&self) -> LogseqConfig {
        LogseqConfig::from_env().with_overrides(self.host.clone(), self.port, self.token.clone())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Tools) => print_tools(),
        Some(Commands::Serve) | None => serve(&cli).await,
    }
}

fn print_tools() -> Result<()> {
    let tools: Vec<_> = ToolName::ALL.iter().map(ToolName::definition).collect();
    let json = serde_json::to_string_pretty(&tools).context("Failed to serialize tools")?;
    println!("{}", json);
    Ok(())
}

async fn serve(cli: &Cli) -> Result<()> {
    let pipeline = match setup_logging(&cli.logging_config()) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            // Keep serving with errors on stderr only
            eprintln!("Failed to set up file logging: {}", e);
            let fallback = Arc::new(LogPipeline::stderr_only(Severity::Info));
            if let Err(e) = install(Arc::clone(&fallback)) {
                eprintln!("Failed to install fallback logging: {}", e);
            }
            fallback
        }
    };

    debug!("Logseq MCP v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = cli.logseq_config();
    config.validate().context("Invalid Logseq API configuration")?;
    if config.token.is_none() {
        warn!("No Logseq API token configured; requests may be rejected");
    }
    info!("Using Logseq API at {}", config.api_url());

    let client = LogseqClient::new(&config).context("Failed to create Logseq client")?;
    let handler = ToolHandler::new(Arc::new(client), ToolInvocationLogger::new(pipeline));

    let server = McpServer::new(handler);
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => info!("Received interrupt, shutting down"),
    }
    Ok(())
}
