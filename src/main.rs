use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use report_agent::agent::{Agent, AgentEvent, AgentState};
use report_agent::config::AppConfig;
use report_agent::error;
use report_agent::tool::{HttpTransport, ToolInvoker, ToolResult};
use report_agent::{server, tools};

#[derive(Debug, Parser)]
#[command(name = "report-agent", version, about = "LLM-planned monthly report assistant")]
struct Cli {
    /// LLM provider: gemini or openai
    #[arg(long, global = true)]
    provider: Option<String>,
    /// Model name for the selected provider
    #[arg(long, global = true)]
    model: Option<String>,
    /// Maximum planner calls per run
    #[arg(long, global = true)]
    max_steps: Option<u32>,
    /// Base URL of a remote tool server (in-process tools when unset)
    #[arg(long, global = true)]
    tool_server: Option<String>,
    /// Storage root for to-dos, PDFs, templates, and reports
    #[arg(long, global = true)]
    storage: Option<PathBuf>,
    /// Environment file to load instead of ./.env
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one command through the agent
    Run {
        #[arg(required = true, trailing_var_arg = true)]
        command: Vec<String>,
    },
    /// Read commands from stdin, one independent run per line
    Chat,
    /// Serve the built-in tools over HTTP
    Serve {
        #[arg(long, env = "TOOL_SERVER_ADDR", default_value = "127.0.0.1:8000")]
        addr: SocketAddr,
    },
    /// Print the tool catalog
    Tools,
}

impl Cli {
    fn overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(provider) = &self.provider {
            overrides.push(("LLM_PROVIDER", provider.clone()));
        }
        if let Some(model) = &self.model {
            overrides.push(("LLM_MODEL", model.clone()));
        }
        if let Some(max_steps) = self.max_steps {
            overrides.push(("AGENT_MAX_STEPS", max_steps.to_string()));
        }
        if let Some(url) = &self.tool_server {
            overrides.push(("TOOL_SERVER_URL", url.clone()));
        }
        if let Some(storage) = &self.storage {
            overrides.push(("REPORT_AGENT_STORAGE", storage.display().to_string()));
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_with(cli.env_file.as_deref(), &cli.overrides())
        .context("failed to load configuration")?;

    match cli.command {
        Command::Run { command } => {
            let agent = build_agent(&config).await?;
            run_once(&agent, &command.join(" ")).await;
        }
        Command::Chat => {
            let agent = build_agent(&config).await?;
            chat(&agent).await?;
        }
        Command::Serve { addr } => {
            let llm = config
                .provider
                .build_client()
                .map_err(|e| warn!(error = %e, "Writing tools are disabled"))
                .ok();
            let registry = Arc::new(tools::default_registry(&config, llm)?);
            server::serve(addr, registry, async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        }
        Command::Tools => {
            let catalog = match &config.tool_server_url {
                Some(url) => {
                    HttpTransport::new(url.clone(), Some(config.tool_timeout))?
                        .fetch_catalog()
                        .await?
                }
                None => tools::default_registry(&config, None)?.describe(),
            };
            println!("{}", catalog);
        }
    }

    Ok(())
}

/// Wires the planner to either a remote tool server or the in-process tools.
async fn build_agent(config: &AppConfig) -> error::Result<Agent> {
    let llm = config.provider.build_client()?;

    let agent = match &config.tool_server_url {
        Some(url) => {
            let transport = HttpTransport::new(url.clone(), Some(config.tool_timeout))?;
            let catalog = transport.fetch_catalog().await?;
            debug!(%url, "Using remote tool server");
            Agent::new(
                llm,
                ToolInvoker::new(Arc::new(transport)),
                catalog,
                config.agent.clone(),
            )
        }
        None => {
            let registry = Arc::new(tools::default_registry(config, Some(llm.clone()))?);
            Agent::with_registry(llm, registry, config.agent.clone())
        }
    };
    Ok(agent)
}

async fn run_once(agent: &Agent, command: &str) {
    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Cancelling after the current step...");
                cancel.cancel();
            }
        }
    });

    let mut events = agent.stream(command, cancel);
    while let Some(event) = events.next().await {
        match event {
            AgentEvent::StepStarted { step } => debug!(step, "Step started"),
            AgentEvent::ToolCall { step, tool, args } => {
                println!("[{}] {} {}", step, tool, args);
            }
            AgentEvent::ToolResult { result, .. } => match result {
                ToolResult::Success(_) => println!("    ok"),
                ToolResult::Failure(message) => println!("    failed: {}", message),
            },
            AgentEvent::Finished { outcome } => {
                if outcome.state != AgentState::FinalAnswered {
                    println!("({:?} after {} steps)", outcome.state, outcome.steps);
                }
                println!("\n{}", outcome.message);
            }
        }
    }

    interrupt.abort();
}

async fn chat(agent: &Agent) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }
        run_once(agent, line).await;
        println!();
    }
    Ok(())
}
