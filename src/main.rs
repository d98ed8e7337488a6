use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use prisoners::a2a::client::A2aGateway;
use prisoners::a2a::server::{GatewayParams, start_server};
use prisoners::agents::{GuardExecutor, PrisonerExecutor, Strategy};
use prisoners::config::Config;
use prisoners::dilemma::request::{NUM_CONVERSATION_ROUNDS_KEY, NUM_ROUNDS_KEY};
use prisoners::dilemma::{EvalRequest, MatchController, TracingReporter};

#[derive(Debug, Parser)]
#[command(name = "prisoners", version, about = "Iterated prisoner's dilemma over A2A")]
struct Cli {
    /// Config file (defaults to ~/.prisoners/config.toml)
    #[arg(long, global = true, env = "PRISONERS_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, clap::Args)]
struct ServeArgs {
    #[arg(long)]
    host: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// URL advertised in the agent card
    #[arg(long)]
    card_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the guard agent
    Guard {
        #[command(flatten)]
        serve: ServeArgs,
    },
    /// Serve a fixed-strategy prisoner
    Prisoner {
        #[arg(long, value_enum)]
        strategy: Strategy,
        #[command(flatten)]
        serve: ServeArgs,
    },
    /// Play one match against two remote prisoners and print the result
    Run {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
        #[arg(long, default_value_t = 3)]
        rounds: u64,
        #[arg(long, default_value_t = 3)]
        turns: u64,
    },
}

impl ServeArgs {
    fn gateway_params(&self, cfg: &Config) -> GatewayParams {
        GatewayParams {
            bind: self.host.clone().unwrap_or_else(|| cfg.server.host.clone()),
            port: self.port.unwrap_or(cfg.server.port),
            card_url: self.card_url.clone().or_else(|| cfg.server.card_url.clone()),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = prisoners::logging::init_tracing(&cfg.logging, cli.log_json)?;

    tracing::debug!("Effective configuration: {:?}", cfg);

    let gateway = Arc::new(A2aGateway::new(cfg.gateway.request_timeout())?);

    match cli.command {
        Command::Guard { serve } => {
            let executor = Arc::new(GuardExecutor::new(gateway, cfg.guard.choice_retries));
            start_server(&serve.gateway_params(&cfg), executor).await
        }
        Command::Prisoner { strategy, serve } => {
            tracing::info!("Serving {} prisoner", strategy.name());
            start_server(
                &serve.gateway_params(&cfg),
                Arc::new(PrisonerExecutor::new(strategy)),
            )
            .await
        }
        Command::Run { a, b, rounds, turns } => {
            let request = EvalRequest {
                participants: HashMap::from([("a".to_string(), a), ("b".to_string(), b)]),
                config: HashMap::from([
                    (NUM_CONVERSATION_ROUNDS_KEY.to_string(), turns.into()),
                    (NUM_ROUNDS_KEY.to_string(), rounds.into()),
                ]),
            };
            let plan = request.validate()?;
            let result = MatchController::new(gateway, Arc::new(TracingReporter))
                .with_choice_retries(cfg.guard.choice_retries)
                .run_match(&plan)
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
    }
}
