#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

mod args;

use args::{Args, Command};
use cerebro_config::Config;
use cerebro_llm::{AbortSignal, ChatRequest, KNOWN_PROVIDERS, Message, create_provider};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if matches!(args.command, Command::Providers) {
        for id in KNOWN_PROVIDERS {
            println!("{id}");
        }
        return Ok(());
    }

    let config = Config::load(&args.config)?;
    cerebro_telemetry::init(config.telemetry.as_ref(), args.log.as_deref())?;

    tracing::debug!(config_path = %args.config.display(), "starting cerebro");

    let provider = create_provider(&config.brain)?;

    match args.command {
        Command::Ping => {
            provider.ping().await?;
            println!("{} ({}) is reachable", provider.name(), config.brain.model);
        }
        Command::Chat { message, system } => {
            let request = ChatRequest::new(system.unwrap_or_default(), vec![Message::user(message)]);

            let signal = AbortSignal::new();
            let interrupt = signal.clone();
            tokio::spawn(async move {
                interrupt_signal().await;
                interrupt.abort("interrupted");
            });

            let result = provider.chat(&request, Some(&signal)).await?;

            if !result.text().is_empty() {
                println!("{}", result.text());
            }
            for call in result.tool_calls() {
                println!("[tool call {}] {}({})", call.id, call.name, serde_json::Value::Object(call.input.clone()));
            }
        }
        Command::Providers => {}
    }

    Ok(())
}

/// Wait for Ctrl-C
async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("interrupt received, aborting request");
}
