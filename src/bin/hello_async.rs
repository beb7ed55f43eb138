//! Command-line host for the task bridge.
//!
//! Plays the part of an embedding runtime: owns the context thread, submits
//! `helloAsync` invocations and drains their completions, printing each
//! callback as `(error, result)`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::info;

use hello_async::{hello_async, HelloConfig, HostContext, TaskBridge, TokioWorkerPool};

#[derive(Debug, Parser)]
#[command(name = "hello-async", version, about = "Run helloAsync through the task bridge")]
struct Cli {
    /// Emphasize the greeting
    #[arg(long)]
    louder: bool,

    /// Deliver the result as a byte buffer
    #[arg(long)]
    buffer: bool,

    /// Number of invocations to submit back-to-back
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Seconds to wait for all callbacks
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    /// TOML config file (falls back to HELLO_ASYNC_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug)]
enum ConsoleValue {
    Null,
    Error(String),
    Text(String),
    Bytes(Vec<u8>),
}

impl std::fmt::Display for ConsoleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsoleValue::Null => write!(f, "null"),
            ConsoleValue::Error(msg) => write!(f, "Error: {}", msg),
            ConsoleValue::Text(text) => write!(f, "{:?}", text),
            ConsoleValue::Bytes(bytes) => write!(f, "<Buffer {} bytes>", bytes.len()),
        }
    }
}

/// Invocation number; printed alongside each result.
#[derive(Debug)]
struct Label(usize);

#[derive(Debug, Default)]
struct ConsoleHost {
    delivered: usize,
}

impl HostContext for ConsoleHost {
    type Value = ConsoleValue;
    type Callback = Label;
    type Error = std::convert::Infallible;

    fn null(&mut self) -> Result<ConsoleValue, Self::Error> {
        Ok(ConsoleValue::Null)
    }

    fn error_value(&mut self, message: &str) -> Result<ConsoleValue, Self::Error> {
        Ok(ConsoleValue::Error(message.to_string()))
    }

    fn text_value(&mut self, text: String) -> Result<ConsoleValue, Self::Error> {
        Ok(ConsoleValue::Text(text))
    }

    fn bytes_value(&mut self, bytes: Vec<u8>) -> Result<ConsoleValue, Self::Error> {
        Ok(ConsoleValue::Bytes(bytes))
    }

    fn invoke(
        &mut self,
        callback: Label,
        error: ConsoleValue,
        result: ConsoleValue,
    ) -> Result<(), Self::Error> {
        self.delivered += 1;
        println!("#{} ({}, {})", callback.0, error, result);
        Ok(())
    }
}

fn main() -> Result<()> {
    hello_async::logging::init_tracing();
    let cli = Cli::parse();

    let config = HelloConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let pool = TokioWorkerPool::new(&config.pool).context("starting worker pool")?;
    let bridge = TaskBridge::new(Arc::new(pool));
    let greeting = Arc::new(config.greeting);
    let options = json!({ "louder": cli.louder, "buffer": cli.buffer });

    let mut host = ConsoleHost::default();
    for n in 0..cli.count {
        hello_async(&bridge, &mut host, &greeting, &options, Label(n))
            .unwrap_or_else(|never| match never {});
    }

    bridge
        .run_until_idle(&mut host, Duration::from_secs(cli.timeout_secs))
        .context("waiting for callbacks")?;
    info!(delivered = host.delivered, "All callbacks delivered");
    Ok(())
}
