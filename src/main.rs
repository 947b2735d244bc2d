//! brickpipe command line
//!
//! Runs persisted pipes, lists the available bricks and translates single
//! inputs with one brick.

use anyhow::Context as _;
use brickpipe::config::AppConfig;
use brickpipe::pipe::observer::{self, ObserverMessage};
use brickpipe::pipe::{
    BrickRegistry, BrickSpec, ChannelObserver, Pipe, PipeContext, PipeError, PipeSpec,
};
use brickpipe::Chain;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::rc::Rc;
use tokio::task::LocalSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "brickpipe", version, about = "Pipes of reversible encoders and viewers")]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load a pipe file, wait for it to settle and print every bucket
    Run {
        pipe: PathBuf,
        /// Text to write into a bucket after loading
        #[arg(long)]
        content: Option<String>,
        /// Bucket the content is written to
        #[arg(long)]
        bucket: Option<usize>,
        /// Print brick events as they happen
        #[arg(long)]
        trace_events: bool,
        /// Write the settled pipe back to this file
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// List available bricks
    List,
    /// Translate text with a single encoder
    Encode {
        brick: String,
        text: String,
        #[arg(long)]
        decode: bool,
        /// Setting as name=value; values are parsed as JSON, falling back to text
        #[arg(long = "set", value_parser = parse_setting)]
        settings: Vec<(String, serde_json::Value)>,
    },
}

fn parse_setting(arg: &str) -> Result<(String, serde_json::Value), String> {
    let (name, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", arg))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((name.to_string(), value))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::load_or_default(),
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(config.logging.ansi)
                .with_writer(std::io::stderr),
        )
        .init();

    // Bricks are `Rc` based; everything runs on one local task set.
    LocalSet::new()
        .run_until(async move {
            match cli.command {
                Command::Run {
                    pipe,
                    content,
                    bucket,
                    trace_events,
                    save,
                } => run_pipe(&config, pipe, content, bucket, trace_events, save).await,
                Command::List => {
                    list_bricks();
                    Ok(())
                }
                Command::Encode {
                    brick,
                    text,
                    decode,
                    settings,
                } => encode(&brick, text, decode, settings).await,
            }
        })
        .await
}

async fn run_pipe(
    config: &AppConfig,
    path: PathBuf,
    content: Option<String>,
    bucket: Option<usize>,
    trace_events: bool,
    save: Option<PathBuf>,
) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read pipe file {:?}", path))?;
    let spec = PipeSpec::from_json(&json).context("Failed to parse pipe file")?;

    let mut context = PipeContext::from_config(&config.pipe);
    let msg_rx = if trace_events {
        let (observer, msg_rx) = ChannelObserver::new();
        context = context.with_observer(Rc::new(observer));
        Some(msg_rx)
    } else {
        None
    };

    let pipe = Pipe::extract(&spec, context)?;
    tracing::info!(
        title = pipe.title().as_deref().unwrap_or("untitled"),
        bricks = pipe.brick_count(),
        "pipe loaded"
    );

    if let Some(content) = content {
        let bucket = bucket.unwrap_or(config.pipe.selected_bucket);
        pipe.set_content(content, bucket, None)?;
    }
    pipe.wait_until_idle().await?;

    if let Some(msg_rx) = msg_rx {
        for msg in observer::drain(&msg_rx) {
            match msg {
                ObserverMessage::Brick { title, event, .. } => eprintln!("{}: {:?}", title, event),
                ObserverMessage::Content { bucket, content } => {
                    eprintln!("bucket {} <- {} code points", bucket, content.len().unwrap_or(0))
                }
            }
        }
    }

    let bricks = pipe.bricks();
    let mut bucket = 0;
    println!("[{}] {}", bucket, pipe.content(bucket)?);
    for brick in &bricks {
        if let Some(error) = brick.last_error() {
            println!("    {} failed: {}", brick.title(), error);
        }
        if brick.is_encoder() {
            bucket += 1;
            println!("  {}", brick.title());
            println!("[{}] {}", bucket, pipe.content(bucket)?);
        }
    }

    if let Some(save) = save {
        let json = pipe.serialize()?.to_json()?;
        std::fs::write(&save, json).with_context(|| format!("Failed to write {:?}", save))?;
    }
    Ok(())
}

fn list_bricks() {
    let registry = BrickRegistry::with_builtins();
    for descriptor in registry.descriptors() {
        println!(
            "{:<10} {:<18} {:<20} {:?}",
            descriptor.category.display_name(),
            descriptor.name,
            descriptor.title,
            descriptor.kind
        );
    }
}

async fn encode(
    name: &str,
    text: String,
    decode: bool,
    settings: Vec<(String, serde_json::Value)>,
) -> anyhow::Result<()> {
    let registry = BrickRegistry::with_builtins();
    let spec = settings
        .into_iter()
        .fold(BrickSpec::new(name), |spec, (name, value)| spec.with_setting(name, value));
    let brick = registry.materialize(&spec)?;
    let encoder = brick.as_encoder().ok_or(PipeError::NotAnEncoder)?;
    let output = encoder.translate(Chain::from(text), !decode).await?;
    println!("{}", output);
    Ok(())
}
