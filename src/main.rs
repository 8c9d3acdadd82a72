use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use frontdesk_voice::{
    allow_origins, create_router, AppState, BusinessConfig, Config, SessionBackend, SessionBridge,
    SessionError, SessionListener, Speaker, StartOptions, Tone, Voice,
};
use tokio::sync::Notify;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "frontdesk-voice", version, about = "Live voice sessions for the FrontDesk AI receptionist")]
struct Cli {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/frontdesk-voice")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Place a test call through the microphone and speakers
    Call {
        #[command(flatten)]
        business: BusinessArgs,

        /// Use the demo assistant when one is configured
        #[arg(long)]
        demo: bool,

        /// Override the configured backend (live or assistant)
        #[arg(long, value_parser = parse_backend)]
        backend: Option<SessionBackend>,

        /// Hang up after this many seconds
        #[arg(long)]
        max_duration: Option<u64>,
    },
    /// Resolve or create the assistant for a business and print its id
    Provision {
        #[command(flatten)]
        business: BusinessArgs,

        #[arg(long)]
        demo: bool,
    },
    /// Run the HTTP control API
    Serve,
}

#[derive(Args)]
struct BusinessArgs {
    #[arg(long)]
    name: String,

    #[arg(long, default_value = "General")]
    industry: String,

    /// professional, friendly or enthusiastic
    #[arg(long, default_value = "professional", value_parser = parse_tone)]
    tone: Tone,

    /// Zephyr, Puck, Charon, Kore or Fenrir
    #[arg(long, default_value = "Kore", value_parser = parse_voice)]
    voice: Voice,

    #[arg(long, default_value = "")]
    instructions: String,
}

impl From<BusinessArgs> for BusinessConfig {
    fn from(args: BusinessArgs) -> Self {
        Self {
            name: args.name,
            industry: args.industry,
            tone: args.tone,
            voice: args.voice,
            instructions: args.instructions,
        }
    }
}

fn parse_tone(value: &str) -> Result<Tone, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase())).map_err(|e| e.to_string())
}

fn parse_voice(value: &str) -> Result<Voice, String> {
    serde_json::from_value(serde_json::Value::String(value.to_string())).map_err(|e| e.to_string())
}

fn parse_backend(value: &str) -> Result<SessionBackend, String> {
    serde_json::from_value(serde_json::Value::String(value.to_lowercase()))
        .map_err(|_| format!("unknown backend '{}' (expected live or assistant)", value))
}

/// Prints the conversation as it happens
struct ConsoleListener {
    ended: Notify,
}

impl SessionListener for ConsoleListener {
    fn on_transcript(&self, text: &str, speaker: Speaker) {
        let label = match speaker {
            Speaker::User => "you",
            Speaker::Agent => "agent",
        };
        println!("{:>5}: {}", label, text);
    }

    fn on_interrupted(&self) {
        println!("  (agent interrupted)");
    }

    fn on_error(&self, error: &SessionError) {
        warn!("Call error: {}", error);
    }

    fn on_call_start(&self) {
        info!("Call is live, press Ctrl+C to hang up");
    }

    fn on_call_end(&self) {
        self.ended.notify_one();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = Config::load(&cli.config)?;

    info!("FrontDesk Voice v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Call {
            business,
            demo,
            backend,
            max_duration,
        } => {
            if let Some(backend) = backend {
                cfg.session.backend = backend;
            }
            run_call(&cfg, business.into(), demo, max_duration).await
        }
        Command::Provision { business, demo } => run_provision(&cfg, business.into(), demo).await,
        Command::Serve => run_server(cfg).await,
    }
}

async fn run_call(
    cfg: &Config,
    business: BusinessConfig,
    use_demo_assistant: bool,
    max_duration: Option<u64>,
) -> Result<()> {
    let bridge = SessionBridge::from_config(cfg);
    let listener = Arc::new(ConsoleListener {
        ended: Notify::new(),
    });

    let handle = bridge
        .start_session(
            &business,
            StartOptions { use_demo_assistant },
            Arc::clone(&listener) as Arc<dyn SessionListener>,
        )
        .await
        .context("Failed to start call")?;

    let limit = async {
        match max_duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Hanging up"),
        _ = listener.ended.notified() => info!("Call ended by remote"),
        _ = limit => info!("Maximum call duration reached"),
    }

    handle.stop().await;

    let stats = handle.stats();
    info!(
        "Call lasted {:.1}s: {} frames sent, {} dropped, {} chunks played, {} interruptions",
        stats.duration_secs,
        stats.frames_sent,
        stats.frames_dropped,
        stats.chunks_scheduled,
        stats.interruptions
    );

    for utterance in handle.history() {
        println!("{:?}: {}", utterance.speaker, utterance.text);
    }

    Ok(())
}

async fn run_provision(cfg: &Config, business: BusinessConfig, use_demo_assistant: bool) -> Result<()> {
    let bridge = SessionBridge::from_config(cfg);
    let id = bridge
        .provisioner()
        .resolve(&business, use_demo_assistant)
        .await
        .context("Failed to resolve assistant")?;

    println!("{}", id);
    Ok(())
}

async fn run_server(cfg: Config) -> Result<()> {
    let bridge = Arc::new(SessionBridge::from_config(&cfg));
    let app = allow_origins(
        create_router(AppState::new(bridge)),
        &cfg.service.http.allowed_origins,
    );

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("HTTP server failed")?;

    Ok(())
}
