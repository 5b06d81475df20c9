use clap::{Parser, Subcommand};
use lib::envelope::ResultEnvelope;
use lib::image::EncodedImage;
use lib::protocol::{ChatRequest, ConversationTurn, VoiceCommandRequest};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "medigate")]
#[command(about = "Medigate CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version
    Version,

    /// Create the configuration directory, a default config.json and the uploads directory.
    Init {
        /// Config file path (default: MEDIGATE_CONFIG_PATH or ~/.medigate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,
    },

    /// Run the gateway (HTTP API). The provider key comes from GOOGLE_API_KEY (or .env) or provider.apiKey.
    Gateway {
        /// Config file path (default: MEDIGATE_CONFIG_PATH or ~/.medigate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// HTTP port (default from config or 8000)
        #[arg(long, short)]
        port: Option<u16>,
    },

    /// Chat with the assistant via the gateway (interactive).
    Chat {
        /// Config file path (default: MEDIGATE_CONFIG_PATH or ~/.medigate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Handling mode: auto, medical-chat, prescription or multi-agent.
        #[arg(long, default_value = "auto")]
        mode: String,

        /// Image file attached to the first message.
        #[arg(long, value_name = "PATH")]
        image: Option<PathBuf>,
    },

    /// Parse one voice command via the gateway and print the result.
    Voice {
        /// Config file path (default: MEDIGATE_CONFIG_PATH or ~/.medigate/config.json)
        #[arg(long, short, value_name = "PATH")]
        config: Option<PathBuf>,

        /// The transcribed utterance, e.g. "add paracetamol 2 tablets".
        text: String,
    },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    lib::config::load_dotenv();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Version) => {
            println!("medigate {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init { config }) => {
            if let Err(e) = run_init(config) {
                log::error!("init failed: {}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Gateway { config, port }) => {
            if let Err(e) = run_gateway(config, port).await {
                log::error!("gateway failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Chat {
            config,
            mode,
            image,
        }) => {
            if let Err(e) = run_chat(config, mode, image).await {
                log::error!("chat failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Some(Commands::Voice { config, text }) => {
            if let Err(e) = run_voice(config, text).await {
                log::error!("voice failed: {:#}", e);
                std::process::exit(1);
            }
        }
        None => {
            println!("Run with --help for usage");
        }
    }
}

fn run_init(config_path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = config_path.unwrap_or_else(lib::config::default_config_path);
    let dir = lib::init::init_config_dir(&path)?;
    println!("initialized configuration at {}", dir.display());
    Ok(())
}

async fn run_gateway(config_path: Option<PathBuf>, port: Option<u16>) -> anyhow::Result<()> {
    let (mut config, path) = lib::config::load_config(config_path)?;
    if let Some(p) = port {
        config.gateway.port = p;
    }
    log::info!(
        "starting gateway on {}:{}",
        config.gateway.bind,
        config.gateway.port
    );
    lib::gateway::run_gateway(config, path).await
}

/// Base URL of the gateway named by the config (a wildcard bind is reached via loopback).
fn gateway_url(config_path: Option<PathBuf>) -> anyhow::Result<String> {
    let (config, _) = lib::config::load_config(config_path)?;
    let bind = match config.gateway.bind.trim() {
        "0.0.0.0" | "::" | "" => "127.0.0.1",
        b => b,
    };
    Ok(format!("http://{}:{}", bind, config.gateway.port))
}

async fn post_envelope<T: serde::Serialize>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
) -> anyhow::Result<ResultEnvelope> {
    let res = client.post(url).json(body).send().await?;
    let status = res.status();
    let envelope: ResultEnvelope = res.json().await?;
    if !status.is_success() {
        log::debug!("gateway answered {}", status);
    }
    Ok(envelope)
}

async fn run_chat(
    config_path: Option<PathBuf>,
    mode: String,
    image: Option<PathBuf>,
) -> anyhow::Result<()> {
    use std::io::{self, Write};

    let url = format!("{}/api/chat", gateway_url(config_path)?);
    let client = reqwest::Client::new();
    let mut pending_image = match image {
        Some(path) => {
            let bytes = tokio::fs::read(&path).await?;
            Some(EncodedImage::from_bytes(&bytes).as_str().to_string())
        }
        None => None,
    };
    let mut history: Vec<ConversationTurn> = Vec::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("/exit") || input.eq_ignore_ascii_case("/quit") {
            break;
        }

        let request = ChatRequest {
            message: input.to_string(),
            history: history.clone(),
            image: pending_image.take(),
            mode: Some(mode.clone()),
        };
        match post_envelope(&client, &url, &request).await {
            Ok(envelope) => {
                let reply = envelope.response.clone().unwrap_or_default();
                if envelope.success {
                    println!("< [{}] {}", envelope.agent.as_deref().unwrap_or("?"), reply.trim());
                    if let Some(data) = &envelope.data {
                        println!("{}", serde_json::to_string_pretty(data)?);
                    }
                    if envelope.requires_validation == Some(true) {
                        println!("  (review by a clinician before acting on this)");
                    }
                    history.push(ConversationTurn::user(input));
                    history.push(ConversationTurn::assistant(reply, envelope.agent));
                } else {
                    eprintln!(
                        "< {} ({})",
                        reply.trim(),
                        envelope.error.as_deref().unwrap_or("no detail")
                    );
                }
            }
            Err(e) => {
                eprintln!("chat error: {}", e);
            }
        }
    }

    Ok(())
}

async fn run_voice(config_path: Option<PathBuf>, text: String) -> anyhow::Result<()> {
    let url = format!("{}/api/voice/command", gateway_url(config_path)?);
    let client = reqwest::Client::new();
    let envelope = post_envelope(&client, &url, &VoiceCommandRequest { text }).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    if !envelope.success {
        std::process::exit(2);
    }
    Ok(())
}
