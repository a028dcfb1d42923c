use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use dialoguer::{Input, Select};
use duet::client::{
    BoundMedia, EngineCommand, EngineConfig, EngineEvent, LobbyBridge, MediaSink,
    NegotiationEngine, RtcTransportFactory, SampleMediaSource, SimulatedTransportFactory,
    Surface, TransportFactory, WsSignalClient,
};
use duet::ConnectionId;
use duet::server::{DEFAULT_PORT, ServerConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "duet", about = "Two-party video calls over a tiny signaling server")]
struct Cli {
    /// Log filter used when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the signaling server.
    Serve {
        #[arg(long, env = "DUET_BIND", default_value_t = SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)))]
        bind: SocketAddr,

        /// STUN urls handed to clients, comma separated.
        #[arg(long, env = "DUET_STUN", value_delimiter = ',')]
        stun: Vec<String>,

        /// Hand clients no ICE servers at all.
        #[arg(long, conflicts_with = "stun")]
        no_stun: bool,
    },
    /// Join a room and take part in a call.
    Join {
        #[arg(long, env = "DUET_SERVER", default_value = "ws://127.0.0.1:8000/ws")]
        server: String,

        #[arg(long, env = "DUET_EMAIL")]
        email: Option<String>,

        #[arg(long, env = "DUET_ROOM")]
        room: Option<String>,

        #[arg(long, value_enum, default_value_t = TransportKind::Rtc)]
        transport: TransportKind,

        /// Call whoever joins the room without asking.
        #[arg(long)]
        auto_call: bool,

        /// No action menu; run until interrupted.
        #[arg(long)]
        headless: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TransportKind {
    Rtc,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Call,
    Send,
    Leave,
    Quit,
}

const ACTIONS: [(&str, Action); 4] = [
    ("call the other participant", Action::Call),
    ("send my streams", Action::Send),
    ("leave the room", Action::Leave),
    ("quit", Action::Quit),
];

/// Prints what would be rendered.
struct ConsoleSink;

impl MediaSink for ConsoleSink {
    fn bind(&self, surface: &Surface, media: &BoundMedia) {
        let tracks = match media {
            BoundMedia::Local(handle) => handle.tracks.len(),
            BoundMedia::Remote(remote) => remote.len(),
        };
        match surface {
            Surface::Local => println!("{} {} track(s)", "[local]".cyan().bold(), tracks),
            Surface::Remote(peer) => {
                println!("{} {} track(s) from {}", "[remote]".magenta().bold(), tracks, peer)
            }
        }
    }

    fn clear(&self, surface: &Surface) {
        match surface {
            Surface::Local => println!("{} cleared", "[local]".cyan()),
            Surface::Remote(peer) => println!("{} {} gone", "[remote]".magenta(), peer),
        }
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    match cli.command {
        Commands::Serve {
            bind,
            stun,
            no_stun,
        } => {
            let mut config = ServerConfig::default().with_bind_addr(bind);
            if no_stun || !stun.is_empty() {
                config = config.with_stun_servers(stun);
            }
            println!("{}", format!("Serving on ws://{}/ws", bind).green().bold());
            duet::server::serve(config).await
        }
        Commands::Join {
            server,
            email,
            room,
            transport,
            auto_call,
            headless,
        } => {
            let email = prompt_if_missing(email, "email")?;
            let room = prompt_if_missing(room, "room")?;
            join(&server, &email, &room, transport, auto_call, headless).await
        }
    }
}

fn prompt_if_missing(value: Option<String>, field: &str) -> Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::<String>::new()
            .with_prompt(field)
            .interact_text()
            .with_context(|| format!("failed to read {}", field)),
    }
}

async fn join(
    server: &str,
    email: &str,
    room: &str,
    transport: TransportKind,
    auto_call: bool,
    headless: bool,
) -> Result<()> {
    let client = WsSignalClient::connect(server)
        .await
        .with_context(|| format!("failed to reach {}", server))?;
    let (sender, inbound, _guard) = client.into_parts();

    let transports: Arc<dyn TransportFactory> = match transport {
        TransportKind::Rtc => Arc::new(RtcTransportFactory),
        TransportKind::Simulated => Arc::new(SimulatedTransportFactory::new()),
    };
    let config = EngineConfig {
        auto_call,
        ..Default::default()
    };
    let (engine, mut events) = NegotiationEngine::new(
        config,
        Arc::new(sender.clone()),
        Arc::new(SampleMediaSource::new().with_silence()),
        transports,
    );
    let engine = engine.with_sink(Arc::new(ConsoleSink));

    let (commands, command_rx) = mpsc::unbounded_channel();
    let engine_task = tokio::spawn(engine.run(inbound, command_rx));

    let mut lobby = LobbyBridge::new(Arc::new(sender));
    lobby
        .submit(email, room)
        .await
        .context("failed to request the room")?;
    println!("{}", format!("Joining '{}' as {}...", room, email).yellow());

    let (action_tx, mut actions) = mpsc::unbounded_channel();
    if !headless {
        tokio::task::spawn_blocking(move || prompt_actions(action_tx));
    }

    // Whoever the last call was with; target of "send my streams".
    let mut peer: Option<ConnectionId> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else {
                    bail!("connection to the server closed");
                };
                match &event {
                    EngineEvent::Joined(room) => {
                        lobby.on_room_joined(room);
                    }
                    EngineEvent::StateChanged { peer: id, .. } => peer = Some(*id),
                    EngineEvent::SessionClosed(id) if peer == Some(*id) => peer = None,
                    _ => {}
                }
                report(&event);
            }

            Some(action) = actions.recv() => {
                let command = match action {
                    Action::Call => EngineCommand::CallUser,
                    Action::Send => match peer {
                        Some(id) => EngineCommand::SendStreams(id),
                        None => {
                            println!("{}", "No call to send streams into.".yellow());
                            continue;
                        }
                    },
                    Action::Leave => EngineCommand::Leave,
                    Action::Quit => EngineCommand::Shutdown,
                };
                commands
                    .send(command)
                    .context("engine is no longer running")?;
                if matches!(action, Action::Leave | Action::Quit) {
                    break;
                }
            }

            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, leaving");
                let _ = commands.send(EngineCommand::Leave);
                break;
            }
        }
    }

    let _ = commands.send(EngineCommand::Shutdown);
    if let Err(e) = engine_task.await {
        warn!("Engine task ended abnormally: {}", e);
    }
    println!("{}", "Bye.".green());
    Ok(())
}

fn prompt_actions(actions: mpsc::UnboundedSender<Action>) {
    let labels: Vec<&str> = ACTIONS.iter().map(|(label, _)| *label).collect();
    loop {
        let choice = match Select::new().items(&labels).default(0).interact() {
            Ok(choice) => choice,
            Err(e) => {
                warn!("Prompt failed: {}", e);
                return;
            }
        };
        let action = ACTIONS[choice].1;
        if actions.send(action).is_err() || matches!(action, Action::Leave | Action::Quit) {
            return;
        }
    }
}

fn report(event: &EngineEvent) {
    match event {
        EngineEvent::Joined(room) => println!("{}", format!("In room '{}'", room).green().bold()),
        EngineEvent::PeerJoined { peer, email } => {
            println!("{} {} ({})", "joined:".green(), email, peer)
        }
        EngineEvent::PeerLeft { peer, email } => {
            println!("{} {} ({})", "left:".yellow(), email, peer)
        }
        EngineEvent::StateChanged { peer, state } => {
            println!("{} {} -> {}", "call:".blue(), peer, state)
        }
        EngineEvent::TransportState { peer, state } => {
            println!("{} {} is {}", "link:".blue(), peer, state)
        }
        EngineEvent::SessionClosed(peer) => println!("{} {}", "closed:".yellow(), peer),
        EngineEvent::MediaUnavailable(reason) => {
            println!("{} {}", "no media:".red().bold(), reason)
        }
        EngineEvent::SessionError { peer, error } => {
            println!("{} {}: {}", "error:".red(), peer, error)
        }
        EngineEvent::CallFailed { peer, reason } => {
            println!("{} {}: {}", "call failed:".red().bold(), peer, reason)
        }
        EngineEvent::ServerError(message) => println!("{} {}", "server:".red(), message),
        EngineEvent::LocalMedia(_) | EngineEvent::RemoteMedia { .. } => {}
    }
}
