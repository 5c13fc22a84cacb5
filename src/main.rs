//! Framelink - framed relay between an agent channel and the network
//!
//! The agent channel arrives pre-established on a file descriptor
//! (descriptor 3 by default, socket-activation style). One process
//! instance runs one relay session and exits with a status code that
//! tells the supervisor which component, if any, failed.

use std::path::PathBuf;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use framelink::channel::FramedChannel;
use framelink::config::Config;
use framelink::handshake::{self, HandshakeError};
use framelink::relay::{DatagramRelay, SessionEnd, StreamRelay};
use framelink::transport::{DatagramSocket, TcpTransport};

/// Process exit codes, one per failing component, so a supervising
/// process can distinguish causes.
mod exit_code {
    /// Clean termination of both pumps.
    pub const CLEAN: i32 = 0;
    /// Agent channel failed during the handshake.
    pub const HANDSHAKE_READ: i32 = 1;
    /// Remote destination could not be reached.
    pub const HANDSHAKE_CONNECT: i32 = 2;
    /// Agent-to-remote pump failed mid-session.
    pub const AGENT_TO_REMOTE: i32 = 3;
    /// Remote-to-agent pump failed mid-session.
    pub const REMOTE_TO_AGENT: i32 = 4;
    /// Failure before any relay component ran (config, runtime, bind).
    pub const SETUP: i32 = 10;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Stream,
    Datagram,
}

fn main() {
    let args = Args::parse();

    if args.version {
        print_version();
        return;
    }

    let mode = match args.mode.as_deref() {
        Some("tcp") => Mode::Stream,
        Some("udp") => Mode::Datagram,
        Some(other) => {
            eprintln!("Unknown mode: {}. Use 'tcp' or 'udp'", other);
            std::process::exit(exit_code::SETUP);
        }
        None => {
            print_help();
            std::process::exit(exit_code::SETUP);
        }
    };

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(exit_code::SETUP);
            }
        },
        None => Config::default(),
    };

    init_logging(&config);
    info!("framelink v{} starting", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            std::process::exit(exit_code::SETUP);
        }
    };

    let code = rt.block_on(run(mode, config));
    std::process::exit(code);
}

/// Initialize logging on stderr. The agent channel may share the
/// process's stdio descriptors, so stdout is never written to.
fn init_logging(config: &Config) {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .or_else(|| config.log.level.parse().ok())
        .unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Run one relay session and map its outcome to an exit code.
async fn run(mode: Mode, config: Config) -> i32 {
    let agent = match agent_channel(config.agent.fd) {
        Ok(agent) => agent,
        Err(e) => {
            error!("Could not acquire agent channel: {}", e);
            return exit_code::SETUP;
        }
    };

    let (mut agent_reader, mut agent_writer) = FramedChannel::new(agent).split();

    match mode {
        Mode::Stream => {
            let transport = TcpTransport::new();
            let (endpoint, remote) =
                match handshake::establish(&mut agent_reader, &mut agent_writer, &transport).await
                {
                    Ok(connected) => connected,
                    Err(e @ HandshakeError::Agent(_)) => {
                        error!("{}", e);
                        return exit_code::HANDSHAKE_READ;
                    }
                    Err(e @ HandshakeError::Connect { .. }) => {
                        error!("{}", e);
                        return exit_code::HANDSHAKE_CONNECT;
                    }
                };

            info!("relaying stream session to {}", endpoint);
            let end = StreamRelay::new()
                .with_chunk_limit(config.relay.chunk_size)
                .run(agent_reader, agent_writer, remote)
                .await;
            session_exit(end)
        }
        Mode::Datagram => {
            let socket = match DatagramSocket::bind_ephemeral().await {
                Ok(socket) => socket,
                Err(e) => {
                    error!("Could not bind datagram socket: {}", e);
                    return exit_code::SETUP;
                }
            };

            match socket.local_endpoint() {
                Ok(local) => info!("relaying datagram session from {}", local),
                Err(_) => info!("relaying datagram session"),
            }

            let end = DatagramRelay::new()
                .with_chunk_limit(config.relay.chunk_size)
                .run(agent_reader, agent_writer, socket)
                .await;
            session_exit(end)
        }
    }
}

fn session_exit(end: SessionEnd) -> i32 {
    match end {
        SessionEnd::Clean => {
            info!("session ended cleanly");
            exit_code::CLEAN
        }
        SessionEnd::AgentToRemote(e) => {
            error!("agent->remote pump failed: {}", e);
            exit_code::AGENT_TO_REMOTE
        }
        SessionEnd::RemoteToAgent(e) => {
            error!("remote->agent pump failed: {}", e);
            exit_code::REMOTE_TO_AGENT
        }
    }
}

/// Wrap the pre-established agent channel descriptor.
#[cfg(unix)]
fn agent_channel(fd: i32) -> framelink::Result<tokio::net::UnixStream> {
    use std::os::unix::io::FromRawFd;

    // Safety: the supervisor hands this descriptor over already open
    // and connected, and nothing else in the process owns it.
    let stream = unsafe { std::os::unix::net::UnixStream::from_raw_fd(fd) };
    stream.set_nonblocking(true)?;
    Ok(tokio::net::UnixStream::from_std(stream)?)
}

#[cfg(not(unix))]
fn agent_channel(_fd: i32) -> framelink::Result<tokio::net::UnixStream> {
    Err(framelink::Error::Config(
        "agent channel acquisition requires a Unix platform".into(),
    ))
}

/// Command line arguments
struct Args {
    mode: Option<String>,
    config: Option<PathBuf>,
    version: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut mode = None;
        let mut config = None;
        let mut version = false;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "-c" | "--config" => {
                    if i + 1 < args.len() {
                        config = Some(PathBuf::from(&args[i + 1]));
                        i += 1;
                    }
                }
                "-v" | "--version" => version = true,
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                arg if !arg.starts_with('-') && mode.is_none() => {
                    mode = Some(arg.to_string());
                }
                _ => {}
            }
            i += 1;
        }

        Self {
            mode,
            config,
            version,
        }
    }
}

fn print_help() {
    println!(
        r#"Framelink - framed relay between an agent channel and the network

USAGE:
    framelink <MODE> [OPTIONS]

MODES:
    tcp                     Relay one stream connection (handshake first)
    udp                     Relay datagrams through one shared socket

OPTIONS:
    -c, --config <FILE>     Path to JSON configuration file
    -v, --version           Print version information
    -h, --help              Print help information

The agent channel must arrive pre-established on file descriptor 3
(configurable via agent.fd). Diagnostics go to stderr.

EXIT CODES:
    0   clean termination of both pumps
    1   handshake failed reading from the agent channel
    2   handshake failed connecting to the destination
    3   agent->remote pump failure
    4   remote->agent pump failure
    10  setup failure before the relay started
"#
    );
}

fn print_version() {
    println!("framelink v{}", env!("CARGO_PKG_VERSION"));
}
