//! devlink CLI - drive a WiFi companion board from the command line
//!
//! One subcommand per board capability. Results go to stdout, diagnostics
//! to stderr or a log file, and the exit code tells scripts what happened.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use devlink_core::cli::{format_reply, print_exit_codes, OutputFormat, Reply};
use devlink_core::config::LoggingConfig;
use devlink_core::core::logger::generate_log_filename;
use devlink_core::core::transport::list_ports;
use devlink_core::{
    AppConfig, CliResult, DevboardClient, DeviceTemplates, HttpMethod, LineTransport, LogFormat, Session,
    SessionConfig, SerialConfig, TcpConfig, Transport, TransportError,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// LED state
#[derive(Debug, Clone, Copy, ValueEnum)]
enum LedState {
    /// Flash while processing
    On,
    /// Stay dark
    Off,
}

/// devlink CLI
#[derive(Parser, Debug)]
#[command(
    name = "devlink",
    version,
    about = "Client for WiFi companion boards speaking the bracket-tag serial protocol",
    long_about = None
)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serial port name (e.g., COM3, /dev/ttyACM0)
    #[arg(short, long, global = true, env = "DEVLINK_PORT")]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Reach the board through a serial-to-TCP bridge at host:port
    #[arg(long, global = true, conflicts_with = "port")]
    tcp: Option<String>,

    /// Drop reply lines longer than this many bytes
    #[arg(long, global = true, value_name = "BYTES")]
    max_line_length: Option<usize>,

    /// Talk to a built-in virtual board instead of hardware
    #[arg(long, global = true)]
    simulate: bool,

    /// Output format
    #[arg(short, long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Record board traffic to this file
    #[arg(long, global = true)]
    transcript: Option<PathBuf>,

    /// Transcript format
    #[arg(long, global = true, value_enum)]
    transcript_format: Option<TranscriptFormat>,

    /// Write diagnostics to this file as JSON lines
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TranscriptFormat {
    Text,
    Hex,
    Csv,
    Json,
}

impl From<TranscriptFormat> for LogFormat {
    fn from(format: TranscriptFormat) -> Self {
        match format {
            TranscriptFormat::Text => LogFormat::Text,
            TranscriptFormat::Hex => LogFormat::Hex,
            TranscriptFormat::Csv => LogFormat::Csv,
            TranscriptFormat::Json => LogFormat::JsonLines,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available serial ports
    ListPorts,

    /// Check that the board answers
    Ping,

    /// Join the saved WiFi network
    Connect,

    /// Leave the WiFi network
    Disconnect,

    /// Scan for WiFi networks
    Scan,

    /// Store WiFi credentials on the board
    Save {
        /// Network name
        #[arg(long)]
        ssid: String,

        /// Network password
        #[arg(long)]
        password: String,
    },

    /// Show the board's IP address
    Ip {
        /// Address on the joined network instead
        #[arg(long)]
        wifi: bool,
    },

    /// List commands the firmware supports
    Commands,

    /// Switch the activity LED
    Led {
        /// Desired state
        #[arg(value_enum)]
        state: LedState,
    },

    /// HTTP GET
    Get {
        /// Request URL
        url: String,

        /// Headers as a JSON object
        #[arg(long)]
        headers: Option<String>,
    },

    /// HTTP GET with the body relayed as raw bytes
    GetBytes {
        /// Request URL
        url: String,

        /// Headers as a JSON object
        #[arg(long, default_value = "{}")]
        headers: String,
    },

    /// HTTP POST
    Post {
        /// Request URL
        url: String,

        /// Headers as a JSON object
        #[arg(long, default_value = "{}")]
        headers: String,

        /// Request body as JSON
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// HTTP PUT
    Put {
        /// Request URL
        url: String,

        /// Headers as a JSON object
        #[arg(long, default_value = "{}")]
        headers: String,

        /// Request body as JSON
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// HTTP DELETE
    Delete {
        /// Request URL
        url: String,

        /// Headers as a JSON object
        #[arg(long, default_value = "{}")]
        headers: String,

        /// Request body as JSON
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// Extract a key from a JSON document on the board
    Parse {
        /// Key to extract
        key: String,

        /// JSON document
        data: String,
    },

    /// Extract an array element from a JSON document on the board
    ParseArray {
        /// Array key
        key: String,

        /// Element index
        index: usize,

        /// JSON document
        data: String,
    },

    /// Open a WebSocket on the board
    WsStart {
        /// WebSocket URL
        url: String,

        /// Remote port
        #[arg(value_name = "PORT")]
        remote_port: u16,

        /// Headers as a JSON object
        #[arg(long, default_value = "{}")]
        headers: String,
    },

    /// Close the board's WebSocket
    WsStop,

    /// Ping, addresses and WiFi state in one go
    Status,

    /// Show exit codes
    ExitCodes,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Self::ListPorts => "list-ports",
            Self::Ping => "ping",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::Scan => "scan",
            Self::Save { .. } => "save",
            Self::Ip { .. } => "ip",
            Self::Commands => "commands",
            Self::Led { .. } => "led",
            Self::Get { .. } => "get",
            Self::GetBytes { .. } => "get-bytes",
            Self::Post { .. } => "post",
            Self::Put { .. } => "put",
            Self::Delete { .. } => "delete",
            Self::Parse { .. } => "parse",
            Self::ParseArray { .. } => "parse-array",
            Self::WsStart { .. } => "ws-start",
            Self::WsStop => "ws-stop",
            Self::Status => "status",
            Self::ExitCodes => "exit-codes",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match run(&cli).await {
        Ok(result) => result,
        Err(e) => CliResult::error(devlink_core::ExitCodes::ERROR, format!("{e:#}")),
    };

    if let CliResult::Error(_, ref msg) = result {
        eprintln!("error: {msg}");
    }
    result.to_exit_code()
}

async fn run(cli: &Cli) -> anyhow::Result<CliResult> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => return Ok(e.into()),
    };

    let _guard = init_tracing(cli, &config.logging)?;

    match &cli.command {
        Commands::ExitCodes => {
            print_exit_codes();
            return Ok(CliResult::success());
        }
        Commands::ListPorts => return Ok(show_ports(cli)),
        _ => {}
    }

    let session_config = match session_config(cli, &config) {
        Ok(session_config) => session_config,
        Err(e) => return Ok(e.into()),
    };

    let session = if cli.simulate {
        Session::with_transport(
            Box::new(DeviceTemplates::wifi_devboard()),
            session_config.policy,
            session_config.dialect,
            session_config.transcript,
        )
    } else {
        Session::open(session_config).await
    };
    let mut session = match session {
        Ok(session) => session,
        Err(e) => return Ok(e.into()),
    };

    let outcome = execute(&cli.command, session.client()).await;

    if let Err(e) = session.close().await {
        tracing::warn!("Closing the link failed: {}", e);
    }

    Ok(match outcome {
        Ok(reply) => {
            println!("{}", format_reply(cli.command.name(), &reply, cli.format));
            if reply.succeeded() {
                CliResult::success()
            } else {
                CliResult::protocol_error(format!("{} failed", cli.command.name()))
            }
        }
        Err(e) => e.into(),
    })
}

fn init_tracing(cli: &Cli, logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_file = cli.log_file.as_ref().or(logging.log_file.as_ref());
    match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).map_or_else(|| PathBuf::from("."), PathBuf::from);
            let file_name = path
                .file_name()
                .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

            let appender = tracing_appender::rolling::never(&dir, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(non_blocking)
                        .with_target(true)
                        .json(),
                )
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

fn session_config(cli: &Cli, config: &AppConfig) -> Result<SessionConfig, TransportError> {
    let mut session = config.session_config();

    if let Some(ref target) = cli.tcp {
        session.transport = Transport::Tcp(TcpConfig::parse(target)?);
    } else if cli.port.is_some() || cli.baud.is_some() {
        let mut serial = match session.transport {
            Transport::Serial(serial) => serial,
            Transport::Tcp(_) => SerialConfig::default(),
        };
        if let Some(ref port) = cli.port {
            serial.port.clone_from(port);
        }
        if let Some(baud) = cli.baud {
            serial.baud_rate = baud;
        }
        session.transport = Transport::Serial(serial);
    }

    if let Some(limit) = cli.max_line_length {
        match session.transport {
            Transport::Serial(ref mut serial) => serial.max_line_length = limit,
            Transport::Tcp(ref mut tcp) => tcp.max_line_length = limit,
        }
    }

    if let Some(ref path) = cli.transcript {
        let format = cli
            .transcript_format
            .map_or(config.logging.transcript_format, LogFormat::from);
        // a directory gets a fresh timestamped file per run
        let path = if path.is_dir() {
            path.join(generate_log_filename("devlink", format))
        } else {
            path.clone()
        };
        session.transcript = Some((path, format));
    }

    Ok(session)
}

fn show_ports(cli: &Cli) -> CliResult {
    let ports = match list_ports() {
        Ok(ports) => ports,
        Err(e) => return e.into(),
    };

    let names: Vec<String> = ports.into_iter().map(|p| p.port_name).collect();
    if names.is_empty() && cli.format == OutputFormat::Text {
        if !cli.quiet {
            println!("No serial ports found.");
        }
        return CliResult::success();
    }

    println!("{}", format_reply("list-ports", &Reply::Ports(names), cli.format));
    CliResult::success()
}

async fn execute<T: LineTransport>(command: &Commands, client: &mut DevboardClient<T>) -> Result<Reply, TransportError> {
    let reply = match command {
        Commands::Ping => Reply::Flag(client.ping().await?),
        Commands::Connect => Reply::Flag(client.connect_wifi().await?),
        Commands::Disconnect => Reply::Flag(client.disconnect_wifi().await?),
        Commands::Scan => Reply::Text(client.scan_wifi().await?),
        Commands::Save { ssid, password } => Reply::Flag(client.save_wifi(ssid, password).await?),
        Commands::Ip { wifi: true } => Reply::Text(client.ip_wifi().await?),
        Commands::Ip { wifi: false } => Reply::Text(client.ip_address().await?),
        Commands::Commands => Reply::Text(client.list_commands().await?),
        Commands::Led { state: LedState::On } => {
            client.led_on().await?;
            Reply::Sent
        }
        Commands::Led { state: LedState::Off } => {
            client.led_off().await?;
            Reply::Sent
        }
        Commands::Get { url, headers } => {
            let headers = headers.as_deref().unwrap_or_default();
            Reply::Text(client.request(HttpMethod::Get, url, headers, "").await?)
        }
        Commands::GetBytes { url, headers } => Reply::Text(client.get_request_bytes(url, headers).await?),
        Commands::Post { url, headers, payload } => {
            Reply::Text(client.request(HttpMethod::Post, url, headers, payload).await?)
        }
        Commands::Put { url, headers, payload } => {
            Reply::Text(client.request(HttpMethod::Put, url, headers, payload).await?)
        }
        Commands::Delete { url, headers, payload } => {
            Reply::Text(client.request(HttpMethod::Delete, url, headers, payload).await?)
        }
        Commands::Parse { key, data } => Reply::Text(client.parse_json(key, data).await?),
        Commands::ParseArray { key, index, data } => Reply::Text(client.parse_json_array(key, *index, data).await?),
        Commands::WsStart { url, remote_port, headers } => {
            Reply::Flag(client.websocket_start(url, *remote_port, headers).await?)
        }
        Commands::WsStop => Reply::Flag(client.websocket_stop().await?),
        Commands::Status => Reply::Status(client.status().await?),
        Commands::ListPorts | Commands::ExitCodes => {
            return Err(TransportError::ConfigError(format!(
                "{} does not use the board",
                command.name()
            )))
        }
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_tcp_overrides_config() {
        let cli = Cli::parse_from(["devlink", "--tcp", "10.0.0.5:2323", "ping"]);
        let session = session_config(&cli, &AppConfig::default()).unwrap();
        assert!(matches!(session.transport, Transport::Tcp(ref tcp) if tcp.port == 2323));
    }

    #[test]
    fn test_port_and_baud_override_serial() {
        let cli = Cli::parse_from(["devlink", "ping", "--port", "/dev/ttyUSB1", "--baud", "9600"]);
        let session = session_config(&cli, &AppConfig::default()).unwrap();
        match session.transport {
            Transport::Serial(serial) => {
                assert_eq!(serial.port, "/dev/ttyUSB1");
                assert_eq!(serial.baud_rate, 9600);
            }
            Transport::Tcp(_) => panic!("expected serial link"),
        }
    }

    #[test]
    fn test_line_limit_applies_to_either_link() {
        let cli = Cli::parse_from(["devlink", "--tcp", "bridge:23", "--max-line-length", "2048", "ping"]);
        let session = session_config(&cli, &AppConfig::default()).unwrap();
        assert!(matches!(session.transport, Transport::Tcp(ref tcp) if tcp.max_line_length == 2048));

        let cli = Cli::parse_from(["devlink", "ping", "--max-line-length", "512"]);
        let session = session_config(&cli, &AppConfig::default()).unwrap();
        assert!(matches!(session.transport, Transport::Serial(ref serial) if serial.max_line_length == 512));
    }

    #[test]
    fn test_transcript_directory_gets_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().to_string_lossy().into_owned();
        let cli = Cli::parse_from(["devlink", "--transcript", target.as_str(), "--transcript-format", "csv", "ping"]);

        let session = session_config(&cli, &AppConfig::default()).unwrap();
        let (path, format) = session.transcript.unwrap();
        assert_eq!(format, LogFormat::Csv);
        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.extension().is_some_and(|ext| ext == "csv"));
    }

    #[tokio::test]
    async fn test_execute_against_virtual_board() {
        let mut client = DevboardClient::new(DeviceTemplates::wifi_devboard());
        let cli = Cli::parse_from(["devlink", "get", "https://httpbin.org/get"]);

        let reply = execute(&cli.command, &mut client).await.unwrap();
        assert!(reply.succeeded());
        assert_eq!(client.transport().written(), ["[GET]https://httpbin.org/get"]);
    }
}
