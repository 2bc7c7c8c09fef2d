//! Command-line surface and the interactive setup prompt.
//!
//! Connection parameters come from one of two places: command-line options
//! (all-or-nothing: supplying any of host/port/key makes host and key
//! required) or the interactive prompt, which asks for host, port, and key
//! with per-field validation and honors the shutdown signal mid-read.
//!
//! clap's automatic `-h` help short flag is disabled so `-h` can mean
//! `--host`; `--help` remains available as a long flag.

use std::io::Write;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::info;

use speechlink_core::config::{
    parse_port, validate_host, validate_key, ConfigError, ConnectionParams, DEFAULT_PORT,
};

/// Remote screen-reader relay client.
#[derive(Debug, Parser)]
#[command(
    name = "speechlink",
    about = "Remote screen-reader relay client",
    disable_help_flag = true
)]
pub struct Cli {
    /// Relay server hostname or IP address.
    #[arg(short = 'h', long)]
    pub host: Option<String>,

    /// Relay server port (default 6837).
    #[arg(short = 'p', long)]
    pub port: Option<u16>,

    /// Connection key identifying the shared channel.
    #[arg(short = 'k', long)]
    pub key: Option<String>,

    /// Toggle shortcut for keyboard forwarding (e.g. ctrl+win+f11).
    #[arg(short = 's', long)]
    pub shortcut: Option<String>,

    /// Enable debug logging (INFO level).
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Enable verbose debug logging.
    #[arg(short = 'v', long)]
    pub verbose: bool,

    /// Enable trace debug logging (most detailed).
    #[arg(short = 't', long)]
    pub trace: bool,

    /// Disable speech output.
    #[arg(long = "no-speech")]
    pub no_speech: bool,

    /// Show this help message.
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,
}

impl Cli {
    /// Log filter directive implied by the debug flags; the most detailed
    /// requested level wins.  `RUST_LOG` overrides this entirely.
    pub fn log_level(&self) -> &'static str {
        if self.trace {
            "trace"
        } else if self.verbose {
            "debug"
        } else if self.debug {
            "info"
        } else {
            "warn"
        }
    }

    /// True when any connection option was given, which makes host and key
    /// required and an initial connection failure fatal.
    pub fn has_connection_params(&self) -> bool {
        self.host.is_some() || self.port.is_some() || self.key.is_some()
    }

    /// Builds [`ConnectionParams`] from the command line, or `None` when no
    /// connection option was given and the interactive prompt should run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing or invalid required fields.
    pub fn resolve_params(&self) -> Result<Option<ConnectionParams>, ConfigError> {
        if !self.has_connection_params() {
            return Ok(None);
        }
        let host = self.host.as_deref().ok_or(ConfigError::EmptyHost)?;
        let key = self.key.as_deref().ok_or(ConfigError::EmptyKey)?;
        let params = ConnectionParams::new(
            host,
            self.port.unwrap_or(DEFAULT_PORT),
            key,
            self.shortcut.clone(),
        )?;
        Ok(Some(params))
    }
}

// ── Interactive setup ─────────────────────────────────────────────────────────

use crate::infrastructure::signal::Latch;

/// Prompts for host, port, and key.  Returns `None` when the shutdown
/// signal fires or stdin closes mid-setup.
pub async fn prompt_for_params(shutdown: &Latch) -> Option<ConnectionParams> {
    println!();
    println!("speechlink - Interactive Setup");
    println!("{}", "=".repeat(50));
    println!();
    println!("Server Configuration:");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let host = prompt_validated(
        &mut lines,
        "Enter server host (IP address or domain name): ",
        shutdown,
        validate_host,
    )
    .await?;
    println!("Host: {host}\n");

    let port = prompt_port(&mut lines, shutdown).await?;

    let key = prompt_validated(
        &mut lines,
        "Enter connection key/channel: ",
        shutdown,
        validate_key,
    )
    .await?;
    println!("Connection key: {key}\n");

    println!("Connection Summary:");
    println!("  Host: {host}");
    println!("  Port: {port}");
    println!("  Key:  {key}");
    println!();
    println!("Connecting to relay server...");

    // Individual fields were validated as they were read.
    ConnectionParams::new(&host, port, &key, None).ok()
}

/// Re-prompts until the validator accepts the (trimmed) input.
async fn prompt_validated(
    lines: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
    shutdown: &Latch,
    validate: fn(&str) -> Result<(), ConfigError>,
) -> Option<String> {
    loop {
        let input = read_trimmed_line(lines, prompt, shutdown).await?;
        match validate(&input) {
            Ok(()) => return Some(input),
            Err(e) => println!("Error: {e}\n"),
        }
    }
}

/// Prompts for the port, accepting empty input as the default.
async fn prompt_port(lines: &mut Lines<BufReader<Stdin>>, shutdown: &Latch) -> Option<u16> {
    let prompt = format!("Enter server port [{DEFAULT_PORT}]: ");
    loop {
        let input = read_trimmed_line(lines, &prompt, shutdown).await?;
        if input.is_empty() {
            println!("Using default port: {DEFAULT_PORT}\n");
            return Some(DEFAULT_PORT);
        }
        match parse_port(&input) {
            Ok(port) => {
                println!("Port: {port}\n");
                return Some(port);
            }
            Err(e) => println!("Error: {e}\n"),
        }
    }
}

/// Prints the prompt and reads one line, aborting on shutdown or EOF.
async fn read_trimmed_line(
    lines: &mut Lines<BufReader<Stdin>>,
    prompt: &str,
    shutdown: &Latch,
) -> Option<String> {
    print!("{prompt}");
    let _ = std::io::stdout().flush();

    tokio::select! {
        _ = shutdown.wait() => {
            info!("input cancelled due to shutdown signal");
            None
        }
        line = lines.next_line() => match line {
            Ok(Some(line)) => Some(line.trim().to_string()),
            _ => None,
        },
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("speechlink").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_short_h_is_host_not_help() {
        let cli = parse(&["-h", "relay.example", "-k", "secret"]);
        assert_eq!(cli.host.as_deref(), Some("relay.example"));
    }

    #[test]
    fn test_no_connection_options_means_interactive() {
        let cli = parse(&["-v", "--no-speech"]);
        assert!(!cli.has_connection_params());
        assert_eq!(cli.resolve_params().unwrap(), None);
    }

    #[test]
    fn test_full_connection_options_resolve() {
        let cli = parse(&["-h", "relay.example", "-p", "7000", "-k", "secret", "-s", "ctrl+f12"]);
        let params = cli.resolve_params().unwrap().unwrap();
        assert_eq!(params.host, "relay.example");
        assert_eq!(params.port, 7000);
        assert_eq!(params.key, "secret");
        assert_eq!(params.shortcut.as_deref(), Some("ctrl+f12"));
    }

    #[test]
    fn test_port_defaults_when_omitted() {
        let cli = parse(&["-h", "relay.example", "-k", "secret"]);
        assert_eq!(cli.resolve_params().unwrap().unwrap().port, DEFAULT_PORT);
    }

    #[test]
    fn test_partial_options_require_host_and_key() {
        let cli = parse(&["-p", "7000"]);
        assert_eq!(cli.resolve_params(), Err(ConfigError::EmptyHost));

        let cli = parse(&["-h", "relay.example"]);
        assert_eq!(cli.resolve_params(), Err(ConfigError::EmptyKey));
    }

    #[test]
    fn test_invalid_host_is_rejected_at_resolution() {
        let cli = parse(&["-h", "bad host", "-k", "secret"]);
        assert_eq!(cli.resolve_params(), Err(ConfigError::HostWhitespace));
    }

    #[test]
    fn test_port_zero_is_rejected() {
        let cli = parse(&["-h", "relay.example", "-p", "0", "-k", "secret"]);
        assert_eq!(cli.resolve_params(), Err(ConfigError::PortOutOfRange));
    }

    #[test]
    fn test_log_level_prefers_most_detailed_flag() {
        assert_eq!(parse(&[]).log_level(), "warn");
        assert_eq!(parse(&["-d"]).log_level(), "info");
        assert_eq!(parse(&["-v"]).log_level(), "debug");
        assert_eq!(parse(&["-d", "-t"]).log_level(), "trace");
    }

    #[test]
    fn test_shortcut_alone_still_prompts_interactively() {
        let cli = parse(&["-s", "ctrl+f12"]);
        assert!(!cli.has_connection_params());
    }
}
