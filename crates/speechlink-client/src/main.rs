//! speechlink client entry point.
//!
//! Wires the collaborators together and hands control to the supervisor:
//!
//! ```text
//! main()
//!  ├─ parse CLI / run interactive setup
//!  ├─ install signal handlers (shutdown latch)
//!  ├─ build speech + audio backends
//!  └─ Supervisor::run()        -- connect / handshake / input loop / reconnect
//! ```
//!
//! Exit status: 0 on operator shutdown, 1 on argument errors or a fatal
//! initial connection failure of a command-line-parameterised run.

use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use speechlink_client::application::supervisor::Supervisor;
use speechlink_client::cli::{self, Cli};
use speechlink_client::infrastructure::audio::{AudioBackend, RodioAudio};
use speechlink_client::infrastructure::signal::{install_signal_handlers, Latch};
use speechlink_client::infrastructure::speech::{ConsoleSpeech, NullSpeech, SpeechBackend};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{e}");
            return Ok(());
        }
        Err(e) => {
            eprint!("{e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    // Structured logging; RUST_LOG overrides the flag-derived level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .init();

    info!("speechlink client starting");

    let shutdown = Arc::new(Latch::new());
    install_signal_handlers(Arc::clone(&shutdown));

    let params = match cli.resolve_params() {
        Ok(Some(params)) => params,
        Ok(None) => match cli::prompt_for_params(&shutdown).await {
            Some(mut params) => {
                params.shortcut = cli.shortcut.clone();
                params
            }
            None => {
                info!("setup cancelled");
                return Ok(());
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    let speech: Arc<dyn SpeechBackend> = if cli.no_speech {
        info!("speech disabled by command line option");
        Arc::new(NullSpeech)
    } else {
        let speech = ConsoleSpeech;
        match speech.initialize() {
            Ok(()) => Arc::new(speech),
            Err(e) => {
                warn!(error = %e, "failed to initialise speech; continuing without it");
                Arc::new(NullSpeech)
            }
        }
    };
    let audio: Arc<dyn AudioBackend> = Arc::new(RodioAudio::new());

    #[cfg(not(windows))]
    {
        println!("speechlink client running. Press Enter to quit...");
        spawn_quit_watcher(Arc::clone(&shutdown));
    }

    let supervisor = Supervisor::new(
        params,
        cli.has_connection_params(),
        Arc::clone(&speech),
        audio,
        shutdown,
    );
    let outcome = supervisor.run().await;

    speech.cleanup();

    match outcome {
        Ok(()) => {
            info!("shutdown completed");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "giving up");
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Receive-only platforms quit on Enter, matching the console contract the
/// hookless build has always had.
#[cfg(not(windows))]
fn spawn_quit_watcher(shutdown: Arc<Latch>) {
    let spawned = std::thread::Builder::new()
        .name("speechlink-stdin".to_string())
        .spawn(move || {
            let mut line = String::new();
            let _ = std::io::stdin().read_line(&mut line);
            shutdown.set();
        });
    if let Err(e) = spawned {
        warn!(error = %e, "could not start stdin watcher");
    }
}
