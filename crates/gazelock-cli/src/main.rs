use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gazelock_core::{authenticate, FrameSource, GestureClassifier, LandmarkDetector, SessionConfig};
use tracing_subscriber::EnvFilter;

mod config;
mod enrollment;
mod trace;

use config::Config;
use enrollment::EnrollmentFile;
use trace::RecordedLandmarks;

#[derive(Parser)]
#[command(name = "gazelock", version, about = "Gaze-gesture pattern authentication")]
struct Cli {
    /// Session config file (TOML). Falls back to $GAZELOCK_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a recorded landmark trace as one authentication attempt.
    Verify {
        /// User whose enrolled pattern must be performed.
        #[arg(long)]
        user: String,
        /// JSON Lines landmark trace, or `-` for stdin.
        #[arg(long)]
        trace: PathBuf,
        /// Enrollment file (overrides config).
        #[arg(long)]
        enrollment: Option<PathBuf>,
        /// Delay between frames in milliseconds (overrides config).
        #[arg(long)]
        pacing_ms: Option<u64>,
        /// Include the per-frame symbol trace in the verdict.
        #[arg(long)]
        show_trace: bool,
    },
    /// Print the gesture read from every frame of a trace, without matching.
    Classify {
        /// JSON Lines landmark trace, or `-` for stdin.
        #[arg(long)]
        trace: PathBuf,
    },
    /// Print the effective configuration as JSON.
    Config,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Verify {
            user,
            trace,
            enrollment,
            pacing_ms,
            show_trace,
        } => {
            if let Some(path) = enrollment {
                config.enrollment_path = path;
            }
            if let Some(ms) = pacing_ms {
                config.session.pacing_ms = ms;
            }
            config.session.record_trace |= show_trace;
            verify(config, user, trace).await
        }
        Command::Classify { trace } => {
            let session = config.session;
            tokio::task::spawn_blocking(move || classify(&session, &trace))
                .await
                .context("classify thread panicked")??;
            Ok(ExitCode::SUCCESS)
        }
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn verify(config: Config, user: String, trace_path: PathBuf) -> Result<ExitCode> {
    let store = EnrollmentFile::load(&config.enrollment_path)?;
    tracing::debug!(users = store.user_count(), "enrollment loaded");
    let mut source = trace::open(&trace_path)?;

    // Ctrl-C raises the flag; the session notices it at the end of its current frame.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("cancellation requested");
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    let session = config.session;
    let outcome = tokio::task::spawn_blocking(move || {
        authenticate(
            &user,
            &store,
            &mut source,
            &mut RecordedLandmarks,
            &cancel,
            &session,
        )
    })
    .await
    .context("session thread panicked")??;

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(if outcome.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

fn classify(session: &SessionConfig, path: &Path) -> Result<()> {
    session.validate()?;
    let mut source = trace::open(path)?;
    let mut detector = RecordedLandmarks;
    let mut classifier = GestureClassifier::new(session);
    let mut out = io::stdout().lock();

    let mut frame_no = 0u64;
    while let Some(frame) = source.next_frame()? {
        let snapshot = detector.detect(&frame).unwrap_or_else(|e| {
            tracing::warn!(frame = frame_no, error = %e, "unusable landmarks; reading as no face");
            None
        });
        let reading = classifier.classify(snapshot.as_ref(), frame.width, frame.height);
        let line = serde_json::json!({
            "frame": frame_no,
            "symbol": reading.symbol,
            "left": reading.left,
            "right": reading.right,
            "blinked": reading.blinked,
        });
        writeln!(out, "{line}")?;
        frame_no += 1;
    }
    Ok(())
}
