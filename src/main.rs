use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use encrypted_causal_lm::config::{LoggingConfig, Settings};
use encrypted_causal_lm::error::AppError;
use encrypted_causal_lm::{guard_panics, install_panic_hook, run};

/// Generate text from an obfuscated model loaded entirely in memory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding openvino_model.*, openvino_tokenizer.* and openvino_detokenizer.*
    #[arg(value_name = "MODEL_DIR")]
    model_dir: PathBuf,
    /// Text to continue
    #[arg(value_name = "PROMPT")]
    prompt: String,
}

/// Main entry point
///
/// Parses the two positional arguments, loads settings, and runs a single
/// generation. The generated text goes to stdout; errors go to stderr and
/// turn into a non-zero exit status.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version land here too and are not failures
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => return report(&AppError::Usage(e.to_string())),
    };

    // Load settings first
    let settings = match Settings::new() {
        Ok(settings) => settings,
        Err(e) => return report(&AppError::from(e)),
    };

    let _guard = init_logging(&settings.logging);
    info!("Starting generation on {}", settings.device.target);

    install_panic_hook();
    let outcome = guard_panics(|| run(&cli.model_dir, &cli.prompt, &settings));

    match outcome {
        Ok(text) => {
            let mut stdout = std::io::stdout().lock();
            match writeln!(stdout, "{}", text).and_then(|_| stdout.flush()) {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => report(&AppError::from(e)),
            }
        }
        Err(e) => report(&e),
    }
}

/// Prints the error on stderr and maps it to the process exit status.
fn report(err: &AppError) -> ExitCode {
    debug!("Run failed: {:?}", err);
    // a closed stderr must not turn a reported failure into a panic
    let _ = writeln!(std::io::stderr(), "{}", err.message().trim_end());
    ExitCode::from(err.exit_code() as u8)
}

/// Sets up tracing: a daily rolling file when a log directory is configured, stderr otherwise.
///
/// `ENCLM_LOG` takes precedence over the configured level and accepts full filter directives.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env("ENCLM_LOG").unwrap_or_else(|_| EnvFilter::new(&logging.level));

    match &logging.file {
        Some(dir) => {
            let file_appender = tracing_appender::rolling::RollingFileAppender::new(
                tracing_appender::rolling::Rotation::DAILY,
                dir,
                "encrypted_causal_lm",
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                // Disable ANSI colors for cleaner log files
                .with_ansi(false)
                .with_line_number(true)
                .with_file(true)
                .with_target(false)
                .with_env_filter(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_env_filter(filter)
                .init();
            None
        }
    }
}
