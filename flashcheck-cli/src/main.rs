//! flashcheck CLI - flash a USB development board and smoke-test it.
//!
//! ## Features
//!
//! - Operator-guided flash → discover → test cycles
//! - One-shot test suite runs against a running board
//! - Serial port listing with board-mode classification
//! - Shell completion generation
//! - Environment variable and config file support
//! - Internationalization (i18n) support

use {
    anyhow::Result,
    clap::{Parser, Subcommand},
    clap_complete::Shell,
    console::style,
    env_logger::Env,
    log::debug,
    rust_i18n::t,
    std::{
        env,
        path::PathBuf,
        process,
        sync::atomic::{AtomicBool, Ordering},
    },
};

mod commands;
mod config;
mod help;
mod operator;

use config::Config;

// Initialize i18n with locale files from the locales directory
rust_i18n::i18n!("locales", fallback = "en");

/// Whether stderr is a terminal (set once at startup).
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Set by the Ctrl-C handler.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Check if emoji/animations should be used (TTY and colors enabled).
pub(crate) fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Whether the user pressed Ctrl-C.
pub(crate) fn was_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Failures with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Bad invocation (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// Cancelled by the user (exit code 130).
    #[error("{0}")]
    Cancelled(String),
    /// The requested check did not pass (exit code 1).
    #[error("{0}")]
    Failed(String),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Cancelled(_) => 130,
            Self::Failed(_) => 1,
        }
    }
}

/// flashcheck - flash firmware onto a USB board and run on-device smoke tests.
///
/// Environment variables:
///   FLASHCHECK_TEST_DIR   - Directory holding the test scripts
///   FLASHCHECK_LANG       - Language/locale (en, zh-TW)
#[derive(Parser)]
#[command(name = "flashcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(subcommand_negates_reqs = true)]
#[command(after_help = "Configuration: ./flashcheck.toml or the global config.toml")]
struct Cli {
    /// Firmware image to flash.
    #[arg(required = true, value_name = "FIRMWARE")]
    firmware: Option<PathBuf>,

    /// Serial port of the board in bootloader mode (e.g. COM5, /dev/ttyACM0).
    #[arg(required = true, value_name = "PORT")]
    port: Option<String>,

    /// Directory holding the test scripts [default: ./test].
    #[arg(long, global = true, env = "FLASHCHECK_TEST_DIR", value_name = "DIR")]
    test_dir: Option<PathBuf>,

    /// Skip discovery and tests when the flashing tool fails.
    #[arg(long, global = true)]
    strict: bool,

    /// Language/locale for messages (e.g., en, zh-TW).
    #[arg(long, global = true, env = "FLASHCHECK_LANG")]
    lang: Option<String>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (suppress non-essential output).
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to a configuration file.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run the test suite once against a running board.
    Test {
        /// Serial port the application firmware runs on.
        #[arg(value_name = "PORT")]
        runtime_port: String,
    },

    /// List serial ports and their board mode.
    ListPorts {
        /// Output port list as JSON to stdout.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell type for completions.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Match the names the OS reports (`com3` → `COM3` on Windows).
fn normalize_port(port: &str) -> String {
    if cfg!(windows) {
        port.to_uppercase()
    } else {
        port.to_string()
    }
}

/// Extract `--lang` before clap runs so help text is localized.
fn early_lang(raw_args: &[String]) -> Option<String> {
    let mut lang = None;
    for (i, arg) in raw_args.iter().enumerate() {
        if let Some(val) = arg.strip_prefix("--lang=") {
            lang = Some(val.to_string());
        } else if arg == "--lang" {
            lang = raw_args.get(i + 1).cloned();
        }
    }
    lang
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

/// First Ctrl-C raises the interrupt flag, the second one exits.
fn install_interrupt_handler() {
    let installed = ctrlc::set_handler(|| {
        if INTERRUPTED.swap(true, Ordering::SeqCst) {
            process::exit(130);
        }
        eprintln!("\n{}", style(t!("common.interrupt_hint")).yellow());
    });
    if let Err(e) = installed {
        debug!("Failed to install Ctrl-C handler: {e}");
    }
    flashcheck::set_interrupt_checker(was_interrupted);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        return cli_err.exit_code();
    }
    if matches!(
        err.downcast_ref::<flashcheck::Error>(),
        Some(flashcheck::Error::Interrupted)
    ) {
        return 130;
    }
    1
}

fn main() {
    if let Err(err) = run() {
        let code = exit_code_for(&err);
        if code == 130 {
            eprintln!("\n{} {}", style("✗").red(), t!("error.interrupted"));
        } else {
            eprintln!("{} {err:#}", style("Error:").red().bold());
        }
        process::exit(code);
    }
}

fn run() -> Result<()> {
    let raw_args: Vec<String> = env::args().collect();

    let locale = early_lang(&raw_args)
        .or_else(|| env::var("FLASHCHECK_LANG").ok())
        .map_or_else(help::detect_locale, |lang| help::match_locale(&lang));
    rust_i18n::set_locale(&locale);

    // --- NO_COLOR and TTY detection ---
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    // Intercept help before clap so section headings are translated.
    if raw_args.iter().any(|a| a == "-h" || a == "--help") {
        help::print_localized_help(&raw_args)?;
        return Ok(());
    }

    let cli = Cli::parse();
    init_logging(&cli);

    debug!(
        "flashcheck v{} (locale: {locale}, verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    install_interrupt_handler();

    let config = match cli.config_path.as_deref() {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    };

    match &cli.command {
        Some(Commands::Test { runtime_port }) => {
            commands::test::cmd_test(&cli, &config, &normalize_port(runtime_port))
        },
        Some(Commands::ListPorts { json }) => {
            commands::list_ports::cmd_list_ports(&config, *json);
            Ok(())
        },
        Some(Commands::Completions { shell }) => {
            commands::completions::cmd_completions(*shell);
            Ok(())
        },
        None => {
            let (Some(firmware), Some(port)) = (cli.firmware.as_deref(), cli.port.as_deref())
            else {
                return Err(CliError::Usage("FIRMWARE and PORT are required".to_string()).into());
            };
            commands::cycle::cmd_cycle(&cli, &config, firmware, &normalize_port(port))
        },
    }
}
