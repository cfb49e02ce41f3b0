// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::PathBuf;

use weebanizer::app_config::{self, Config, OracleProvider, ProcessingMode};
use weebanizer::app_controller::{Controller, ISSUES_LOG_FILE};

/// CLI Wrapper for OracleProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliOracleProvider {
    Gemini,
    Ollama,
    Anthropic,
}

impl From<CliOracleProvider> for OracleProvider {
    fn from(cli_provider: CliOracleProvider) -> Self {
        match cli_provider {
            CliOracleProvider::Gemini => OracleProvider::Gemini,
            CliOracleProvider::Ollama => OracleProvider::Ollama,
            CliOracleProvider::Anthropic => OracleProvider::Anthropic,
        }
    }
}

/// CLI Wrapper for ProcessingMode to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliMode {
    /// External Spanish subtitle if present, embedded track otherwise
    Multi,
    /// External Spanish subtitle required
    Extra,
}

impl From<CliMode> for ProcessingMode {
    fn from(cli_mode: CliMode) -> Self {
        match cli_mode {
            CliMode::Multi => ProcessingMode::Multi,
            CliMode::Extra => ProcessingMode::Extra,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate shell completions for weebanizer
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Weebanizer - anime-style Spanish subtitles
///
/// Removes translator credits from Spanish subtitles, restores Japanese
/// honorifics from the English or Malay track and orders names surname first.
#[derive(Parser, Debug)]
#[command(name = "weebanizer")]
#[command(version)]
#[command(about = "Localize Spanish anime subtitles with honorifics")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "Weebanizer rewrites the Spanish subtitles of .mkv files: credit lines are blanked,
honorifics such as -san or -chan are copied from the English (or Malay) track and
\"Name Surname\" pairs are reordered to \"Surname Name\" with the help of an LLM.
The result is written as <name>.ass next to each video.

EXAMPLES:
    weebanizer episode.mkv                        # Use the default config
    weebanizer --mode extra /anime/season1/       # Require an external <name>.ass|srt
    weebanizer -p ollama -m llama3.2:3b ep.mkv    # Use a local model for names
    weebanizer --skip-names ep01.mkv ep02.mkv     # Credits and honorifics only
    weebanizer completions bash > weebanizer.bash # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    gemini    - Google Gemini API (default, requires API key)
    ollama    - Local Ollama server (default: llama3.2:3b)
    anthropic - Anthropic API (requires API key)")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Video files or directories to process
    #[arg(value_name = "INPUT_PATH")]
    inputs: Vec<PathBuf>,

    /// Where the Spanish subtitle comes from
    #[arg(long, value_enum)]
    mode: Option<CliMode>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Oracle used for name normalization
    #[arg(short, long, value_enum)]
    provider: Option<CliOracleProvider>,

    /// Model name for the oracle
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the oracle
    #[arg(long, env = "WEEBANIZER_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Maximum distance in seconds between aligned lines
    #[arg(long)]
    window_secs: Option<u64>,

    /// Do not reorder names
    #[arg(long)]
    skip_names: bool,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The logger accepts everything; the max level is narrowed once the config is read
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Some(Commands::Completions { shell }) = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "weebanizer", &mut std::io::stdout());
        return Ok(());
    }

    if cli.inputs.is_empty() {
        return Err(anyhow!("INPUT_PATH is required when no subcommand is specified"));
    }

    run_localize(cli).await
}

async fn run_localize(options: CommandLineOptions) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config)?;
    apply_overrides(&mut config, &options);
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    let controller = Controller::with_config(config)?;
    controller.listen_for_interrupt();
    controller.check_oracle().await;

    let summary = controller.run(&options.inputs).await?;

    if summary.has_failures() {
        return Err(anyhow!(
            "{} of {} files failed, see {} next to each failed file",
            summary.failed,
            summary.reports.len(),
            ISSUES_LOG_FILE
        ));
    }

    if summary.cancelled {
        info!("Stopped early, {} files processed", summary.processed);
    }

    Ok(())
}

// Command line flags win over the configuration file
fn apply_overrides(config: &mut Config, options: &CommandLineOptions) {
    if let Some(mode) = &options.mode {
        config.mode = mode.clone().into();
    }

    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    if let Some(provider) = &options.provider {
        let provider: OracleProvider = provider.clone().into();
        if provider != config.oracle.provider {
            // Endpoint and model belong to the previous provider
            config.oracle.endpoint.clear();
            config.oracle.model.clear();
        }
        config.oracle.provider = provider;
    }

    if let Some(model) = &options.model {
        config.oracle.model = model.clone();
    }

    if let Some(api_key) = &options.api_key {
        config.oracle.api_key = api_key.clone();
    }

    if let Some(window) = options.window_secs {
        config.honorifics.window_secs = window;
    }

    if options.skip_names {
        config.oracle.enabled = false;
    }
}
