// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{error, info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use podsplit::app_config::{self, Config};
use podsplit::{Controller, RunSummary};

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

/// Options shared by every command that runs the pipeline
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct SplitArgs {
    /// Folder holding the episodes and their feed
    #[arg(value_name = "INPUT_FOLDER")]
    input_folder: PathBuf,

    /// Folder receiving the titled segments
    #[arg(value_name = "OUTPUT_FOLDER")]
    output_folder: PathBuf,

    /// Segment length before overlap, in seconds
    #[arg(short, long)]
    window: Option<u32>,

    /// Seconds repeated at the start of the next segment
    #[arg(short, long)]
    overlap: Option<u32>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Cut episodes into overlapping segments and title them (default command)
    Split(SplitArgs),

    /// Title the segments an interrupted run left untitled in the output folder
    Title {
        /// Folder holding the feed
        #[arg(value_name = "INPUT_FOLDER")]
        input_folder: PathBuf,

        /// Folder holding the segments
        #[arg(value_name = "OUTPUT_FOLDER")]
        output_folder: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Record the duration of every episode in the feed
    FillDurations {
        /// Folder holding the episodes and their feed
        #[arg(value_name = "INPUT_FOLDER")]
        input_folder: PathBuf,

        #[command(flatten)]
        config: ConfigArgs,
    },

    /// Generate shell completions for podsplit
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// podsplit - podcast splitter
///
/// Cuts podcast episodes into short overlapping parts, each starting with a
/// spoken "Part N of M of <episode title>".
#[derive(Parser, Debug)]
#[command(name = "podsplit")]
#[command(version)]
#[command(about = "Split podcast episodes into short titled parts")]
#[command(args_conflicts_with_subcommands = true)]
#[command(long_about = "podsplit cuts every episode of a podcast folder into overlapping parts and prepends a spoken title to each part.

EXAMPLES:
    podsplit podcasts/ parts/                    # Split with the configured window
    podsplit split -w 300 -o 5 podcasts/ parts/  # Five minute parts, five seconds overlap
    podsplit title podcasts/ parts/              # Title the parts an interrupted run left untitled
    podsplit fill-durations podcasts/            # Write episode durations into rss.xml
    podsplit completions bash > podsplit.bash    # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

REQUIREMENTS:
    ffmpeg and ffprobe for audio, pico2wave for the spoken titles.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Folder holding the episodes and their feed
    #[arg(value_name = "INPUT_FOLDER")]
    input_folder: Option<PathBuf>,

    /// Folder receiving the titled segments
    #[arg(value_name = "OUTPUT_FOLDER")]
    output_folder: Option<PathBuf>,

    /// Segment length before overlap, in seconds
    #[arg(short, long)]
    window: Option<u32>,

    /// Seconds repeated at the start of the next segment
    #[arg(short, long)]
    overlap: Option<u32>,

    #[command(flatten)]
    config: ConfigArgs,
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

    // @returns: Emoji and ANSI color for log level
    fn decoration(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌", "1;31"),
            Level::Warn => ("🚧", "1;33"),
            Level::Info => ("", "1;32"),
            Level::Debug => ("🔍", "1;36"),
            Level::Trace => ("📋", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        // The max level set at runtime may be lower than the initial one
        metadata.level() <= self.level.max(log::max_level())
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (emoji, color) = Self::decoration(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "\x1B[{}m{} {} {}\x1B[0m", color, now, emoji, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    let summary = match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "podsplit", &mut std::io::stdout());
            return Ok(());
        }
        Some(Commands::Split(args)) => run_split(args).await?,
        Some(Commands::Title {
            input_folder,
            output_folder,
            config,
        }) => {
            let controller = Controller::with_config(load_config(&config)?)?;
            controller.run_titles(&input_folder, &output_folder).await?
        }
        Some(Commands::FillDurations { input_folder, config }) => {
            let controller = Controller::with_config(load_config(&config)?)?;
            controller.fill_durations(&input_folder).await?
        }
        None => {
            // Default behavior - top-level args stand for the split command
            let input_folder = cli
                .input_folder
                .ok_or_else(|| anyhow!("INPUT_FOLDER is required when no subcommand is specified"))?;
            let output_folder = cli
                .output_folder
                .ok_or_else(|| anyhow!("OUTPUT_FOLDER is required when no subcommand is specified"))?;

            run_split(SplitArgs {
                input_folder,
                output_folder,
                window: cli.window,
                overlap: cli.overlap,
                config: cli.config,
            })
            .await?
        }
    };

    report(&summary);
    Ok(())
}

async fn run_split(args: SplitArgs) -> Result<RunSummary> {
    let mut config = load_config(&args.config)?;

    // Override config with CLI options if provided
    if let Some(window) = args.window {
        config.window_seconds = window;
    }
    if let Some(overlap) = args.overlap {
        config.overlap_seconds = overlap;
    }

    let window = config.window_seconds;
    let overlap = config.overlap_seconds;
    info!("Splitting {} into {}s parts with {}s overlap", args.input_folder.display(), window, overlap);

    let controller = Controller::with_config(config)?;
    controller.run(&args.input_folder, &args.output_folder, window, overlap).await
}

/// Load the configuration file, creating a default one if it does not exist
fn load_config(options: &ConfigArgs) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::from_file(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config
            .save(config_path)
            .context(format!("Failed to write default config to file: {}", options.config_path))?;
        config
    };

    // Update log level in config if specified via command line
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    } else {
        log::set_max_level(config.log_level.to_level_filter());
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

/// Log the final outcome and exit with an error status when something failed
fn report(summary: &RunSummary) {
    if summary.is_success() {
        info!("Done: {}", summary.summary());
        return;
    }

    for failure in &summary.failures {
        error!("{}", failure);
    }
    error!("Finished with failures: {}", summary.summary());
    std::process::exit(1);
}
