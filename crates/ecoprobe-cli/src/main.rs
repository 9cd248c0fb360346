use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use ecoprobe_cli::OutputFormat;
use ecoprobe_cli::commands;
use ecoprobe_cli::commands::analyze::AnalyzeOptions;
use ecoprobe_core::EngineConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ecoprobe")]
#[command(author, version, about, long_about = None)]
#[command(
    about = "A CLI tool for measuring the environmental footprint of web pages",
    long_about = "Ecoprobe replays a recorded page visit (HAR file plus optional DOM reports and \
                  resource sources), computes its EcoIndex score and grade, and checks it against \
                  a catalog of eco-design best practices."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    format: OutputFormat,

    /// Configuration file (defaults to ./ecoprobe.toml, then the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a recorded page visit
    Analyze {
        /// Path to the HAR file
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// JSON array of per-frame DOM reports
        #[arg(long, value_name = "FILE")]
        frames: Option<PathBuf>,

        /// JSON manifest of script and style sheet sources
        #[arg(long, value_name = "FILE")]
        resources: Option<PathBuf>,

        /// Ignore response bodies stored in the HAR file
        #[arg(long)]
        no_har_resources: bool,

        /// Only report these rules (repeatable)
        #[arg(long = "rule", value_name = "NAME")]
        rules: Vec<String>,
    },

    /// Compute the EcoIndex of a page from its raw dimensions
    Score {
        /// Number of DOM elements
        #[arg(long)]
        dom_size: u64,

        /// Number of HTTP requests
        #[arg(long)]
        requests: u64,

        /// Transferred size in KB
        #[arg(long)]
        size_kb: f64,
    },

    /// List the best-practice rules
    Rules,

    /// Generate shell completion scripts
    #[command(long_about = "Generate shell completion scripts

SUPPORTED SHELLS:
    bash, zsh, fish, powershell, elvish

INSTALLATION:
    bash:  ecoprobe completion --shell bash >> ~/.bashrc
    zsh:   ecoprobe completion --shell zsh > ~/.zfunc/_ecoprobe
           (add `fpath=(~/.zfunc $fpath)` to ~/.zshrc before compinit)
    fish:  ecoprobe completion --shell fish > ~/.config/fish/completions/ecoprobe.fish")]
    Completion {
        /// Target shell
        #[arg(long, value_enum)]
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(cli.verbose);

    match cli.command {
        Commands::Analyze {
            file,
            frames,
            resources,
            no_har_resources,
            rules,
        } => {
            let config = EngineConfig::load(cli.config.as_deref())?;
            let options = AnalyzeOptions {
                frames: frames.as_deref(),
                resources: resources.as_deref(),
                har_resources: !no_har_resources,
            };
            commands::analyze::execute(&file, &options, &rules, &config, cli.format)
        }
        Commands::Score {
            dom_size,
            requests,
            size_kb,
        } => {
            let config = EngineConfig::load(cli.config.as_deref())?;
            commands::score::execute(&config, dom_size, requests, size_kb, cli.format)
        }
        Commands::Rules => commands::rules::execute(cli.format),
        Commands::Completion { shell } => commands::completion::execute(shell, &mut Cli::command()),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("ecoprobe=debug,ecoprobe_cli=debug,ecoprobe_core=debug")
    } else {
        EnvFilter::new("ecoprobe=info,ecoprobe_cli=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}
