mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    agent::AgentSubcommand, bundle::BundleSubcommand, config::ConfigSubcommand,
    skill::SkillSubcommand, Context,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vinsly",
    about = "Manage Claude agents and skills: list, edit, bundle, import, and discover projects",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .claude/ or .git/)
    #[arg(long, global = true, env = "VINSLY_PROJECT")]
    project: Option<PathBuf>,

    /// Settings file (default: ~/.vinsly/config.yaml)
    #[arg(long, global = true, env = "VINSLY_CONFIG")]
    config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Log progress to stderr
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage agent definitions
    Agent {
        #[command(subcommand)]
        subcommand: AgentSubcommand,
    },

    /// Export and import ZIP bundles of agents
    Bundle {
        #[command(subcommand)]
        subcommand: BundleSubcommand,
    },

    /// Manage skills and skill archives
    Skill {
        #[command(subcommand)]
        subcommand: SkillSubcommand,
    },

    /// Find projects under the home directory that define agents
    Discover {
        /// Maximum directory depth (default from settings)
        #[arg(long)]
        depth: Option<usize>,

        /// Also scan folders guarded by OS privacy prompts
        #[arg(long)]
        include_protected: bool,
    },

    /// Typo-tolerant search over agent names and descriptions
    Search {
        query: String,

        /// Maximum edit distance
        #[arg(long, default_value_t = vinsly_core::fuzzy::DEFAULT_TOLERANCE)]
        tolerance: usize,
    },

    /// Inspect and validate settings
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = Context::load(
        root::resolve_root(cli.project.as_deref()),
        cli.config.as_deref(),
        cli.json,
    )
    .and_then(|ctx| match cli.command {
        Commands::Agent { subcommand } => cmd::agent::run(&ctx, subcommand),
        Commands::Bundle { subcommand } => cmd::bundle::run(&ctx, subcommand),
        Commands::Skill { subcommand } => cmd::skill::run(&ctx, subcommand),
        Commands::Discover {
            depth,
            include_protected,
        } => cmd::discover::run(&ctx, depth, include_protected),
        Commands::Search { query, tolerance } => cmd::search::run(&ctx, &query, tolerance),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
    });

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
