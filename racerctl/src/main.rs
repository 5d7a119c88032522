// Checkpoint Racer CLI
// Runs, replays and inspects checkpoint courses from the command line

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "racerctl")]
#[command(about = "Checkpoint Racer CLI", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive episodes with a built-in policy
    Run {
        /// Course and agent configuration (JSON); defaults to the built-in course
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Number of episodes
        #[arg(short = 'n', long, default_value = "1")]
        episodes: usize,

        /// Policy driving the car
        #[arg(short, long, value_enum, default_value = "seek")]
        policy: PolicyKind,

        /// Step budget per episode; overrides the configuration
        #[arg(long)]
        max_steps: Option<usize>,

        /// Multiply every reward by this factor
        #[arg(long, default_value = "1.0")]
        reward_scale: f64,

        /// Write every transition to this JSON file
        #[arg(long)]
        record: Option<PathBuf>,

        /// Discount factor for the returns written with --record
        #[arg(long, default_value = "0.99")]
        gamma: f64,

        /// Trace sensor rays and target lines
        #[arg(long)]
        trace_rays: bool,
    },

    /// Drive one episode from recorded key frames
    Replay {
        /// One key string per line, e.g. "W", "WD" or blank
        #[arg(short, long)]
        keys: PathBuf,

        /// Course and agent configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Use the player car speeds instead of the agent's
        #[arg(long)]
        player: bool,
    },

    /// Write the built-in course configuration
    Course {
        /// Output file; prints to stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Steer toward the current checkpoint
    Seek,
    /// Uniformly random throttle and turn
    Random,
    /// Never touch the controls
    Idle,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            episodes,
            policy,
            max_steps,
            reward_scale,
            record,
            gamma,
            trace_rays,
        } => {
            let options = commands::RunOptions {
                config,
                episodes,
                policy,
                max_steps,
                reward_scale,
                record,
                gamma,
                trace_rays,
            };
            commands::run(options).await?;
        }

        Commands::Replay { keys, config, player } => {
            commands::replay(&keys, config.as_deref(), player).await?;
        }

        Commands::Course { output } => {
            commands::course(output.as_deref())?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
