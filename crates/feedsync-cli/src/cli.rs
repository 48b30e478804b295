use clap::{Parser, Subcommand, ValueEnum};
use feedsync_core::{FeedConfig, MissingItemPolicy};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "feedsync")]
#[command(about = "Keep a paged feed, its address and its view in step", long_about = None)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")"))]
pub struct Cli {
    /// Path to a config file (or set FEEDSYNC_CONFIG env var)
    #[arg(long, global = true, value_name = "FILE", env = "FEEDSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Neighbours preloaded on each side of the current item
    #[arg(long, global = true, env = "FEEDSYNC_PREFETCH_RADIUS")]
    pub radius: Option<usize>,

    /// Distance from the tail at which more items are requested
    #[arg(long, global = true, env = "FEEDSYNC_LOAD_MORE_THRESHOLD")]
    pub threshold: Option<usize>,

    /// Where to go when the addressed item is gone
    #[arg(long, global = true, value_enum)]
    pub missing_item_policy: Option<PolicyArg>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a route against a list of items
    Resolve {
        /// Route such as /home, /home/3 or /home/<item-id>
        #[arg(long)]
        route: String,
        /// Comma-separated item ids, in feed order
        #[arg(long, value_delimiter = ',')]
        items: Vec<String>,
    },
    /// Show which neighbours would be preloaded around an index
    Window {
        #[arg(long)]
        index: usize,
        /// Comma-separated item ids, in feed order
        #[arg(long, value_delimiter = ',')]
        items: Vec<String>,
    },
    /// Drive a feed controller through a JSON scenario file
    Replay {
        #[arg(value_name = "SCRIPT")]
        script: PathBuf,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    Head,
    KeepPosition,
}

impl From<PolicyArg> for MissingItemPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Head => MissingItemPolicy::Head,
            PolicyArg::KeepPosition => MissingItemPolicy::KeepPosition,
        }
    }
}

impl Cli {
    /// Config file (explicit path or the default location) with flag overrides.
    pub fn feed_config(&self) -> anyhow::Result<FeedConfig> {
        let mut config = match &self.config {
            Some(path) => FeedConfig::from_file(path)?,
            None => FeedConfig::load(),
        };
        if let Some(radius) = self.radius {
            config.prefetch_radius = radius;
        }
        if let Some(threshold) = self.threshold {
            config.load_more_threshold = threshold;
        }
        if let Some(policy) = self.missing_item_policy {
            config.missing_item_policy = policy.into();
        }
        config.validate()?;
        Ok(config)
    }
}
