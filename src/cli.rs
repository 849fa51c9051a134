use clap::{Args, Parser, Subcommand};

/// threads-relay: forwarding layer between the dashboard and the Threads API
#[derive(Parser)]
#[command(name = "threads-relay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Credential for operator commands. Never stored; read from the flag or the environment.
#[derive(Args, Clone)]
pub struct AuthArgs {
    /// Threads access token
    #[arg(long, env = "THREADS_ACCESS_TOKEN", hide_env_values = true)]
    pub token: String,
    /// Account id, if already known (skips the /me lookup)
    #[arg(long, env = "THREADS_USER_ID")]
    pub user_id: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Serve {
        /// Port to bind (overrides RELAY_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check that a token works and show whose it is
    Test {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// List the first page of your posts
    Posts {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Publish a post (text, image, video or carousel)
    Publish {
        #[command(flatten)]
        auth: AuthArgs,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, conflicts_with_all = ["video_url", "image_urls"])]
        image_url: Option<String>,
        #[arg(long, conflicts_with = "image_urls")]
        video_url: Option<String>,
        /// Carousel images, comma separated, in display order
        #[arg(long, value_delimiter = ',')]
        image_urls: Option<Vec<String>>,
    },

    /// Show publishing quota and what is left of it
    Limits {
        #[command(flatten)]
        auth: AuthArgs,
    },

    /// Show the status of a container (e.g. one left behind by a failed publish)
    Status {
        #[command(flatten)]
        auth: AuthArgs,
        container_id: String,
    },

    /// Totals and averages over your latest page of posts
    Analytics {
        #[command(flatten)]
        auth: AuthArgs,
    },
}
