use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

/// Follow a live auction and keep a consistent view of it
#[derive(Parser, Debug, Clone)]
#[command(name = "auction-view", version, about)]
pub struct Opts {
    /// Recorded push events to replay, one JSON envelope per line
    #[arg(long, env = "AUCTION_EVENTS", value_name = "PATH")]
    pub events: PathBuf,

    /// Team snapshot, re-read on every refresh
    #[arg(long, env = "AUCTION_SNAPSHOT", value_name = "PATH")]
    pub snapshot: PathBuf,

    /// Team to bid for; without it the view is a read-only presenter
    #[arg(long, env = "AUCTION_TEAM")]
    pub team: Option<String>,

    /// Access token passed through with every request
    #[arg(long, env = "AUCTION_ACCESS_TOKEN", requires = "team")]
    pub access_token: Option<String>,

    /// Where to serve the view over HTTP
    #[arg(long, env = "AUCTION_LISTEN", default_value = "127.0.0.1:3000")]
    pub listen: SocketAddr,

    /// Delay between replayed events, in milliseconds
    #[arg(long, env = "AUCTION_PACE_MS", default_value_t = 0)]
    pub pace_ms: u64,
}

impl Opts {
    pub fn pace(&self) -> Duration {
        Duration::from_millis(self.pace_ms)
    }
}
