use std::net::SocketAddr;

use clap::Parser;
use vizrev_core::ReleaseReview;

/// Runtime configuration. Every flag can also come from the environment.
///
/// The database connection is configured separately through the
/// `SURREALDB_*` variables read by `SurrealHandle::setup_from_env`.
#[derive(Debug, Clone, Parser)]
#[command(name = "vizrevd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Release review daemon", long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "VIZREV_BIND", default_value = "0.0.0.0:9000")]
    pub bind: SocketAddr,

    /// Conditional writes a status update may lose before answering 409
    #[arg(
        long,
        env = "VIZREV_MAX_UPDATE_ATTEMPTS",
        default_value_t = ReleaseReview::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub max_update_attempts: u32,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "VIZREV_LOG_JSON")]
    pub json: bool,
}
