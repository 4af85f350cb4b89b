use anyhow::Result;
use clap::Parser;

pub use config::Config;
pub use error::Error;

mod cf_dns;
mod cluster;
pub mod config;
mod control;
pub mod error;
pub mod http;
mod probe;
pub mod reconcile;
mod trace;

pub async fn run() -> Result<()> {
    let config = Config::parse();
    config.validate()?;

    trace::init_tracing(config.jaeger_agent.as_deref())?;

    let result = control::run_controller(config).await;

    trace::stop_tracing();

    result
}
