use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{ensure, Result};
use clap::Parser;

use crate::reconcile::{Placement, Settings};

/// Keep DNS CNAMEs in sync with annotated LoadBalancer services.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Config {
    #[arg(long, env = "ENV", help = "Deployment environment substituted for {env}")]
    pub env: String,

    #[arg(long, env = "REGION", help = "Region substituted for {region}")]
    pub region: String,

    #[arg(long, env = "HOSTED_ZONE", help = "DNS zone the CNAME records are managed in")]
    pub hosted_zone: String,

    #[arg(
        long,
        env = "HOSTNAME_ANNOTATION",
        default_value = "domainName",
        help = "Service annotation carrying the public hostname template"
    )]
    pub annotation: String,

    #[arg(
        long,
        env = "LISTEN_ADDR",
        default_value = "0.0.0.0:8080",
        help = "Address of the status HTTP server"
    )]
    pub listen: SocketAddr,

    #[arg(
        long,
        env = "SCAN_INTERVAL",
        default_value = "40s",
        value_parser = humantime::parse_duration,
        help = "Time between reconcile cycles"
    )]
    pub interval: Duration,

    #[arg(
        long,
        env = "RESET_AFTER_CYCLES",
        default_value_t = 1000,
        help = "Cycles before all tracking state is dropped and rebuilt"
    )]
    pub reset_after: u64,

    #[arg(
        long,
        env = "CALL_TIMEOUT",
        value_parser = humantime::parse_duration,
        help = "Timeout for each cluster, DNS or host lookup call. Unbounded if not set"
    )]
    pub call_timeout: Option<Duration>,

    #[arg(long, env = "KUBECONFIG_PATH", help = "Kubeconfig file, in-cluster config if not set")]
    pub kubeconfig: Option<PathBuf>,

    #[arg(long, env = "JAEGER_AGENT", help = "Export traces to this Jaeger agent")]
    pub jaeger_agent: Option<String>,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.env.is_empty(), "ENV is not set");
        ensure!(!self.region.is_empty(), "REGION is not set");
        ensure!(!self.hosted_zone.is_empty(), "HOSTED_ZONE is not set");
        ensure!(self.reset_after > 0, "reset after cycles must be at least 1");
        ensure!(!self.interval.is_zero(), "scan interval must not be zero");

        Ok(())
    }

    pub fn settings(&self) -> Settings {
        Settings {
            placement: Placement::new(&self.env, &self.region),
            hosted_zone: self.hosted_zone.clone(),
            reset_after: self.reset_after,
            call_timeout: self.call_timeout,
        }
    }
}
