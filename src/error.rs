use std::io;
use std::time::Duration;

use cloudflare::framework::response::ApiFailure;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cluster client is not ready")]
    ClusterNotReady,

    #[error("kubernetes api failed: {0}")]
    Kube(#[from] kube::Error),

    #[error("cloudflare request failed: {0}")]
    CloudflareRequest(#[from] ApiFailure),

    #[error("cloudflare api error: {0}")]
    CloudflareApi(String),

    #[error("lookup host {host} failed: {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },
}
