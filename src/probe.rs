use std::io;

use async_trait::async_trait;
use tokio::net;
use tracing::{debug, instrument};

use crate::error::Error;
use crate::reconcile::HostProbe;

/// Liveness probe backed by the system resolver.
#[derive(Debug, Copy, Clone, Default)]
pub struct SystemResolver;

#[async_trait]
impl HostProbe for SystemResolver {
    #[instrument(skip(self))]
    async fn resolve(&self, host: &str) -> Result<(), Error> {
        let lookup_err = |source| Error::Lookup {
            host: host.to_string(),
            source,
        };

        let mut addrs = net::lookup_host((host, 0)).await.map_err(lookup_err)?;

        match addrs.next() {
            None => Err(lookup_err(io::Error::new(
                io::ErrorKind::NotFound,
                "no address returned",
            ))),

            Some(addr) => {
                debug!(%addr, "host resolved");

                Ok(())
            }
        }
    }
}
