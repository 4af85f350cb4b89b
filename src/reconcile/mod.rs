use std::future::Future;
use std::ops::Deref;
use std::time::Duration;

use async_trait::async_trait;

pub use engine::{Reconciler, Settings};
pub use hostname::{Placement, TemplateCache};
pub use sweep::sweep;
pub use tracker::{Generation, RecordState, RecordTracker, SharedState, Summary, TrackedRecord};

use crate::error::Error;

mod engine;
mod hostname;
pub mod schedule;
mod sweep;
#[cfg(test)]
mod testing;
mod tracker;

/// A cluster service as seen by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceView {
    pub name: String,
    pub namespace: String,
    /// Raw hostname template taken from the service annotation.
    pub public_hostname: Option<String>,
    /// Hostname assigned to the service's load balancer, if provisioned.
    pub load_balancer: Option<String>,
}

/// An existing CNAME record returned by the DNS provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnameRecord {
    pub target: String,
}

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Snapshot every service in the cluster.
    ///
    /// Returns [`Error::ClusterNotReady`] when there is no usable connection yet.
    async fn list_services(&self) -> Result<Vec<ServiceView>, Error>;
}

#[async_trait]
pub trait DnsProvider: Send + Sync {
    async fn lookup(&self, zone: &str, hostname: &str) -> Result<Vec<CnameRecord>, Error>;

    async fn create_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error>;

    async fn remove_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error>;
}

#[async_trait]
pub trait HostProbe: Send + Sync {
    /// Succeeds when `host` resolves to at least one address.
    async fn resolve(&self, host: &str) -> Result<(), Error>;
}

#[async_trait]
impl<C, T> ClusterClient for T
where
    T: Deref<Target = C> + Send + Sync,
    C: ClusterClient,
{
    async fn list_services(&self) -> Result<Vec<ServiceView>, Error> {
        self.deref().list_services().await
    }
}

#[async_trait]
impl<D, T> DnsProvider for T
where
    T: Deref<Target = D> + Send + Sync,
    D: DnsProvider,
{
    async fn lookup(&self, zone: &str, hostname: &str) -> Result<Vec<CnameRecord>, Error> {
        self.deref().lookup(zone, hostname).await
    }

    async fn create_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        self.deref().create_cname(zone, hostname, target).await
    }

    async fn remove_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        self.deref().remove_cname(zone, hostname, target).await
    }
}

#[async_trait]
impl<P, T> HostProbe for T
where
    T: Deref<Target = P> + Send + Sync,
    P: HostProbe,
{
    async fn resolve(&self, host: &str) -> Result<(), Error> {
        self.deref().resolve(host).await
    }
}

/// Bound an external call by `limit`; expiry is reported as [`Error::Timeout`].
pub(crate) async fn bounded<T, F>(
    operation: &'static str,
    limit: Option<Duration>,
    fut: F,
) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    match limit {
        None => fut.await,
        Some(after) => tokio::time::timeout(after, fut)
            .await
            .map_err(|_| Error::Timeout { operation, after })?,
    }
}
