use std::time::Duration;

use tracing::{debug, error, info, info_span, instrument, warn, Instrument};

use super::hostname::Placement;
use super::sweep::sweep;
use super::tracker::{Generation, RecordState, SharedState, TrackedRecord};
use super::{bounded, ClusterClient, DnsProvider, HostProbe, ServiceView};
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct Settings {
    pub placement: Placement,
    pub hosted_zone: String,
    /// Cycles per generation; the tracking state is reset after this many.
    pub reset_after: u64,
    pub call_timeout: Option<Duration>,
}

/// Drives reconcile cycles against one cluster and one hosted zone.
///
/// Cycles take `&mut self` through [`Reconciler::tick`], so only one can run
/// at a time.
pub struct Reconciler<C, D, P> {
    cluster: C,
    dns: D,
    probe: P,
    state: SharedState,
    settings: Settings,
    cycles: u64,
}

impl<C, D, P> Reconciler<C, D, P>
where
    C: ClusterClient,
    D: DnsProvider,
    P: HostProbe,
{
    pub fn new(cluster: C, dns: D, probe: P, settings: Settings) -> Self {
        Self {
            cluster,
            dns,
            probe,
            state: Generation::new(0).shared(),
            settings,
            cycles: 0,
        }
    }

    /// Read handle on the tracking state.
    pub fn state(&self) -> SharedState {
        self.state.clone()
    }

    /// Run one cycle, then start a new generation if this one is used up.
    pub async fn tick(&mut self) {
        let generation = self.state.read().await.id();

        self.run_cycle()
            .instrument(info_span!("reconcile cycle", generation, cycle = self.cycles))
            .await;

        self.cycles += 1;

        if self.cycles >= self.settings.reset_after {
            self.reset().await;
        }
    }

    /// Create missing CNAMEs for the current service set, then sweep stale ones.
    ///
    /// Errors are logged per service and never abort the cycle.
    pub async fn run_cycle(&self) {
        let services = match bounded(
            "list services",
            self.settings.call_timeout,
            self.cluster.list_services(),
        )
        .await
        {
            Ok(services) => services,

            Err(Error::ClusterNotReady) => {
                info!("cluster client is not ready, skip cycle");

                return;
            }

            Err(err) => {
                error!(%err, "list services failed");

                Vec::new()
            }
        };

        info!(count = services.len(), "scanning list of services in cluster");

        for service in &services {
            if let Err(err) = self.reconcile_service(service).await {
                error!(service = %service.name, namespace = %service.namespace, %err, "reconcile service failed");
            }
        }

        sweep(
            &self.state,
            &self.dns,
            &self.probe,
            &self.settings.hosted_zone,
            self.settings.call_timeout,
        )
        .await;
    }

    #[instrument(skip_all, fields(service = %service.name, namespace = %service.namespace))]
    async fn reconcile_service(&self, service: &ServiceView) -> Result<(), Error> {
        let Some(template) = service
            .public_hostname
            .as_deref()
            .filter(|template| !template.is_empty())
        else {
            return Ok(());
        };

        let Some(target) = service
            .load_balancer
            .as_deref()
            .filter(|target| !target.is_empty())
        else {
            debug!(template, "load balancer is not assigned yet");

            return Ok(());
        };

        let hostname = self
            .state
            .write()
            .await
            .resolve_hostname(template, &self.settings.placement);

        let zone = self.settings.hosted_zone.as_str();
        let timeout = self.settings.call_timeout;

        let existing = bounded("lookup cname", timeout, self.dns.lookup(zone, &hostname)).await?;

        if let Some(tracked) = self.state.read().await.records.get(&hostname) {
            if !tracked.is_owned_by(&service.namespace, &service.name) {
                warn!(
                    %hostname,
                    owner = %tracked.owner(),
                    "hostname is already tracked for another service, ignore"
                );
            }

            return Ok(());
        }

        let record = match existing.into_iter().next() {
            None => {
                info!(%hostname, target, "cname doesn't exist, creating");

                bounded(
                    "create cname",
                    timeout,
                    self.dns.create_cname(zone, &hostname, target),
                )
                .await?;

                info!(%hostname, target, "cname created");

                TrackedRecord::new(hostname, target, RecordState::Creating, &service.name)
                    .in_namespace(&service.namespace)
            }

            Some(existing) => {
                info!(%hostname, target = %existing.target, "existing cname added to list");

                TrackedRecord::new(hostname, existing.target, RecordState::InUse, &service.name)
                    .in_namespace(&service.namespace)
            }
        };

        self.state.write().await.records.insert_if_absent(record);

        Ok(())
    }

    async fn reset(&mut self) {
        let mut generation = self.state.write().await;
        *generation = generation.next();
        self.cycles = 0;

        info!(generation = generation.id(), "==> data reloaded <==");
    }
}
