use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tracing::{info, instrument};

use super::{ClusterClient, DnsProvider, HostProbe, Reconciler};

/// Run a cycle every `interval`, forever. The first cycle starts immediately.
///
/// A cycle that overruns the interval delays the next tick instead of
/// stacking up missed ones.
#[instrument(skip(reconciler))]
pub async fn schedule<C, D, P>(mut reconciler: Reconciler<C, D, P>, interval: Duration)
where
    C: ClusterClient,
    D: DnsProvider,
    P: HostProbe,
{
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("start to schedule reconcile cycles");

    loop {
        ticker.tick().await;

        reconciler.tick().await;
    }
}
