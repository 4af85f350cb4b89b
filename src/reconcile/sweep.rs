use std::time::Duration;

use tracing::{debug, error, info, instrument};

use super::tracker::{RecordState, SharedState};
use super::{bounded, DnsProvider, HostProbe};

/// Remove CNAMEs whose load balancer no longer resolves, and promote
/// `Creating` records whose load balancer has come up.
///
/// A `Creating` record is never removed here, whatever the probe says. Every
/// failure is logged and left for the next cycle.
#[instrument(skip_all, fields(zone = %zone))]
pub async fn sweep<D, P>(
    state: &SharedState,
    dns: &D,
    probe: &P,
    zone: &str,
    call_timeout: Option<Duration>,
) where
    D: DnsProvider,
    P: HostProbe,
{
    let records = state.read().await.records.snapshot();

    for record in records.into_iter().filter(|record| !record.target.is_empty()) {
        let hostname = record.hostname.as_str();
        let target = record.target.as_str();

        debug!(hostname, target, "checking load balancer");

        match bounded("probe load balancer", call_timeout, probe.resolve(target)).await {
            Err(err) if record.state == RecordState::Creating => {
                info!(hostname, target, %err, "load balancer is still not up yet");
            }

            Err(err) => {
                info!(hostname, target, %err, "load balancer doesn't exist, removing cname");

                match bounded(
                    "remove cname",
                    call_timeout,
                    dns.remove_cname(zone, hostname, target),
                )
                .await
                {
                    Err(err) => {
                        error!(hostname, target, %err, "remove cname failed, retry next cycle");
                    }

                    Ok(()) => {
                        state.write().await.records.remove(hostname);

                        info!(hostname, target, "cname removed");
                    }
                }
            }

            Ok(()) if record.state == RecordState::Creating => {
                state
                    .write()
                    .await
                    .records
                    .set_state(hostname, RecordState::InUse);

                info!(hostname, target, "load balancer is now up");
            }

            Ok(()) => {}
        }
    }
}
