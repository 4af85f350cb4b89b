use anyhow::Result;
use tracing::{error, info};

use crate::cf_dns::CfDns;
use crate::cluster::KubeCluster;
use crate::config::Config;
use crate::http;
use crate::probe::SystemResolver;
use crate::reconcile::schedule::schedule;
use crate::reconcile::Reconciler;

pub async fn run_controller(config: Config) -> Result<()> {
    info!(
        env = %config.env,
        region = %config.region,
        zone = %config.hosted_zone,
        "start cname reconciler"
    );

    let cluster = KubeCluster::connect(config.kubeconfig.as_deref(), &config.annotation).await?;

    info!("init k8s client");

    let cf_dns = CfDns::new()?;
    let zone_id = cf_dns.zone_id(&config.hosted_zone).await?;

    info!(%zone_id, "init cf dns client");

    let reconciler = Reconciler::new(cluster, cf_dns, SystemResolver, config.settings());
    let state = reconciler.state();

    tokio::select! {
        _ = schedule(reconciler, config.interval) => {
            error!("reconcile schedule stopped, but that should not happened");
        }

        result = http::serve(config.listen, state) => {
            result?;

            error!("http server stopped, but that should not happened");
        }

        result = tokio::signal::ctrl_c() => {
            result?;

            info!("receive shutdown signal, exit now");
        }
    }

    Ok(())
}
