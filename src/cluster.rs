use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Service;
use kube::api::ListParams;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tap::TapFallible;
use tracing::{error, info, instrument};

use crate::error::Error;
use crate::reconcile::{ClusterClient, ServiceView};

/// Lists services across all namespaces through the Kubernetes API.
#[derive(Clone)]
pub struct KubeCluster {
    client: Client,
    annotation: String,
}

impl KubeCluster {
    /// Connect with `kubeconfig` when given, otherwise infer the in-cluster or
    /// default kubeconfig setup.
    pub async fn connect(kubeconfig: Option<&Path>, annotation: impl Into<String>) -> Result<Self> {
        let client = match kubeconfig {
            None => Client::try_default().await?,
            Some(path) => {
                let kubeconfig = Kubeconfig::read_from(path)?;
                let config =
                    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                        .await?;

                info!(cluster_url = %config.cluster_url, "use kubeconfig");

                Client::try_from(config)?
            }
        };

        Ok(Self {
            client,
            annotation: annotation.into(),
        })
    }
}

#[async_trait]
impl ClusterClient for KubeCluster {
    #[instrument(err, skip(self))]
    async fn list_services(&self) -> Result<Vec<ServiceView>, Error> {
        let service_api: Api<Service> = Api::all(self.client.clone());

        let services = service_api
            .list(&ListParams::default())
            .await
            .tap_err(|err| error!(%err, "list services failed"))?;

        Ok(services
            .items
            .iter()
            .map(|svc| service_view(svc, &self.annotation))
            .collect())
    }
}

fn service_view(svc: &Service, annotation: &str) -> ServiceView {
    let public_hostname = svc
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(annotation))
        .filter(|hostname| !hostname.is_empty())
        .cloned();

    // only the first ingress counts; a CNAME needs a hostname, not an IP
    let load_balancer = svc
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first())
        .and_then(|ingress| ingress.hostname.clone())
        .filter(|hostname| !hostname.is_empty());

    ServiceView {
        name: svc.metadata.name.clone().unwrap_or_default(),
        namespace: svc.metadata.namespace.clone().unwrap_or_default(),
        public_hostname,
        load_balancer,
    }
}
