use std::collections::HashMap;
use std::env;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use cloudflare::endpoints::dns::{
    CreateDnsRecord, CreateDnsRecordParams, DeleteDnsRecord, DnsContent, DnsRecord, ListDnsRecords,
    ListDnsRecordsParams,
};
use cloudflare::endpoints::zone::{ListZones, ListZonesParams, Zone};
use cloudflare::framework::async_api::{ApiClient, Client};
use cloudflare::framework::auth::Credentials;
use cloudflare::framework::response::ApiFailure;
use cloudflare::framework::{Environment, HttpApiClientConfig};
use futures_util::TryFutureExt;
use http::StatusCode;
use tokio::sync::Mutex;
use tracing::{error, info, info_span, instrument, Instrument};

use crate::error::Error;
use crate::reconcile::{CnameRecord, DnsProvider};

const DEFAULT_TTL: Option<u32> = Some(120);

/// Cloudflare-backed CNAME management. Zone names are resolved to zone ids once
/// and cached.
#[derive(Clone)]
pub struct CfDns {
    client: Arc<Client>,
    zone_ids: Arc<Mutex<HashMap<String, String>>>,
}

impl Debug for CfDns {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("CfDns")
            .field("client", &"Client".to_string())
            .finish()
    }
}

impl CfDns {
    pub fn new() -> Result<Self> {
        let cred = create_credentials()?;

        let client = Client::new(
            cred,
            HttpApiClientConfig::default(),
            Environment::Production,
        )?;

        Ok(Self {
            client: Arc::new(client),
            zone_ids: Default::default(),
        })
    }

    #[instrument(err)]
    pub async fn zone_id(&self, zone: &str) -> Result<String, Error> {
        if let Some(zone_id) = self.zone_ids.lock().await.get(zone) {
            return Ok(zone_id.clone());
        }

        let zone_id = self.get_zone_id(zone).await?;

        info!(zone, %zone_id, "resolve zone id done");

        self.zone_ids
            .lock()
            .await
            .insert(zone.to_string(), zone_id.clone());

        Ok(zone_id)
    }

    #[instrument(err)]
    async fn get_zone_id(&self, zone: &str) -> Result<String, Error> {
        let list_zones_req = ListZones {
            params: ListZonesParams {
                name: Some(zone.to_string()),
                status: None,
                page: None,
                per_page: None,
                order: None,
                direction: None,
                search_match: None,
            },
        };

        let list_zones_resp = self.client.request(&list_zones_req).await.map_err(|err| {
            error!(%err, get_zone_request = ?list_zones_req, "send get zone id request failed");

            err
        })?;

        if let Some(api_err) = list_zones_resp.errors.first() {
            error!(%api_err, "list zone failed with response");

            return Err(Error::CloudflareApi(api_err.to_string()));
        }

        let zones: Vec<Zone> = list_zones_resp.result;

        zones
            .into_iter()
            .find_map(|zone_info| (zone_info.name == zone).then(|| zone_info.id))
            .ok_or_else(|| {
                error!(?zone, "zone is not exist");

                Error::CloudflareApi(format!("zone {} is not exist", zone))
            })
    }

    #[instrument(err)]
    async fn list_records(&self, name: &str, zone_id: &str) -> Result<Vec<DnsRecord>, Error> {
        let list_dns_req = ListDnsRecords {
            zone_identifier: zone_id,
            params: ListDnsRecordsParams {
                record_type: None,
                name: Some(name.to_string()),
                page: None,
                per_page: None,
                order: None,
                direction: None,
                search_match: None,
            },
        };

        let list_dns_resp = self
            .client
            .request(&list_dns_req)
            .inspect_err(|err| {
                error!(?list_dns_req, %err, "list dns failed");
            })
            .await?;

        if let Some(api_err) = list_dns_resp.errors.first() {
            error!(%api_err, "list dns failed with response");

            return Err(Error::CloudflareApi(api_err.to_string()));
        }

        Ok(list_dns_resp.result)
    }
}

#[async_trait]
impl DnsProvider for CfDns {
    #[instrument(err)]
    async fn lookup(&self, zone: &str, hostname: &str) -> Result<Vec<CnameRecord>, Error> {
        let zone_id = self.zone_id(zone).await?;

        let records = self
            .list_records(hostname, &zone_id)
            .await?
            .into_iter()
            .filter_map(|record| {
                cname_target(hostname, &record.name, &record.content).map(|target| CnameRecord {
                    target: target.to_string(),
                })
            })
            .collect::<Vec<_>>();

        info!(hostname, zone, ?records, "get cname records success");

        Ok(records)
    }

    #[instrument(err)]
    async fn create_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        let zone_id = self.zone_id(zone).await?;

        let create_dns_req = CreateDnsRecord {
            zone_identifier: &zone_id,
            params: CreateDnsRecordParams {
                ttl: DEFAULT_TTL,
                priority: None,
                proxied: None,
                name: hostname,
                content: DnsContent::CNAME {
                    content: target.to_string(),
                },
            },
        };

        let create_dns_resp = self
            .client
            .request(&create_dns_req)
            .instrument(info_span!("create_dns_record"))
            .await
            .map_err(|err| {
                error!(hostname, zone, %zone_id, target, %err, "create cname failed");

                err
            })?;

        if let Some(api_err) = create_dns_resp.errors.first() {
            return Err(Error::CloudflareApi(api_err.to_string()));
        }

        info!(hostname, zone, target, "create cname success");

        Ok(())
    }

    #[instrument(err)]
    async fn remove_cname(&self, zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        let zone_id = self.zone_id(zone).await?;

        let dns_list = self.list_records(hostname, &zone_id).await?;

        for dns_record in dns_list
            .into_iter()
            .filter(|record| cname_target(hostname, &record.name, &record.content) == Some(target))
        {
            let delete_dns_req = DeleteDnsRecord {
                zone_identifier: &zone_id,
                identifier: &dns_record.id,
            };

            let delete_dns_resp = match self.client.request(&delete_dns_req).await {
                Err(ApiFailure::Error(status_code, _)) if status_code == StatusCode::NOT_FOUND => {
                    info!(hostname, %zone_id, "cname has been removed");

                    continue;
                }

                Err(err) => {
                    error!(?delete_dns_req, %err, "delete cname failed");

                    return Err(err.into());
                }

                Ok(resp) => resp,
            };

            if let Some(api_err) = delete_dns_resp.errors.first() {
                error!(%api_err, "delete cname failed with response");

                return Err(Error::CloudflareApi(api_err.to_string()));
            }
        }

        info!(hostname, zone, target, "remove cname success");

        Ok(())
    }
}

/// The CNAME target of a listed record, if it is a CNAME for exactly `hostname`.
fn cname_target<'a>(hostname: &str, name: &str, content: &'a DnsContent) -> Option<&'a str> {
    match content {
        DnsContent::CNAME { content } if name == hostname => Some(content.as_str()),

        _ => None,
    }
}

fn create_credentials() -> Result<Credentials> {
    if let Some(cred) = create_credentials_from_email() {
        return Ok(cred);
    }

    create_credentials_from_token()
        .ok_or_else(|| anyhow::anyhow!("can't find cloudflare (email, key) or token"))
}

fn create_credentials_from_email() -> Option<Credentials> {
    let email = env::var("CF_DNS_EMAIL").ok()?;
    let key = env::var("CF_DNS_KEY").ok()?;

    Some(Credentials::UserAuthKey { email, key })
}

fn create_credentials_from_token() -> Option<Credentials> {
    let token = env::var("CF_DNS_TOKEN").ok()?;

    Some(Credentials::UserAuthToken { token })
}
