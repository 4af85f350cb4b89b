use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kube::error::ErrorResponse;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::{ClusterClient, CnameRecord, DnsProvider, HostProbe, ServiceView};
use crate::error::Error;

pub fn service(name: &str, template: Option<&str>, load_balancer: Option<&str>) -> ServiceView {
    ServiceView {
        name: name.to_string(),
        namespace: "default".to_string(),
        public_hostname: template.map(str::to_string),
        load_balancer: load_balancer.map(str::to_string),
    }
}

#[derive(Default)]
pub struct FakeCluster {
    services: Mutex<Option<Vec<ServiceView>>>,
    fail: AtomicBool,
}

impl FakeCluster {
    pub fn with_services(services: Vec<ServiceView>) -> Self {
        Self {
            services: Mutex::new(Some(services)),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_services(&self, services: Vec<ServiceView>) {
        *self.services.lock().unwrap() = Some(services);
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    async fn list_services(&self) -> Result<Vec<ServiceView>, Error> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(kube::Error::Api(ErrorResponse {
                status: "Failure".to_string(),
                message: "list services failed".to_string(),
                reason: "InternalError".to_string(),
                code: 500,
            })
            .into());
        }

        self.services
            .lock()
            .unwrap()
            .clone()
            .ok_or(Error::ClusterNotReady)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnsCall {
    Create { hostname: String, target: String },
    Remove { hostname: String, target: String },
}

/// In-memory zone that records every mutating call.
#[derive(Default)]
pub struct FakeDns {
    records: Mutex<HashMap<String, Vec<String>>>,
    calls: Mutex<Vec<DnsCall>>,
    lookups: AtomicUsize,
    fail_create: AtomicBool,
    fail_remove: AtomicBool,
    lookup_delay: Mutex<Option<Duration>>,
    remove_delay: Mutex<Option<Duration>>,
}

impl FakeDns {
    pub fn with_record(hostname: &str, target: &str) -> Self {
        let dns = Self::default();
        dns.records
            .lock()
            .unwrap()
            .insert(hostname.to_string(), vec![target.to_string()]);

        dns
    }

    pub fn calls(&self) -> Vec<DnsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn fail_remove(&self, fail: bool) {
        self.fail_remove.store(fail, Ordering::SeqCst);
    }

    pub fn delay_lookups(&self, delay: Duration) {
        *self.lookup_delay.lock().unwrap() = Some(delay);
    }

    pub fn delay_removes(&self, delay: Duration) {
        *self.remove_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl DnsProvider for FakeDns {
    async fn lookup(&self, _zone: &str, hostname: &str) -> Result<Vec<CnameRecord>, Error> {
        self.lookups.fetch_add(1, Ordering::SeqCst);

        let delay = *self.lookup_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .get(hostname)
            .map(|targets| {
                targets
                    .iter()
                    .map(|target| CnameRecord {
                        target: target.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn create_cname(&self, _zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push(DnsCall::Create {
            hostname: hostname.to_string(),
            target: target.to_string(),
        });

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::CloudflareApi("create refused".to_string()));
        }

        self.records
            .lock()
            .unwrap()
            .entry(hostname.to_string())
            .or_default()
            .push(target.to_string());

        Ok(())
    }

    async fn remove_cname(&self, _zone: &str, hostname: &str, target: &str) -> Result<(), Error> {
        self.calls.lock().unwrap().push(DnsCall::Remove {
            hostname: hostname.to_string(),
            target: target.to_string(),
        });

        let delay = *self.remove_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(Error::CloudflareApi("remove refused".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        if let Some(targets) = records.get_mut(hostname) {
            targets.retain(|existing| existing != target);
            if targets.is_empty() {
                records.remove(hostname);
            }
        }

        Ok(())
    }
}

/// Hosts resolve only after being marked alive.
#[derive(Default)]
pub struct FakeProbe {
    alive: Mutex<HashSet<String>>,
    probes: AtomicUsize,
    probe_delay: Mutex<Option<Duration>>,
}

impl FakeProbe {
    pub fn set_alive(&self, host: &str, alive: bool) {
        let mut hosts = self.alive.lock().unwrap();
        if alive {
            hosts.insert(host.to_string());
        } else {
            hosts.remove(host);
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn delay_probes(&self, delay: Duration) {
        *self.probe_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl HostProbe for FakeProbe {
    async fn resolve(&self, host: &str) -> Result<(), Error> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        let delay = *self.probe_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.alive.lock().unwrap().contains(host) {
            Ok(())
        } else {
            Err(Error::Lookup {
                host: host.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such host"),
            })
        }
    }
}

/// Counts `WARN` events seen while installed as the default subscriber.
#[derive(Clone, Default)]
pub struct WarnCounter(Arc<AtomicUsize>);

impl WarnCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}
