use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::RwLock;
use tracing::info;

use super::hostname::{Placement, TemplateCache};

/// Tracking state shared between the reconcile loop and read-only HTTP handlers.
pub type SharedState = Arc<RwLock<Generation>>;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RecordState {
    Creating,
    InUse,
    // not assigned by the reconcile loop yet
    Duplicate,
    Error,
}

impl Display for RecordState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = match self {
            RecordState::Creating => "CREATING",
            RecordState::InUse => "INUSE",
            RecordState::Duplicate => "DUPLICATE",
            RecordState::Error => "ERROR",
        };

        f.write_str(state)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TrackedRecord {
    pub hostname: String,
    /// Load balancer hostname the CNAME points at.
    pub target: String,
    pub state: RecordState,
    pub owning_service: String,
    /// Namespace of `owning_service`; service names are only unique per namespace.
    pub owning_namespace: String,
}

impl TrackedRecord {
    pub fn new(
        hostname: impl Into<String>,
        target: impl Into<String>,
        state: RecordState,
        owning_service: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            target: target.into(),
            state,
            owning_service: owning_service.into(),
            owning_namespace: String::new(),
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.owning_namespace = namespace.into();
        self
    }

    pub fn is_owned_by(&self, namespace: &str, service: &str) -> bool {
        self.owning_namespace == namespace && self.owning_service == service
    }

    /// `namespace/service`, or the bare service name when no namespace is known.
    pub fn owner(&self) -> String {
        if self.owning_namespace.is_empty() {
            self.owning_service.clone()
        } else {
            format!("{}/{}", self.owning_namespace, self.owning_service)
        }
    }
}

/// Resolved hostname → tracked record. At most one record per hostname.
#[derive(Debug, Default)]
pub struct RecordTracker {
    records: HashMap<String, TrackedRecord>,
}

impl RecordTracker {
    pub fn get(&self, hostname: &str) -> Option<&TrackedRecord> {
        self.records.get(hostname)
    }

    pub fn contains(&self, hostname: &str) -> bool {
        self.records.contains_key(hostname)
    }

    /// Track `record` unless its hostname is already tracked; the existing
    /// entry always wins.
    pub fn insert_if_absent(&mut self, record: TrackedRecord) -> bool {
        if self.records.contains_key(&record.hostname) {
            return false;
        }

        self.records.insert(record.hostname.clone(), record);

        true
    }

    pub fn set_state(&mut self, hostname: &str, state: RecordState) -> bool {
        match self.records.get_mut(hostname) {
            None => false,
            Some(record) => {
                record.state = state;

                true
            }
        }
    }

    pub fn remove(&mut self, hostname: &str) -> Option<TrackedRecord> {
        self.records.remove(hostname)
    }

    /// Copy of every record, ordered by hostname.
    pub fn snapshot(&self) -> Vec<TrackedRecord> {
        self.records
            .values()
            .sorted_by(|a, b| a.hostname.cmp(&b.hostname))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// The record tracker and template cache share one lifetime: a reset replaces
/// both together, never one alone.
#[derive(Debug, Default)]
pub struct Generation {
    id: u64,
    pub records: RecordTracker,
    pub templates: TemplateCache,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Summary {
    pub generation: u64,
    pub records: usize,
    pub templates: usize,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "generation={} records={} templates={}",
            self.generation, self.records, self.templates
        )
    }
}

impl Generation {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// A fresh, empty generation following this one.
    pub fn next(&self) -> Self {
        Self::new(self.id + 1)
    }

    /// Resolve `template` for `placement`, memoized for this generation.
    pub fn resolve_hostname(&mut self, template: &str, placement: &Placement) -> String {
        if let Some(hostname) = self.templates.get(template) {
            return hostname.to_string();
        }

        let hostname = placement.substitute(template);

        if hostname != template && !self.records.contains(&hostname) {
            info!(%template, %hostname, "hostname template substituted");
        }

        self.templates.insert(template, hostname.clone());

        hostname
    }

    pub fn summary(&self) -> Summary {
        Summary {
            generation: self.id,
            records: self.records.len(),
            templates: self.templates.len(),
        }
    }
}
