use std::collections::HashMap;

const ENV_PLACEHOLDER: &str = "{env}";
const REGION_PLACEHOLDER: &str = "{region}";

/// Where this reconciler is deployed, substituted into hostname templates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub env: String,
    pub region: String,
}

impl Placement {
    pub fn new(env: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            env: env.into(),
            region: region.into(),
        }
    }

    /// Replace every `{env}`, then every `{region}` in `template`.
    ///
    /// The region pass runs over the output of the env pass. Anything else is
    /// passed through untouched.
    pub fn substitute(&self, template: &str) -> String {
        let hostname = if template.contains(ENV_PLACEHOLDER) {
            template.replace(ENV_PLACEHOLDER, &self.env)
        } else {
            template.to_string()
        };

        if hostname.contains(REGION_PLACEHOLDER) {
            hostname.replace(REGION_PLACEHOLDER, &self.region)
        } else {
            hostname
        }
    }
}

/// Raw template → resolved hostname, for one generation.
#[derive(Debug, Default)]
pub struct TemplateCache {
    resolved: HashMap<String, String>,
}

impl TemplateCache {
    pub fn get(&self, template: &str) -> Option<&str> {
        self.resolved.get(template).map(String::as_str)
    }

    pub fn insert(&mut self, template: impl Into<String>, hostname: impl Into<String>) {
        self.resolved.insert(template.into(), hostname.into());
    }

    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
