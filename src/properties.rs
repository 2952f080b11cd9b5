use crate::generator::KeyDistribution;
use crate::workload::WorkloadParams;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional overrides read from a YAML file passed with `-p`.
///
/// ```yaml
/// url: http://10.0.33.209:3000
/// keys: 10000
/// requests: 100000
/// put_ratio: 0.2
/// get_ratio: 0.8
/// ```
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Properties {
    pub name: Option<String>,
    pub url: Option<String>,
    pub keys: Option<u64>,
    pub requests: Option<u64>,
    pub put_ratio: Option<f64>,
    pub get_ratio: Option<f64>,
    pub distribution: Option<KeyDistribution>,
    pub zipf_exponent: Option<f64>,
    pub seed: Option<u64>,
    pub payload: Option<PathBuf>,
    pub content_type: Option<String>,
}

impl Properties {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open properties file {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("failed to parse properties file {}", path.display()))
    }

    /// Replaces every field of `params` that is set here.
    pub fn apply(self, params: &mut WorkloadParams) {
        if let Some(v) = self.name {
            params.name = v;
        }
        if let Some(v) = self.url {
            params.base_url = v;
        }
        if let Some(v) = self.keys {
            params.key_count = v;
        }
        if let Some(v) = self.requests {
            params.operation_count = v;
        }
        if let Some(v) = self.put_ratio {
            params.put_ratio = v;
        }
        if self.get_ratio.is_some() {
            params.get_ratio = self.get_ratio;
        }
        if let Some(v) = self.distribution {
            params.distribution = v;
        }
        if let Some(v) = self.zipf_exponent {
            params.zipf_exponent = v;
        }
        if self.seed.is_some() {
            params.seed = self.seed;
        }
        if let Some(v) = self.payload {
            params.payload = v;
        }
        if let Some(v) = self.content_type {
            params.content_type = v;
        }
    }
}
