use std::{collections::HashMap, fmt, sync::Arc};

use awsutils_common::error::Result;
use serde::Serialize;
use tracing::{debug, warn};

use crate::client::ParameterApi;

/// Largest batch `GetParameters` accepts.
pub const MAX_BATCH: usize = 10;

/// Parameters living under one path prefix, always read decrypted.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterStore {
    pub key_prefix: String,
    #[serde(skip)]
    api: Arc<dyn ParameterApi>,
}

impl ParameterStore {
    /// A non-empty prefix is normalised to start with `/`.
    pub fn new(api: Arc<dyn ParameterApi>, key_prefix: &str) -> Self {
        let key_prefix = match key_prefix.trim_end_matches('/') {
            "" => String::new(),
            prefix if prefix.starts_with('/') => prefix.to_string(),
            prefix => format!("/{prefix}"),
        };
        Self { key_prefix, api }
    }

    fn full_name(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{key}", self.key_prefix)
        }
    }

    fn short_name(&self, name: &str) -> String {
        if self.key_prefix.is_empty() {
            return name.to_string();
        }
        name.strip_prefix(&self.key_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(name)
            .to_string()
    }

    pub async fn get_parameter(&self, key: &str) -> Result<String> {
        let parameter = self.api.get_parameter(&self.full_name(key), true).await?;
        Ok(parameter.value)
    }

    /// Fetches `keys` in batches of `MAX_BATCH`, one call at a time.
    ///
    /// Returned keys have the prefix stripped. Names the store does not know
    /// are left out of the map.
    pub async fn get_parameters(&self, keys: &[String]) -> Result<HashMap<String, String>> {
        let names = keys
            .iter()
            .map(|key| self.full_name(key))
            .collect::<Vec<_>>();

        let mut parameters = HashMap::with_capacity(names.len());
        for (index, batch) in names.chunks(MAX_BATCH).enumerate() {
            let output = self.api.get_parameters(batch, true).await?;
            debug!(
                batch = index + 1,
                requested = batch.len(),
                returned = output.parameters.len(),
                "fetched parameter batch"
            );
            if !output.invalid_parameters.is_empty() {
                warn!(names = ?output.invalid_parameters, "parameters not found");
            }
            for parameter in output.parameters {
                parameters.insert(self.short_name(&parameter.name), parameter.value);
            }
        }
        Ok(parameters)
    }
}

impl fmt::Debug for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParameterStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ParameterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}
