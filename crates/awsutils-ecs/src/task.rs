use std::{collections::BTreeMap, fmt, sync::Arc};

use awsutils_common::error::{AwsUtilsError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    client::TaskApi,
    types::{
        AwsVpcConfiguration, ContainerOverride, KeyValuePair, NetworkConfigurationInput,
        RunTaskInput, RunTaskOutput, TaskOverride,
    },
};

pub const LAUNCH_TYPE_FARGATE: &str = "FARGATE";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConfiguration {
    pub vpc: String,
    pub subnets: Vec<String>,
    pub security_group: String,
}

/// A task definition plus the overrides it is launched with.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EcsTask {
    pub task_definition: String,
    pub network: NetworkConfiguration,
    pub cluster: String,
    pub environment: BTreeMap<String, String>,
    pub command: String,
    #[serde(skip)]
    api: Arc<dyn TaskApi>,
}

impl EcsTask {
    pub fn new(api: Arc<dyn TaskApi>, task_definition: &str, cluster: &str) -> Self {
        Self {
            task_definition: task_definition.to_string(),
            network: NetworkConfiguration::default(),
            cluster: cluster.to_string(),
            environment: BTreeMap::new(),
            command: String::new(),
            api,
        }
    }

    pub fn with_network(mut self, network: NetworkConfiguration) -> Self {
        self.network = network;
        self
    }

    pub fn with_env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// The `RunTask` input for one public-IP Fargate task whose single
    /// container override is named after the task definition.
    pub fn run_task_input(&self) -> Result<RunTaskInput> {
        if self.task_definition.is_empty() {
            return Err(AwsUtilsError::InvalidArgument(
                "task definition is required".to_string(),
            ));
        }
        if self.network.subnets.is_empty() {
            return Err(AwsUtilsError::InvalidArgument(
                "at least one subnet is required".to_string(),
            ));
        }

        let security_groups = if self.network.security_group.is_empty() {
            Vec::new()
        } else {
            vec![self.network.security_group.clone()]
        };

        Ok(RunTaskInput {
            cluster: self.cluster.clone(),
            task_definition: self.task_definition.clone(),
            group: format!("family:{}", self.task_definition),
            launch_type: LAUNCH_TYPE_FARGATE.to_string(),
            network_configuration: NetworkConfigurationInput {
                awsvpc_configuration: AwsVpcConfiguration {
                    subnets: self.network.subnets.clone(),
                    security_groups,
                    assign_public_ip: "ENABLED".to_string(),
                },
            },
            overrides: TaskOverride {
                container_overrides: vec![ContainerOverride {
                    name: self.task_definition.clone(),
                    command: self.command.split_whitespace().map(str::to_string).collect(),
                    environment: self
                        .environment
                        .iter()
                        .map(|(name, value)| KeyValuePair {
                            name: name.clone(),
                            value: value.clone(),
                        })
                        .collect(),
                }],
            },
        })
    }

    pub async fn run_fargate_task(&self) -> Result<RunTaskOutput> {
        let input = self.run_task_input()?;
        let output = self.api.run_task(&input).await?;

        for task in &output.tasks {
            info!(task_arn = %task.task_arn, cluster = %self.cluster, "task started");
        }
        for failure in &output.failures {
            warn!(arn = %failure.arn, reason = %failure.reason, "task failed to start");
        }
        Ok(output)
    }
}

impl fmt::Debug for EcsTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EcsTask")
            .field("task_definition", &self.task_definition)
            .field("network", &self.network)
            .field("cluster", &self.cluster)
            .field("environment", &self.environment)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}
