use async_trait::async_trait;
use aws_sdk_ecs::{
    Client,
    error::{ProvideErrorMetadata, SdkError},
    types::{
        AssignPublicIp, AwsVpcConfiguration as SdkVpcConfiguration,
        ContainerOverride as SdkContainerOverride, KeyValuePair as SdkKeyValuePair, LaunchType,
        NetworkConfiguration as SdkNetworkConfiguration, TaskOverride as SdkTaskOverride,
    },
};
use awsutils_auth::{
    remote::{CallFailure, remote_error},
    session::Session,
};
use awsutils_common::error::{AwsUtilsError, Result};

use crate::types::{ContainerOverride, Failure, RunTaskInput, RunTaskOutput, Task};

const SERVICE: &str = "ecs";

/// Remote container-task operations.
#[async_trait]
pub trait TaskApi: Send + Sync {
    async fn run_task(&self, input: &RunTaskInput) -> Result<RunTaskOutput>;
}

#[derive(Debug, Clone)]
pub struct EcsClient {
    client: Client,
}

impl EcsClient {
    pub fn new(session: &Session) -> Self {
        Self {
            client: Client::new(session.sdk_config()),
        }
    }
}

fn sdk_error<E>(operation: &'static str, err: SdkError<E>) -> AwsUtilsError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    let service_error = err.as_service_error();
    remote_error(
        SERVICE,
        operation,
        CallFailure {
            status: err.raw_response().map(|response| response.status().as_u16()),
            code: service_error.and_then(|service_error| service_error.code()),
            message: service_error.and_then(|service_error| service_error.message()),
            detail: CallFailure::describe(&err),
        },
    )
}

fn non_empty<T>(items: &[T]) -> Option<Vec<T>>
where
    T: Clone,
{
    (!items.is_empty()).then(|| items.to_vec())
}

fn network_configuration(input: &RunTaskInput) -> Result<SdkNetworkConfiguration> {
    let vpc = &input.network_configuration.awsvpc_configuration;
    let awsvpc = SdkVpcConfiguration::builder()
        .set_subnets(Some(vpc.subnets.clone()))
        .set_security_groups(non_empty(&vpc.security_groups))
        .assign_public_ip(AssignPublicIp::from(vpc.assign_public_ip.as_str()))
        .build()
        .map_err(|err| AwsUtilsError::InvalidArgument(format!("awsvpc configuration: {err}")))?;
    Ok(SdkNetworkConfiguration::builder()
        .awsvpc_configuration(awsvpc)
        .build())
}

fn container_override(container: &ContainerOverride) -> SdkContainerOverride {
    let environment = container
        .environment
        .iter()
        .map(|pair| {
            SdkKeyValuePair::builder()
                .name(&pair.name)
                .value(&pair.value)
                .build()
        })
        .collect::<Vec<_>>();
    SdkContainerOverride::builder()
        .name(&container.name)
        .set_command(non_empty(&container.command))
        .set_environment(non_empty(&environment))
        .build()
}

#[async_trait]
impl TaskApi for EcsClient {
    async fn run_task(&self, input: &RunTaskInput) -> Result<RunTaskOutput> {
        let overrides = SdkTaskOverride::builder()
            .set_container_overrides(Some(
                input
                    .overrides
                    .container_overrides
                    .iter()
                    .map(container_override)
                    .collect(),
            ))
            .build();

        let output = self
            .client
            .run_task()
            .set_cluster(Some(input.cluster.clone()).filter(|cluster| !cluster.is_empty()))
            .task_definition(&input.task_definition)
            .group(&input.group)
            .launch_type(LaunchType::from(input.launch_type.as_str()))
            .network_configuration(network_configuration(input)?)
            .overrides(overrides)
            .send()
            .await
            .map_err(|err| sdk_error("RunTask", err))?;

        Ok(RunTaskOutput {
            tasks: output
                .tasks()
                .iter()
                .map(|task| Task {
                    task_arn: task.task_arn().unwrap_or_default().to_string(),
                    cluster_arn: task.cluster_arn().unwrap_or_default().to_string(),
                    last_status: task.last_status().unwrap_or_default().to_string(),
                    desired_status: task.desired_status().unwrap_or_default().to_string(),
                })
                .collect(),
            failures: output
                .failures()
                .iter()
                .map(|failure| Failure {
                    arn: failure.arn().unwrap_or_default().to_string(),
                    reason: failure.reason().unwrap_or_default().to_string(),
                    detail: failure.detail().map(str::to_string),
                })
                .collect(),
        })
    }
}
