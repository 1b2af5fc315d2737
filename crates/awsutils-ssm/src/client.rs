use async_trait::async_trait;
use aws_sdk_ssm::{
    Client,
    error::{ProvideErrorMetadata, SdkError},
};
use awsutils_auth::{
    remote::{CallFailure, remote_error},
    session::Session,
};
use awsutils_common::error::{AwsUtilsError, Result};

use crate::types::{GetParametersOutput, Parameter};

const SERVICE: &str = "ssm";

/// Remote parameter-store operations.
#[async_trait]
pub trait ParameterApi: Send + Sync {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<Parameter>;
    /// At most ten names per call.
    async fn get_parameters(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> Result<GetParametersOutput>;
}

#[derive(Debug, Clone)]
pub struct SsmClient {
    client: Client,
}

impl SsmClient {
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

#[async_trait]
impl ParameterApi for SsmClient {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<Parameter> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|err| sdk_error("GetParameter", err))?;
        output
            .parameter()
            .map(Parameter::from)
            .ok_or_else(|| AwsUtilsError::InvalidResponse {
                service: SERVICE,
                message: format!("GetParameter: no parameter returned for {name}"),
            })
    }

    async fn get_parameters(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> Result<GetParametersOutput> {
        let output = self
            .client
            .get_parameters()
            .set_names(Some(names.to_vec()))
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|err| sdk_error("GetParameters", err))?;
        Ok(GetParametersOutput {
            parameters: output.parameters().iter().map(Parameter::from).collect(),
            invalid_parameters: output.invalid_parameters().to_vec(),
        })
    }
}
