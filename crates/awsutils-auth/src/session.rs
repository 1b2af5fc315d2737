use aws_config::{BehaviorVersion, Region, SdkConfig, meta::region::RegionProviderChain};
use aws_credential_types::Credentials;
use aws_smithy_types::retry::RetryConfig;
use tracing::debug;

pub const DEFAULT_REGION: &str = "us-east-1";
const STATIC_PROVIDER: &str = "awsutils-static";

/// Overrides applied on top of the default AWS configuration chain.
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Falls back to the environment or profile region, then `us-east-1`.
    pub region: Option<String>,
    /// Replaces the regional service endpoints for every client.
    pub endpoint: Option<String>,
    /// The default credential chain is used when absent.
    pub credentials: Option<Credentials>,
    pub max_attempts: Option<u32>,
}

impl SessionConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::default()
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint = normalize_endpoint(&endpoint.into());
        self.endpoint = if endpoint.is_empty() {
            None
        } else {
            Some(endpoint)
        };
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Pins a static key pair. Leaves the config untouched when either half
    /// is empty, so the default chain still applies.
    pub fn with_static_keys(
        self,
        access_key: &str,
        secret_key: &str,
        session_token: Option<&str>,
    ) -> Self {
        let (access_key, secret_key) = (access_key.trim(), secret_key.trim());
        if access_key.is_empty() || secret_key.is_empty() {
            return self;
        }
        let session_token = session_token
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string);
        self.with_credentials(Credentials::new(
            access_key,
            secret_key,
            session_token,
            None,
            STATIC_PROVIDER,
        ))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }
}

/// Resolved SDK configuration shared by the S3, SSM and ECS clients.
#[derive(Debug, Clone)]
pub struct Session {
    sdk: SdkConfig,
}

impl Session {
    pub async fn load(config: SessionConfig) -> Self {
        let region = RegionProviderChain::first_try(config.region.map(Region::new))
            .or_default_provider()
            .or_else(Region::new(DEFAULT_REGION));

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);
        if let Some(endpoint) = config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let Some(credentials) = config.credentials {
            loader = loader.credentials_provider(credentials);
        }
        if let Some(max_attempts) = config.max_attempts {
            loader = loader.retry_config(RetryConfig::standard().with_max_attempts(max_attempts));
        }

        let session = Self::from_sdk_config(loader.load().await);
        debug!(
            region = session.region(),
            endpoint = ?session.endpoint_url(),
            "loaded aws configuration"
        );
        session
    }

    pub fn from_sdk_config(sdk: SdkConfig) -> Self {
        Self { sdk }
    }

    pub fn sdk_config(&self) -> &SdkConfig {
        &self.sdk
    }

    pub fn region(&self) -> &str {
        self.sdk
            .region()
            .map(|region| -> &str { region.as_ref() })
            .unwrap_or(DEFAULT_REGION)
    }

    pub fn endpoint_url(&self) -> Option<&str> {
        self.sdk.endpoint_url()
    }

    /// Same credentials and endpoint override, different region.
    pub fn for_region(&self, region: &str) -> Self {
        Self {
            sdk: self
                .sdk
                .to_builder()
                .region(Region::new(region.to_string()))
                .build(),
        }
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() || endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

#[cfg(test)]
mod tests {
    use super::{Session, SessionConfig};

    #[test]
    fn endpoint_override_is_normalized() {
        let config = SessionConfig::new("us-east-1").with_endpoint("localhost:4566/");
        assert_eq!(config.endpoint.as_deref(), Some("https://localhost:4566"));

        let config = SessionConfig::new("us-east-1").with_endpoint("  ");
        assert!(config.endpoint.is_none());
    }

    #[test]
    fn partial_key_pair_keeps_the_default_chain() {
        assert!(
            SessionConfig::default()
                .with_static_keys("AKID", "", None)
                .credentials
                .is_none()
        );

        let config = SessionConfig::default().with_static_keys("AKID", "topsecret", Some(""));
        let credentials = config.credentials.clone().unwrap();
        assert_eq!(credentials.access_key_id(), "AKID");
        assert!(credentials.session_token().is_none());
        assert!(!format!("{config:?}").contains("topsecret"));
    }

    #[tokio::test]
    async fn explicit_overrides_reach_the_sdk_config() {
        let session = Session::load(
            SessionConfig::new("eu-west-1")
                .with_endpoint("http://127.0.0.1:4566")
                .with_static_keys("AKID", "SECRET", None)
                .with_max_attempts(1),
        )
        .await;

        assert_eq!(session.region(), "eu-west-1");
        assert_eq!(session.endpoint_url(), Some("http://127.0.0.1:4566"));
        assert!(session.sdk_config().credentials_provider().is_some());

        let moved = session.for_region("ap-south-1");
        assert_eq!(moved.region(), "ap-south-1");
        assert_eq!(moved.endpoint_url(), Some("http://127.0.0.1:4566"));
        assert_eq!(session.region(), "eu-west-1");
    }
}
