//! Provider configuration: block attributes with environment fallbacks

use aws_config::{BehaviorVersion, Region, SdkConfig};
use tfplug::types::{Diagnostic, Dynamic};

use crate::api::{Client, HttpTransport, RetryConfig};
use crate::flex::{get_i64, get_non_empty};

/// Upper bound for `max_retries` from either the block or the environment
pub const MAX_RETRIES: u32 = 25;

#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub region: String,
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub max_retries: u32,
}

impl ProviderConfig {
    /// Resolves the provider block, falling back to `AWS_REGION`,
    /// `AWS_DEFAULT_REGION`, `AWS_PROFILE`, `AGENTCORE_ENDPOINT` and
    /// `AGENTCORE_MAX_RETRIES`
    pub fn from_config(config: &Dynamic) -> Result<Self, Vec<Diagnostic>> {
        let mut diagnostics = vec![];

        let region = get_non_empty(config, "region")
            .or_else(|| env("AWS_REGION"))
            .or_else(|| env("AWS_DEFAULT_REGION"));
        let profile = get_non_empty(config, "profile").or_else(|| env("AWS_PROFILE"));
        let endpoint = get_non_empty(config, "endpoint").or_else(|| env("AGENTCORE_ENDPOINT"));

        let max_retries = match get_i64(config, "max_retries") {
            Some(n) => Some(n),
            None => match env("AGENTCORE_MAX_RETRIES") {
                Some(raw) => match raw.parse::<i64>() {
                    Ok(n) => Some(n),
                    Err(_) => {
                        diagnostics.push(Diagnostic::error(
                            "Invalid AGENTCORE_MAX_RETRIES",
                            format!("\"{}\" is not an integer", raw),
                        ));
                        None
                    }
                },
                None => None,
            },
        };
        let max_retries = match max_retries {
            Some(n) => match u32::try_from(n) {
                Ok(n) if n <= MAX_RETRIES => n,
                _ => {
                    diagnostics.push(Diagnostic::error(
                        "Invalid max_retries",
                        format!("max_retries must be between 0 and {}, got {}", MAX_RETRIES, n),
                    ));
                    0
                }
            },
            None => RetryConfig::default().max_retries,
        };

        if let Some(endpoint) = &endpoint {
            if let Err(e) = url::Url::parse(endpoint) {
                diagnostics.push(Diagnostic::error(
                    "Invalid endpoint",
                    format!("\"{}\" is not a valid URL: {}", endpoint, e),
                ));
            }
        }

        let region = match region {
            Some(region) => region,
            None => {
                diagnostics.push(Diagnostic::error(
                    "Missing region",
                    "region is required (set it in the provider block or via AWS_REGION / AWS_DEFAULT_REGION)",
                ));
                String::new()
            }
        };

        if diagnostics.is_empty() {
            Ok(Self {
                region,
                profile,
                endpoint,
                max_retries,
            })
        } else {
            Err(diagnostics)
        }
    }

    /// Control-plane base URL for the configured region
    pub fn endpoint_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!(
                "https://bedrock-agentcore-control.{}.amazonaws.com",
                self.region
            ),
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            ..RetryConfig::default()
        }
    }

    /// Loads the shared AWS configuration (credential chain, profile files)
    pub async fn load_sdk_config(&self) -> SdkConfig {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(self.region.clone()));
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        loader.load().await
    }

    /// Builds the signed HTTP client
    pub async fn build_client(&self) -> Result<Client, Diagnostic> {
        let sdk_config = self.load_sdk_config().await;
        let credentials = sdk_config.credentials_provider().ok_or_else(|| {
            Diagnostic::error(
                "No AWS credentials",
                "No credentials provider could be resolved from the environment, profile or instance metadata",
            )
        })?;

        let transport = HttpTransport::new(
            &self.endpoint_url(),
            &self.region,
            credentials,
            self.retry_config(),
        )
        .map_err(|e| Diagnostic::error("Failed to create API client", e.to_string()))?;

        tracing::debug!(
            "Configured AgentCore client for {} ({})",
            self.region,
            self.endpoint_url()
        );
        Ok(Client::new(transport))
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flex::ObjectBuilder;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "AWS_REGION",
        "AWS_DEFAULT_REGION",
        "AWS_PROFILE",
        "AGENTCORE_ENDPOINT",
        "AGENTCORE_MAX_RETRIES",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn block_values_win_over_environment() {
        clear_env();
        env::set_var("AWS_REGION", "eu-west-1");

        let config = ObjectBuilder::new()
            .set("region", "us-west-2")
            .number("max_retries", Some(5))
            .build();
        let resolved = ProviderConfig::from_config(&config).unwrap();

        assert_eq!(resolved.region, "us-west-2");
        assert_eq!(resolved.max_retries, 5);
        assert_eq!(
            resolved.endpoint_url(),
            "https://bedrock-agentcore-control.us-west-2.amazonaws.com"
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn environment_fills_gaps() {
        clear_env();
        env::set_var("AWS_DEFAULT_REGION", "ap-southeast-2");
        env::set_var("AWS_PROFILE", "dev");
        env::set_var("AGENTCORE_ENDPOINT", "http://localhost:4566/");
        env::set_var("AGENTCORE_MAX_RETRIES", "1");

        let resolved = ProviderConfig::from_config(&Dynamic::Null).unwrap();

        assert_eq!(resolved.region, "ap-southeast-2");
        assert_eq!(resolved.profile.as_deref(), Some("dev"));
        assert_eq!(resolved.endpoint_url(), "http://localhost:4566");
        assert_eq!(resolved.max_retries, 1);
        clear_env();
    }

    #[test]
    #[serial]
    fn aws_region_preferred_over_default_region() {
        clear_env();
        env::set_var("AWS_REGION", "us-east-1");
        env::set_var("AWS_DEFAULT_REGION", "us-east-2");

        let resolved = ProviderConfig::from_config(&Dynamic::Null).unwrap();
        assert_eq!(resolved.region, "us-east-1");
        assert_eq!(resolved.max_retries, 3);
        clear_env();
    }

    #[test]
    #[serial]
    fn missing_region_is_reported() {
        clear_env();

        let diagnostics = ProviderConfig::from_config(&Dynamic::Null).unwrap_err();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].summary, "Missing region");
    }

    #[test]
    #[serial]
    fn out_of_range_retries_are_rejected() {
        clear_env();
        env::set_var("AWS_REGION", "us-east-1");

        for raw in ["100", "-1", "9223372036854775807"] {
            env::set_var("AGENTCORE_MAX_RETRIES", raw);
            let diagnostics = ProviderConfig::from_config(&Dynamic::Null).unwrap_err();
            assert_eq!(diagnostics.len(), 1, "{}", raw);
            assert_eq!(diagnostics[0].summary, "Invalid max_retries");
        }

        env::set_var("AGENTCORE_MAX_RETRIES", "25");
        let resolved = ProviderConfig::from_config(&Dynamic::Null).unwrap();
        assert_eq!(resolved.max_retries, MAX_RETRIES);
        clear_env();
    }

    #[test]
    #[serial]
    fn bad_values_are_reported_together() {
        clear_env();
        env::set_var("AGENTCORE_MAX_RETRIES", "many");

        let config = ObjectBuilder::new()
            .set("region", "us-east-1")
            .set("endpoint", "not a url")
            .build();
        let diagnostics = ProviderConfig::from_config(&config).unwrap_err();

        assert_eq!(diagnostics.len(), 2);
        clear_env();
    }
}
