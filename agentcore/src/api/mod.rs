//! Bedrock AgentCore control-plane API
//!
//! `Client` speaks to the service through a `Transport`; the production
//! transport signs requests with SigV4 and sends them with reqwest.

pub mod browser;
pub mod client;
pub mod code_interpreter;
pub mod error;
pub mod gateway;
pub mod http;
pub mod identity;
pub mod memory;
pub mod runtime;
pub mod signer;
pub mod test_helpers;

pub use client::Client;
pub use error::ApiError;
pub use http::{HttpTransport, RetryConfig};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

/// One control-plane call: method, path relative to the endpoint, JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Sends a request and returns the decoded JSON body; an empty body is `{}`
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<Value, ApiError>;
}

/// Lifecycle status shared by one family of AgentCore resources.
/// Unrecognised values decode as `Unknown` instead of failing the read.
macro_rules! status_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
            #[default]
            #[serde(other)]
            Unknown,
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                    Self::Unknown => "UNKNOWN",
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use status_enum;

/// Percent-encodes one path segment
pub(crate) fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}
