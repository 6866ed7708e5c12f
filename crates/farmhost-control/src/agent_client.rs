//! HTTP client for sending commands to render host agents.
//!
//! Every render host runs an agent that accepts reboot commands. This module
//! provides the `HostAgentClient` trait and its HTTP and no-op implementations.

use std::time::Duration;

use async_trait::async_trait;
use farmhost_store::Host;
use serde::Serialize;
use thiserror::Error;

use crate::error::{ControlError, Result};
use crate::types::ManagerConfig;

/// Errors returned by a host agent.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent did not acknowledge the command.
    #[error("host agent on {host} unreachable: {reason}")]
    Unreachable {
        /// Hostname the command was sent to.
        host: String,
        /// What went wrong.
        reason: String,
    },
}

/// Trait for host agent communication.
///
/// This trait abstracts the agent transport, allowing for mock
/// implementations in tests.
#[async_trait]
pub trait HostAgentClient: Send + Sync {
    /// Ask the host to reboot once its running frames finish.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Unreachable` if the agent does not acknowledge.
    async fn reboot_when_idle(&self, host: &Host) -> std::result::Result<(), AgentError>;

    /// Ask the host to reboot immediately.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::Unreachable` if the agent does not acknowledge.
    async fn reboot_now(&self, host: &Host) -> std::result::Result<(), AgentError>;
}

/// HTTP client for render host agents.
///
/// Commands are POSTed to `http://{hostname}:{port}/v1/...`.
#[derive(Debug, Clone)]
pub struct HttpHostAgentClient {
    client: reqwest::Client,
    port: u16,
}

impl HttpHostAgentClient {
    /// Create a client with the given port and timeouts.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Internal` if the HTTP client cannot be built.
    pub fn new(port: u16, request_timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| ControlError::Internal(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, port })
    }

    /// Create a client from the manager configuration.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Internal` if the HTTP client cannot be built.
    pub fn from_config(config: &ManagerConfig) -> Result<Self> {
        Self::new(
            config.agent_port,
            config.agent_request_timeout(),
            config.agent_connect_timeout(),
        )
    }

    /// Get the agent port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    async fn send(&self, host: &Host, action: &str) -> std::result::Result<(), AgentError> {
        let url = format!("http://{}:{}/v1/{action}", host.name, self.port);
        let fail = |reason: String| AgentError::Unreachable {
            host: host.name.clone(),
            reason,
        };

        let response = self
            .client
            .post(&url)
            .json(&CommandRequest {
                host_id: host.host_id.to_string(),
            })
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {e}")))?;

        if response.status().is_success() {
            tracing::debug!(host = %host.name, action, "Host agent acknowledged command");
            Ok(())
        } else {
            Err(fail(format!(
                "agent returned status {}",
                response.status()
            )))
        }
    }
}

/// Request body for agent commands.
#[derive(Debug, Serialize)]
struct CommandRequest {
    host_id: String,
}

#[async_trait]
impl HostAgentClient for HttpHostAgentClient {
    async fn reboot_when_idle(&self, host: &Host) -> std::result::Result<(), AgentError> {
        self.send(host, "reboot-when-idle").await
    }

    async fn reboot_now(&self, host: &Host) -> std::result::Result<(), AgentError> {
        self.send(host, "reboot").await
    }
}

/// A no-op agent client for when host agents are not reachable from this process.
///
/// This client logs commands and acknowledges them.
#[derive(Debug, Clone, Default)]
pub struct NoopHostAgentClient;

impl NoopHostAgentClient {
    /// Create a new no-op agent client.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HostAgentClient for NoopHostAgentClient {
    async fn reboot_when_idle(&self, host: &Host) -> std::result::Result<(), AgentError> {
        tracing::warn!(
            host = %host.name,
            "NoopHostAgentClient: reboot_when_idle called but no agent transport configured"
        );
        Ok(())
    }

    async fn reboot_now(&self, host: &Host) -> std::result::Result<(), AgentError> {
        tracing::warn!(
            host = %host.name,
            "NoopHostAgentClient: reboot_now called but no agent transport configured"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use farmhost_core::{AllocationId, HostId};
    use farmhost_store::{HardwareState, LockState, ResourceStats};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn local_host() -> Host {
        Host {
            host_id: HostId::generate(),
            name: "127.0.0.1".to_string(),
            allocation_id: AllocationId::generate(),
            lock_state: LockState::Open,
            lock_source: None,
            lock_changed_at: None,
            hardware_state: HardwareState::Up,
            cores: 8,
            stats: ResourceStats::default(),
            manual_tags: std::collections::BTreeSet::new(),
            hardware_tags: std::collections::BTreeSet::new(),
            tags: vec![],
            preferred_show: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_report_at: None,
        }
    }

    fn client_for(server: &MockServer) -> HttpHostAgentClient {
        HttpHostAgentClient::new(
            server.address().port(),
            Duration::from_secs(2),
            Duration::from_secs(1),
        )
        .unwrap()
    }

    #[test]
    fn noop_client_creation() {
        let client = NoopHostAgentClient::new();
        assert!(format!("{client:?}").contains("NoopHostAgentClient"));
    }

    #[test]
    fn http_client_from_config() {
        let client = HttpHostAgentClient::from_config(&ManagerConfig::default()).unwrap();
        assert_eq!(client.port(), 8444);
    }

    #[tokio::test]
    async fn reboot_now_acknowledged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/reboot"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).reboot_now(&local_host()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn reboot_when_idle_acknowledged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/reboot-when-idle"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).reboot_when_idle(&local_host()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn error_status_is_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/reboot"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).reboot_now(&local_host()).await;
        assert!(matches!(result, Err(AgentError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn noop_client_acks() {
        let client = NoopHostAgentClient::new();
        assert!(client.reboot_now(&local_host()).await.is_ok());
        assert!(client.reboot_when_idle(&local_host()).await.is_ok());
    }
}
