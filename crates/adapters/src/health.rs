// SPDX-License-Identifier: MIT

//! Health check transports: HTTP, TCP, process (launchd), and container
//! checks, plus the restart primitives the health monitor dispatches once
//! its own gating decides a restart is warranted. The health monitor
//! (`fleetd-engine`) owns interval/alert/restart policy; these transports
//! only answer "is it up" and shell out when told to restart something.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum HealthTransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("timed out")]
    Timeout,
    #[error("command failed: {0}")]
    CommandFailed(String),
}

#[async_trait]
pub trait HealthTransport: Send + Sync + 'static {
    /// Any HTTP response (including 4xx/5xx) is UP; only connection
    /// failure, DNS failure, or timeout is DOWN.
    async fn http_check(&self, url: &str, timeout: Duration) -> Result<(), HealthTransportError>;

    /// TCP connect check.
    async fn tcp_check(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), HealthTransportError>;

    /// Parses a launch-agent listing for a PID line; DOWN iff no PID.
    async fn process_check(&self, launch_label: &str) -> Result<bool, HealthTransportError>;

    /// Parses `docker ps --format` output; DOWN iff any declared container
    /// is absent or its status does not start with "Up".
    async fn container_check(
        &self,
        container_names: &[String],
    ) -> Result<Vec<bool>, HealthTransportError>;

    /// `launchctl kickstart -kp <label>`.
    async fn restart_process(&self, launch_label: &str) -> Result<(), HealthTransportError>;

    /// `docker restart <name>`.
    async fn restart_container(&self, container_name: &str) -> Result<(), HealthTransportError>;
}

#[derive(Clone, Default)]
pub struct SystemHealthTransport;

impl SystemHealthTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl HealthTransport for SystemHealthTransport {
    async fn http_check(&self, url: &str, timeout: Duration) -> Result<(), HealthTransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HealthTransportError::ConnectionFailed(e.to_string()))?;

        match client.get(url).send().await {
            Ok(_) => Ok(()),
            Err(e) if e.is_timeout() => Err(HealthTransportError::Timeout),
            Err(e) => Err(HealthTransportError::ConnectionFailed(e.to_string())),
        }
    }

    async fn tcp_check(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<(), HealthTransportError> {
        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(HealthTransportError::ConnectionFailed(e.to_string())),
            Err(_) => Err(HealthTransportError::Timeout),
        }
    }

    async fn process_check(&self, launch_label: &str) -> Result<bool, HealthTransportError> {
        let output = Command::new("launchctl")
            .args(["list", launch_label])
            .output()
            .await
            .map_err(|e| HealthTransportError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Ok(false);
        }
        let text = String::from_utf8_lossy(&output.stdout);
        Ok(text.lines().any(|line| line.trim_start().starts_with("\"PID\"")))
    }

    async fn container_check(
        &self,
        container_names: &[String],
    ) -> Result<Vec<bool>, HealthTransportError> {
        let output = Command::new("docker")
            .args(["ps", "--format", "{{.Names}}\t{{.Status}}"])
            .output()
            .await
            .map_err(|e| HealthTransportError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Ok(vec![false; container_names.len()]);
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let running: Vec<(&str, &str)> = text
            .lines()
            .filter_map(|line| line.split_once('\t'))
            .collect();

        Ok(container_names
            .iter()
            .map(|name| {
                running
                    .iter()
                    .any(|(n, status)| n == name && status.starts_with("Up"))
            })
            .collect())
    }

    async fn restart_process(&self, launch_label: &str) -> Result<(), HealthTransportError> {
        let output = Command::new("launchctl")
            .args(["kickstart", "-kp", launch_label])
            .output()
            .await
            .map_err(|e| HealthTransportError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(HealthTransportError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }

    async fn restart_container(&self, container_name: &str) -> Result<(), HealthTransportError> {
        let output = Command::new("docker")
            .args(["restart", container_name])
            .output()
            .await
            .map_err(|e| HealthTransportError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            return Err(HealthTransportError::CommandFailed(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeHealthTransport;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeState {
        http_up: HashMap<String, bool>,
        tcp_up: HashMap<(String, u16), bool>,
        process_up: HashMap<String, bool>,
        containers_up: HashMap<String, bool>,
        restarted_processes: Vec<String>,
        restarted_containers: Vec<String>,
    }

    #[derive(Clone, Default)]
    pub struct FakeHealthTransport {
        inner: Arc<Mutex<FakeState>>,
    }

    impl FakeHealthTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_http(&self, url: impl Into<String>, up: bool) {
            self.inner.lock().http_up.insert(url.into(), up);
        }

        pub fn set_tcp(&self, host: impl Into<String>, port: u16, up: bool) {
            self.inner.lock().tcp_up.insert((host.into(), port), up);
        }

        pub fn set_process(&self, label: impl Into<String>, up: bool) {
            self.inner.lock().process_up.insert(label.into(), up);
        }

        pub fn set_container(&self, name: impl Into<String>, up: bool) {
            self.inner.lock().containers_up.insert(name.into(), up);
        }

        pub fn restarted_processes(&self) -> Vec<String> {
            self.inner.lock().restarted_processes.clone()
        }

        pub fn restarted_containers(&self) -> Vec<String> {
            self.inner.lock().restarted_containers.clone()
        }
    }

    #[async_trait]
    impl HealthTransport for FakeHealthTransport {
        async fn http_check(
            &self,
            url: &str,
            _timeout: Duration,
        ) -> Result<(), HealthTransportError> {
            if self.inner.lock().http_up.get(url).copied().unwrap_or(false) {
                Ok(())
            } else {
                Err(HealthTransportError::ConnectionFailed(url.to_string()))
            }
        }

        async fn tcp_check(
            &self,
            host: &str,
            port: u16,
            _timeout: Duration,
        ) -> Result<(), HealthTransportError> {
            let key = (host.to_string(), port);
            if self.inner.lock().tcp_up.get(&key).copied().unwrap_or(false) {
                Ok(())
            } else {
                Err(HealthTransportError::ConnectionFailed(host.to_string()))
            }
        }

        async fn process_check(&self, launch_label: &str) -> Result<bool, HealthTransportError> {
            Ok(self
                .inner
                .lock()
                .process_up
                .get(launch_label)
                .copied()
                .unwrap_or(false))
        }

        async fn container_check(
            &self,
            container_names: &[String],
        ) -> Result<Vec<bool>, HealthTransportError> {
            let inner = self.inner.lock();
            Ok(container_names
                .iter()
                .map(|name| inner.containers_up.get(name).copied().unwrap_or(false))
                .collect())
        }

        async fn restart_process(&self, launch_label: &str) -> Result<(), HealthTransportError> {
            self.inner.lock().restarted_processes.push(launch_label.to_string());
            Ok(())
        }

        async fn restart_container(&self, container_name: &str) -> Result<(), HealthTransportError> {
            self.inner.lock().restarted_containers.push(container_name.to_string());
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
