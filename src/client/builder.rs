// ABOUTME: Session factory and builder for easy SMPP session creation
// ABOUTME: Collects session, keepalive and retry settings, then builds sessions or supervisors

use crate::client::error::SmppResult;
use crate::client::keepalive::KeepAliveConfig;
use crate::client::session::Session;
use crate::client::supervisor::{RetryPlan, Supervisor};
use crate::client::transport::{TcpTransport, Transport};
use crate::client::types::{BindCredentials, SessionConfig};
use std::time::Duration;

/// Builder for sessions and supervised sessions
///
/// ```rust,no_run
/// use smpp_esme::client::{BindCredentials, KeepAliveConfig, SessionBuilder, TcpTransport};
/// use std::time::Duration;
///
/// # async fn run() -> smpp_esme::client::SmppResult<()> {
/// let supervisor = SessionBuilder::new()
///     .response_timeout(Duration::from_secs(15))
///     .keepalive(KeepAliveConfig::new(Duration::from_secs(60)))
///     .supervise(
///         TcpTransport::new("smsc.example.com:2775"),
///         BindCredentials::transceiver("esme", "secret")?,
///     );
/// supervisor.start()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    keepalive: KeepAliveConfig,
    retry_plan: RetryPlan,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn response_timeout(mut self, timeout: Duration) -> Self {
        self.config.response_timeout = timeout;
        self
    }

    pub fn bind_timeout(mut self, timeout: Duration) -> Self {
        self.config.bind_timeout = timeout;
        self
    }

    /// Keepalive used by supervised sessions
    pub fn keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Reconnect delays used by supervised sessions
    pub fn retry_plan(mut self, retry_plan: RetryPlan) -> Self {
        self.retry_plan = retry_plan;
        self
    }

    /// An unconnected session on `transport`
    pub fn build<T: Transport>(self, transport: T) -> Session<T> {
        Session::new(transport, self.config)
    }

    /// A supervisor that keeps a session on `transport` bound with `credentials`.
    ///
    /// Nothing happens until [`Supervisor::start`].
    pub fn supervise<T: Transport>(
        self,
        transport: T,
        credentials: BindCredentials,
    ) -> Supervisor<T> {
        let keepalive = self.keepalive.clone();
        let retry_plan = self.retry_plan.clone();
        Supervisor::new(self.build(transport), credentials)
            .with_keepalive(keepalive)
            .with_retry_plan(retry_plan)
    }

    /// Connects and binds once, without supervision
    pub async fn connect<T: Transport>(
        self,
        transport: T,
        credentials: &BindCredentials,
    ) -> SmppResult<Session<T>> {
        let session = self.build(transport);
        session.connect().await?;
        session.bind(credentials).await?;
        Ok(session)
    }
}

/// Convenience functions for quick session creation
impl SessionBuilder {
    /// Transmitter bound over TCP with default settings
    pub async fn quick_transmitter(
        addr: impl Into<String>,
        system_id: &str,
        password: &str,
    ) -> SmppResult<Session<TcpTransport>> {
        let credentials = BindCredentials::transmitter(system_id, password)?;
        Self::new()
            .connect(TcpTransport::new(addr), &credentials)
            .await
    }

    /// Transceiver bound over TCP with default settings
    pub async fn quick_transceiver(
        addr: impl Into<String>,
        system_id: &str,
        password: &str,
    ) -> SmppResult<Session<TcpTransport>> {
        let credentials = BindCredentials::transceiver(system_id, password)?;
        Self::new()
            .connect(TcpTransport::new(addr), &credentials)
            .await
    }
}
