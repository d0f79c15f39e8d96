// ABOUTME: SMPP keep-alive implementation for maintaining long-running bound sessions
// ABOUTME: Sends enquire_link after an idle interval and tears the link down after repeated failures

use crate::client::error::SmppError;
use crate::client::events::{SessionEvent, SessionState};
use crate::client::session::Session;
use crate::client::shutdown::ShutdownSignal;
use crate::client::transport::Transport;
use crate::pdu::{Body, Pdu};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Configuration for SMPP keep-alive functionality
///
/// Controls the periodic enquire_link PDUs sent to verify session health.
/// A ping goes out only after `interval` has passed without any outbound
/// traffic, so a busy session is never pinged.
///
/// # Example
///
/// ```rust
/// use smpp_esme::client::KeepAliveConfig;
/// use std::time::Duration;
///
/// // Default configuration (30s interval, 10s timeout, 3 max failures)
/// let config = KeepAliveConfig::default();
///
/// // Custom configuration
/// let config = KeepAliveConfig::new(Duration::from_secs(60))
///     .with_timeout(Duration::from_secs(15))
///     .with_max_failures(5);
///
/// // Disabled keep-alive
/// let config = KeepAliveConfig::disabled();
/// ```
#[derive(Debug, Clone)]
pub struct KeepAliveConfig {
    /// Idle time before an enquire_link is sent (default: 30 seconds)
    pub interval: Duration,

    /// Timeout for enquire_link responses (default: 10 seconds)
    ///
    /// Should be significantly less than the interval.
    pub timeout: Duration,

    /// Consecutive failures before the link is considered dead (default: 3)
    pub max_failures: u32,

    /// Whether keep-alive is enabled (default: true)
    pub enabled: bool,
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(10),
            max_failures: 3,
            enabled: true,
        }
    }
}

impl KeepAliveConfig {
    /// Create a new keep-alive configuration with custom interval
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Default::default()
        }
    }

    /// Set the timeout for enquire_link responses
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum consecutive failures before the link is torn down
    pub fn with_max_failures(mut self, max_failures: u32) -> Self {
        self.max_failures = max_failures.max(1);
        self
    }

    /// Create a disabled keep-alive configuration
    ///
    /// Manual `enquire_link` calls still work.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Status information about keep-alive state
#[derive(Debug, Clone)]
pub struct KeepAliveStatus {
    /// Whether keep-alive is currently enabled
    pub running: bool,

    /// Count of enquire_link operations that have failed in a row
    pub consecutive_failures: u32,

    /// Total enquire_link PDUs sent
    pub total_pings: u32,

    /// Total successful responses received
    pub total_pongs: u32,

    /// When the last enquire_link went out
    pub last_ping: Option<Instant>,
}

/// Decides when to ping and counts consecutive failures
///
/// The manager is pure bookkeeping; [`run`] drives it against a live
/// session. Idle time is measured from the session's last outbound frame.
///
/// # Example
///
/// ```rust
/// use smpp_esme::client::{KeepAliveConfig, KeepAliveManager};
/// use std::time::Duration;
///
/// let mut manager = KeepAliveManager::new(
///     KeepAliveConfig::default().with_max_failures(3)
/// );
///
/// manager.on_ping_failure();
/// manager.on_ping_failure();
/// manager.on_ping_failure();
///
/// assert!(manager.is_connection_failed());
/// ```
#[derive(Debug)]
pub struct KeepAliveManager {
    config: KeepAliveConfig,

    last_ping: Option<Instant>,

    consecutive_failures: u32,

    total_pings: u32,

    total_pongs: u32,

    enabled: bool,
}

impl KeepAliveManager {
    /// Create a new keep-alive manager with the specified configuration
    pub fn new(config: KeepAliveConfig) -> Self {
        Self {
            enabled: config.enabled,
            config,
            last_ping: None,
            consecutive_failures: 0,
            total_pings: 0,
            total_pongs: 0,
        }
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    /// Check if an enquire_link should be sent now
    ///
    /// True when enabled, under the failure limit, and nothing has been
    /// written since `last_outbound` for at least the configured interval.
    pub fn should_ping(&self, last_outbound: Instant) -> bool {
        if !self.enabled {
            return false;
        }

        if self.consecutive_failures >= self.config.max_failures {
            debug!("Max failures reached, not sending more pings");
            return false;
        }

        last_outbound.elapsed() >= self.config.interval
    }

    /// Record that an enquire_link was sent
    pub fn on_ping_sent(&mut self) {
        self.last_ping = Some(Instant::now());
        self.total_pings += 1;
        debug!("Enquire_link sent (total: {})", self.total_pings);
    }

    /// Record a successful enquire_link response
    pub fn on_ping_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_pongs += 1;
        debug!("Enquire_link successful (total: {})", self.total_pongs);
    }

    /// Record a failed enquire_link: timeout, error response or send failure
    pub fn on_ping_failure(&mut self) {
        self.consecutive_failures += 1;
        warn!(
            "Enquire_link failed (consecutive failures: {})",
            self.consecutive_failures
        );
    }

    /// Reset the failure counter
    pub fn reset_failures(&mut self) {
        if self.consecutive_failures > 0 {
            debug!("Resetting {} consecutive failures", self.consecutive_failures);
            self.consecutive_failures = 0;
        }
    }

    /// Check if the connection should be considered failed
    pub fn is_connection_failed(&self) -> bool {
        self.consecutive_failures >= self.config.max_failures
    }

    pub fn status(&self) -> KeepAliveStatus {
        KeepAliveStatus {
            running: self.enabled,
            consecutive_failures: self.consecutive_failures,
            total_pings: self.total_pings,
            total_pongs: self.total_pongs,
            last_ping: self.last_ping,
        }
    }

    pub fn is_running(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }
}

/// Keepalive loop for `session`, until `shutdown` fires or the session is closed.
///
/// Pings only while the session is `Bound`. Reaching `max_failures`
/// disconnects the session so a supervisor can reconnect it.
pub async fn run<T: Transport>(
    session: Session<T>,
    config: KeepAliveConfig,
    mut shutdown: ShutdownSignal,
) {
    let mut manager = KeepAliveManager::new(config);
    if !manager.is_running() {
        return;
    }
    let mut closed = session.shutdown_signal();

    loop {
        let wake_at = session.last_outbound() + manager.interval();
        tokio::select! {
            _ = shutdown.wait_either(&mut closed) => return,
            _ = tokio::time::sleep_until(wake_at) => {}
        }

        if session.state() != SessionState::Bound {
            tokio::select! {
                _ = shutdown.wait_either(&mut closed) => return,
                _ = session.wait_for_state(SessionState::Bound) => manager.reset_failures(),
            }
            continue;
        }
        if !manager.should_ping(session.last_outbound()) {
            continue;
        }

        manager.on_ping_sent();
        let outcome = tokio::select! {
            _ = shutdown.wait_either(&mut closed) => return,
            outcome = session.request(Pdu::new(Body::EnquireLink), manager.timeout()) => outcome,
        };
        match outcome {
            Ok(_) => manager.on_ping_success(),
            // The session left Bound between the check and the send
            Err(SmppError::InvalidState { .. }) => continue,
            Err(e) => {
                debug!("Keepalive enquire_link failed: {}", e);
                manager.on_ping_failure();
            }
        }

        if manager.is_connection_failed() {
            let consecutive_failures = manager.status().consecutive_failures;
            error!(
                "No enquire_link answer after {} attempts, dropping the link",
                consecutive_failures
            );
            session.emit(SessionEvent::KeepAliveFailed {
                consecutive_failures,
            });
            let _ = session.disconnect().await;
            manager.reset_failures();
        }
    }
}
