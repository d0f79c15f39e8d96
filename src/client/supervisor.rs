// ABOUTME: Keeps a session connected and bound, reconnecting on link loss with a retry plan
// ABOUTME: Owns the background reconnect loop and the keepalive task

use crate::client::error::{SmppError, SmppResult};
use crate::client::events::{SessionEvent, SessionState};
use crate::client::keepalive::{self, KeepAliveConfig};
use crate::client::session::Session;
use crate::client::shutdown::{Shutdown, ShutdownSignal};
use crate::client::transport::Transport;
use crate::client::types::BindCredentials;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

// Bounds the farewell unbind on stop
const STOP_UNBIND_TIMEOUT: Duration = Duration::from_secs(5);

/// Delays between reconnect attempts.
///
/// Each call to [`RetryPlan::next_delay`] returns the next entry; once the
/// list is exhausted the last entry repeats. A successful bind resets it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPlan {
    delays: Vec<Duration>,
    cursor: usize,
}

impl RetryPlan {
    /// An empty list falls back to the default plan
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return Self::default();
        }
        Self { delays, cursor: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delays[self.cursor.min(self.delays.len() - 1)];
        if self.cursor < self.delays.len() - 1 {
            self.cursor += 1;
        }
        delay
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for RetryPlan {
    fn default() -> Self {
        Self {
            delays: [5, 15, 30, 60].map(Duration::from_secs).to_vec(),
            cursor: 0,
        }
    }
}

struct Running {
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

/// Runs a session unattended: connect, bind, watch for loss, reconnect.
///
/// The background tasks end on [`Supervisor::stop`] or once the session
/// itself is closed.
///
/// Failures in the background never surface as errors; subscribe to the
/// session's events to observe `ReconnectFailed`, `Reconnected` and
/// `KeepAliveFailed`.
pub struct Supervisor<T: Transport> {
    session: Session<T>,
    credentials: BindCredentials,
    retry_plan: RetryPlan,
    keepalive: KeepAliveConfig,
    running: Mutex<Option<Running>>,
}

impl<T: Transport> Supervisor<T> {
    pub fn new(session: Session<T>, credentials: BindCredentials) -> Self {
        Self {
            session,
            credentials,
            retry_plan: RetryPlan::default(),
            keepalive: KeepAliveConfig::default(),
            running: Mutex::new(None),
        }
    }

    pub fn with_retry_plan(mut self, retry_plan: RetryPlan) -> Self {
        self.retry_plan = retry_plan;
        self
    }

    pub fn with_keepalive(mut self, keepalive: KeepAliveConfig) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn session(&self) -> &Session<T> {
        &self.session
    }

    /// True while started and the reconnect loop has not given up
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|running| running.tasks.iter().any(|task| !task.is_finished()))
    }

    /// Spawns the reconnect loop and, when enabled, the keepalive task
    pub fn start(&self) -> SmppResult<()> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            return Err(SmppError::AlreadyStarted);
        }
        if self.session.is_closed() {
            return Err(SmppError::Cancelled);
        }

        let shutdown = Shutdown::new();
        let mut tasks = vec![tokio::spawn(supervise(
            self.session.clone(),
            self.credentials.clone(),
            self.retry_plan.clone(),
            shutdown.signal(),
        ))];
        if self.keepalive.enabled {
            tasks.push(tokio::spawn(keepalive::run(
                self.session.clone(),
                self.keepalive.clone(),
                shutdown.signal(),
            )));
        }

        info!("Supervisor started for {}", self.credentials.system_id);
        *running = Some(Running { shutdown, tasks });
        Ok(())
    }

    /// Cancels the background tasks, unbinds if bound and disconnects
    pub async fn stop(&self) -> SmppResult<()> {
        let running = self
            .running
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(running) = running else {
            return Ok(());
        };

        running.shutdown.trigger();
        for task in running.tasks {
            if let Err(e) = task.await {
                debug!("Supervisor task ended abnormally: {}", e);
            }
        }

        if self.session.state() == SessionState::Bound {
            match tokio::time::timeout(STOP_UNBIND_TIMEOUT, self.session.unbind()).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => warn!("Unbind on stop failed: {}", e),
                Err(_) => warn!("Unbind on stop timed out"),
            }
        }
        self.session.disconnect().await?;
        info!("Supervisor stopped");
        Ok(())
    }
}

/// One connect + bind attempt from whatever state the session is in
async fn establish<T: Transport>(
    session: &Session<T>,
    credentials: &BindCredentials,
) -> SmppResult<()> {
    if session.state() != SessionState::Inactive {
        session.disconnect().await?;
    }
    session.connect().await?;
    session.bind(credentials).await?;
    Ok(())
}

async fn supervise<T: Transport>(
    session: Session<T>,
    credentials: BindCredentials,
    mut plan: RetryPlan,
    mut shutdown: ShutdownSignal,
) {
    let mut closed = session.shutdown_signal();
    let mut attempt: u32 = 0;
    let mut delay: Option<Duration> = None;
    let mut recovering = false;

    loop {
        if let Some(delay) = delay.take() {
            debug!("Reconnecting in {:?}", delay);
            tokio::select! {
                _ = shutdown.wait_either(&mut closed) => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        attempt += 1;
        let outcome = tokio::select! {
            _ = shutdown.wait_either(&mut closed) => return,
            outcome = establish(&session, &credentials) => outcome,
        };

        match outcome {
            Err(SmppError::Cancelled) => {
                info!("Session closed, supervisor exiting");
                return;
            }
            Ok(()) => {
                if recovering {
                    info!("Session restored after {} attempt(s)", attempt);
                    session.emit(SessionEvent::Reconnected { attempts: attempt });
                }
                recovering = false;
                attempt = 0;
                plan.reset();
            }
            Err(e) => {
                let next_delay = plan.next_delay();
                warn!(
                    "Connect attempt {} failed: {}; retrying in {:?}",
                    attempt, e, next_delay
                );
                session.emit(SessionEvent::ReconnectFailed {
                    attempt,
                    next_delay,
                    error: e.to_string(),
                });
                recovering = true;
                delay = Some(next_delay);
                continue;
            }
        }

        tokio::select! {
            _ = shutdown.wait_either(&mut closed) => return,
            _ = session.wait_for_state(SessionState::Inactive) => {}
        }
        warn!("Link to SMSC lost");
        recovering = true;
        delay = Some(plan.next_delay());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(values: &[u64]) -> Vec<Duration> {
        values.iter().copied().map(Duration::from_secs).collect()
    }

    #[test]
    fn plan_walks_then_clamps() {
        let mut plan = RetryPlan::new(secs(&[5, 15, 30, 60]));
        let observed: Vec<Duration> = (0..6).map(|_| plan.next_delay()).collect();
        assert_eq!(observed, secs(&[5, 15, 30, 60, 60, 60]));
    }

    #[test]
    fn reset_starts_over() {
        let mut plan = RetryPlan::default();
        plan.next_delay();
        plan.next_delay();
        plan.reset();
        assert_eq!(plan.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn empty_plan_uses_default() {
        assert_eq!(RetryPlan::new(Vec::new()), RetryPlan::default());
    }
}
