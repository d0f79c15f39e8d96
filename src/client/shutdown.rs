// ABOUTME: Watch-channel shutdown signal shared by the reader, keepalive and supervisor tasks
// ABOUTME: Triggering it wakes every waiter at once; dropping the trigger counts as shutdown

use tokio::sync::watch;

/// Owner side of a shutdown signal
#[derive(Debug)]
pub struct Shutdown {
    sender: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self { sender }
    }

    /// A new listener for this signal
    pub fn signal(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener side, cheap to clone into each task
#[derive(Clone, Debug)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been triggered or the owner is gone
    pub async fn wait(&mut self) {
        if *self.receiver.borrow() {
            return;
        }
        let _ = self.receiver.wait_for(|stop| *stop).await;
    }

    /// Resolves once this signal or `other` fires
    pub async fn wait_either(&mut self, other: &mut ShutdownSignal) {
        tokio::select! {
            _ = self.wait() => {}
            _ = other.wait() => {}
        }
    }
}
