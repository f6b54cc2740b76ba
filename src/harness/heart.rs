//! Structures to keep the process alive until some event occurs

use futures::{
    channel::mpsc::{channel, Receiver, Sender},
    future, SinkExt, StreamExt,
};
use std::fmt::{self, Formatter};
use tokio::select;
use tokio::signal::{
    ctrl_c,
    unix::{signal, SignalKind},
};
use tracing::{debug, error, warn};

/// Reason why the heart stopped beating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeathReason {
    /// Internal kill signal has been sent
    Killed(String),
    /// SIGINT, SIGTERM or other process-external cause
    Terminated,
}

impl fmt::Display for DeathReason {
    fn fmt(&self, w: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DeathReason::Killed(reason) => write!(w, "Killed ({})", reason),
            DeathReason::Terminated => write!(w, "Terminated due to external signal"),
        }
    }
}

/// Lifecycle management struct that can be used to keep the application alive
pub struct Heart {
    /// Receiver for kill requests sent by heart stones
    rx: Receiver<String>,
}

impl Heart {
    /// Creates a new heart and linked stone
    pub fn new() -> (Self, HeartStone) {
        let (tx, rx) = channel(2);
        (Self { rx }, HeartStone { remote: tx })
    }

    /// Creates a new heart which only dies from external signals
    pub fn without_heart_stone() -> Self {
        Heart::new().0
    }

    /// Future that waits until the heart dies for the returned reason
    ///
    /// Dropping all linked stones does not kill the heart.
    pub async fn death(&mut self) -> DeathReason {
        debug!("Heart starts beating");

        let rx = &mut self.rx;
        let killed = async move {
            match rx.next().await {
                Some(reason) => DeathReason::Killed(reason),
                None => future::pending().await,
            }
        };

        select! {
            reason = killed => reason,
            _ = Heart::termination_signal() => DeathReason::Terminated,
        }
    }

    async fn termination_signal() {
        let sigterm = async {
            match signal(SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(error) => {
                    warn!(?error, "Unable to listen for SIGTERM");
                    future::pending::<()>().await;
                }
            }
        };

        select! {
            _ = sigterm => {},
            _ = ctrl_c() => {},
        };
    }
}

/// Remote controller for the heart
#[derive(Clone)]
pub struct HeartStone {
    remote: Sender<String>,
}

impl HeartStone {
    /// Kill the associated heart
    pub async fn kill(&mut self, reason: String) {
        if let Err(e) = self.remote.send(reason).await {
            error!("Failed to interact with Heart: {}", e);
        }
    }
}
