//! Cooperative cancellation shared by every long-running task in the node.
//!
//! A [`ServiceContext`] is cloned into each service at startup. Cancelling it (from a signal
//! handler, or from a service that decided the process is done) is observed by every clone.
//! Services are expected to check the context at their own suspension points and let any
//! in-flight unit of work complete naturally.

use std::future::Future;
use tokio_util::sync::CancellationToken;

#[derive(Clone, Debug, Default)]
pub struct ServiceContext {
    token: CancellationToken,
}

impl ServiceContext {
    pub fn new() -> Self {
        Self { token: CancellationToken::new() }
    }

    /// Stop every service holding a clone of this context.
    pub fn cancel_global(&self) {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes when the context has been cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }

    /// Runs the given future to completion, or returns `None` if the context is cancelled
    /// first. The future is dropped on cancellation, so it must be cancellation-safe.
    pub async fn run_until_cancelled<F: Future>(&self, f: F) -> Option<F::Output> {
        tokio::select! {
            _ = self.token.cancelled() => None,
            res = f => Some(res),
        }
    }

    /// A child context which is cancelled when its parent is, but whose own cancellation does
    /// not propagate upwards.
    pub fn child(&self) -> Self {
        Self { token: self.token.child_token() }
    }

    /// Cancels this context on the first `SIGINT` or `SIGTERM`. Further signals are logged
    /// and ignored so that in-flight work can finish. The listener stays alive for the rest
    /// of the process.
    pub fn cancel_on_shutdown_signals(&self) {
        let ctx = self.clone();
        tokio::spawn(async move {
            loop {
                shutdown_signal().await;
                if ctx.is_cancelled() {
                    tracing::info!("Shutdown already in progress, ignoring signal");
                } else {
                    tracing::info!("🛑 Shutdown signal received, finishing in-flight work...");
                    ctx.cancel_global();
                }
            }
        });
    }
}

async fn shutdown_signal() {
    let sigint = tokio::signal::ctrl_c();
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => signal.recv().await,
            Err(_) => std::future::pending().await, // SIGTERM not supported
        }
    };

    tokio::select! {
        res = sigint => {
            let _ = res;
        }
        _ = sigterm => {}
    }
}
