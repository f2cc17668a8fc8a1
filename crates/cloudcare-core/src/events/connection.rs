//! Connection liveness as seen by a subscriber loop.

use std::future::Future;

use tokio_util::sync::CancellationToken;

/// Transport capability that tells a subscriber whether its client is still there.
///
/// The subscriber loop polls `is_connected` before every wait and races each
/// wait against `disconnected`, so a disconnect ends the loop within one
/// iteration.
pub trait ConnectionLiveness: Send + Sync + 'static {
    fn is_connected(&self) -> bool;

    /// Resolves once the client is gone. Must be cancel-safe.
    fn disconnected(&self) -> impl Future<Output = ()> + Send + '_;
}

/// Liveness handle for one streaming client.
///
/// Created as a child of the server's shutdown token, so shutting the server
/// down disconnects every open stream as well.
#[derive(Debug, Clone, Default)]
pub struct ClientConnection {
    token: CancellationToken,
}

impl ClientConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_of(parent: &CancellationToken) -> Self {
        Self {
            token: parent.child_token(),
        }
    }

    /// Mark the client as gone.
    pub fn disconnect(&self) {
        self.token.cancel();
    }
}

impl ConnectionLiveness for ClientConnection {
    fn is_connected(&self) -> bool {
        !self.token.is_cancelled()
    }

    fn disconnected(&self) -> impl Future<Output = ()> + Send + '_ {
        self.token.cancelled()
    }
}
