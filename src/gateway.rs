//! Boundary with the window manager. Everything the engine does to the
//! outside world goes through the [`Gateway`] trait: queries return decoded
//! records, mutations either apply or fail with a [`GatewayError`].

pub mod socket;

#[cfg(test)]
pub(crate) mod testing;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::model::{Direction, Display, LayoutKind, ResizeAnchor, Space, Window, WindowId};

pub use socket::SocketGateway;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The manager accepted the connection but rejected the command.
    #[error("window manager rejected `{command}`: {message}")]
    Command { command: String, message: String },
    #[error("gateway transport failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not decode query payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Command and query surface of the external window manager.
///
/// Mutations are issued strictly sequentially within a reconciliation pass;
/// each later command may depend on the observable effect of the previous
/// one, so implementations must not reorder or batch.
#[async_trait]
pub trait Gateway {
    async fn list_windows(&self) -> Result<Vec<Window>, GatewayError>;
    async fn list_windows_on_space(&self, space: u32) -> Result<Vec<Window>, GatewayError>;
    async fn list_spaces(&self) -> Result<Vec<Space>, GatewayError>;
    async fn list_displays(&self) -> Result<Vec<Display>, GatewayError>;
    async fn query_window(&self, id: WindowId) -> Result<Window, GatewayError>;
    async fn query_space(&self, index: u32) -> Result<Space, GatewayError>;

    async fn set_layout(&self, space: u32, layout: LayoutKind) -> Result<(), GatewayError>;
    async fn balance_space(&self, space: u32) -> Result<(), GatewayError>;
    async fn move_window_to_space(&self, id: WindowId, space: u32) -> Result<(), GatewayError>;
    async fn move_window_to_display(&self, id: WindowId, display: u32)
    -> Result<(), GatewayError>;
    async fn swap_windows(&self, a: WindowId, b: WindowId) -> Result<(), GatewayError>;
    async fn toggle_split(&self, id: WindowId) -> Result<(), GatewayError>;
    async fn set_insert(&self, id: WindowId, direction: Direction) -> Result<(), GatewayError>;
    /// Warp `id` next to `onto`, consuming the insertion hint set on `onto`.
    async fn warp_window(&self, id: WindowId, onto: WindowId) -> Result<(), GatewayError>;
    /// Resize by a signed delta anchored on one edge. With a `Left` anchor a
    /// negative horizontal delta grows the window.
    async fn resize_window(
        &self,
        id: WindowId,
        anchor: ResizeAnchor,
        dx: f64,
        dy: f64,
    ) -> Result<(), GatewayError>;
    async fn focus_window(&self, id: WindowId) -> Result<(), GatewayError>;
}

/// Per-command result of a best-effort mutation. Convergence treats a failed
/// command as a no-op and keeps going; [`CommandOutcome::note`] makes that
/// policy explicit at every call site instead of swallowing errors silently.
#[derive(Debug)]
#[must_use = "inspect the outcome or discard it deliberately with `let _ =`"]
pub enum CommandOutcome {
    Applied,
    Failed(GatewayError),
}

impl CommandOutcome {
    /// Record the result of one mutation, logging a failure with the
    /// attempted operation so it can be diagnosed later.
    pub fn note(command: impl fmt::Display, result: Result<(), GatewayError>) -> Self {
        match result {
            Ok(()) => Self::Applied,
            Err(err) => {
                warn!(command = %command, error = %err, "command failed, continuing");
                Self::Failed(err)
            }
        }
    }

    pub fn applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}
