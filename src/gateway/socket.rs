//! Production transport: the manager's unix domain socket.
//!
//! One connection per command. The wire format is a `u32` little-endian
//! length prefix followed by the argument list, each argument
//! NUL-terminated, with a final NUL closing the list. The reply is read to
//! EOF; a leading `0x07` byte marks a rejected command and the remainder is
//! the manager's error text, anything else is the payload (JSON for
//! queries, empty for mutations).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tracing::trace;

use crate::gateway::{Gateway, GatewayError};
use crate::model::{Direction, Display, LayoutKind, ResizeAnchor, Space, Window, WindowId};

const FAILURE_BYTE: u8 = 0x07;

/// Where the manager listens when nothing is configured:
/// `/tmp/yabai_<user>.socket`.
pub fn default_socket_path() -> PathBuf {
    let user = std::env::var("USER").ok().or_else(|| {
        dirs::home_dir().and_then(|home| {
            home.file_name().map(|name| name.to_string_lossy().into_owned())
        })
    });
    PathBuf::from(format!("/tmp/yabai_{}.socket", user.as_deref().unwrap_or("unknown")))
}

#[derive(Debug, Clone)]
pub struct SocketGateway {
    path: PathBuf,
}

impl SocketGateway {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn with_default_path() -> Self {
        Self::new(default_socket_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn exec(&self, args: &[&str]) -> Result<Vec<u8>, GatewayError> {
        trace!(args = ?args, "sending command");
        let mut stream = UnixStream::connect(&self.path).await?;
        stream.write_all(&encode_message(args)).await?;
        let mut reply = Vec::new();
        stream.read_to_end(&mut reply).await?;
        match split_failure(&reply) {
            Some(message) => Err(GatewayError::Command {
                command: args.join(" "),
                message,
            }),
            None => Ok(reply),
        }
    }

    async fn command(&self, args: &[&str]) -> Result<(), GatewayError> {
        self.exec(args).await.map(|_| ())
    }

    async fn query<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, GatewayError> {
        let reply = self.exec(args).await?;
        Ok(serde_json::from_slice(&reply)?)
    }
}

fn encode_message(args: &[&str]) -> Vec<u8> {
    let len: usize = args.iter().map(|arg| arg.len() + 1).sum::<usize>() + 1;
    let mut buf = Vec::with_capacity(4 + len);
    buf.extend_from_slice(&(len as u32).to_le_bytes());
    for arg in args {
        buf.extend_from_slice(arg.as_bytes());
        buf.push(0);
    }
    buf.push(0);
    buf
}

fn split_failure(reply: &[u8]) -> Option<String> {
    match reply.first() {
        Some(&FAILURE_BYTE) => {
            Some(String::from_utf8_lossy(&reply[1..]).trim().to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl Gateway for SocketGateway {
    async fn list_windows(&self) -> Result<Vec<Window>, GatewayError> {
        self.query(&["query", "--windows"]).await
    }

    async fn list_windows_on_space(&self, space: u32) -> Result<Vec<Window>, GatewayError> {
        self.query(&["query", "--windows", "--space", &space.to_string()]).await
    }

    async fn list_spaces(&self) -> Result<Vec<Space>, GatewayError> {
        self.query(&["query", "--spaces"]).await
    }

    async fn list_displays(&self) -> Result<Vec<Display>, GatewayError> {
        self.query(&["query", "--displays"]).await
    }

    async fn query_window(&self, id: WindowId) -> Result<Window, GatewayError> {
        self.query(&["query", "--windows", "--window", &id.to_string()]).await
    }

    async fn query_space(&self, index: u32) -> Result<Space, GatewayError> {
        self.query(&["query", "--spaces", "--space", &index.to_string()]).await
    }

    async fn set_layout(&self, space: u32, layout: LayoutKind) -> Result<(), GatewayError> {
        self.command(&["space", &space.to_string(), "--layout", &layout.to_string()]).await
    }

    async fn balance_space(&self, space: u32) -> Result<(), GatewayError> {
        self.command(&["space", &space.to_string(), "--balance"]).await
    }

    async fn move_window_to_space(&self, id: WindowId, space: u32) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--space", &space.to_string()]).await
    }

    async fn move_window_to_display(
        &self,
        id: WindowId,
        display: u32,
    ) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--display", &display.to_string()]).await
    }

    async fn swap_windows(&self, a: WindowId, b: WindowId) -> Result<(), GatewayError> {
        self.command(&["window", &a.to_string(), "--swap", &b.to_string()]).await
    }

    async fn toggle_split(&self, id: WindowId) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--toggle", "split"]).await
    }

    async fn set_insert(&self, id: WindowId, direction: Direction) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--insert", &direction.to_string()]).await
    }

    async fn warp_window(&self, id: WindowId, onto: WindowId) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--warp", &onto.to_string()]).await
    }

    async fn resize_window(
        &self,
        id: WindowId,
        anchor: ResizeAnchor,
        dx: f64,
        dy: f64,
    ) -> Result<(), GatewayError> {
        let spec = format!("{anchor}:{dx}:{dy}");
        self.command(&["window", &id.to_string(), "--resize", &spec]).await
    }

    async fn focus_window(&self, id: WindowId) -> Result<(), GatewayError> {
        self.command(&["window", &id.to_string(), "--focus"]).await
    }
}
