//! Process-local cache of the manager's window and space records.
//!
//! The mirror is the only component that caches live state. Everything else
//! reads through it and must refresh before acting on any attribute a prior
//! command could have changed: a blanket refresh pulls the full live set,
//! the targeted variants re-query exactly the entity a mutation touched.

use tracing::trace;

use crate::common::collections::{HashMap, HashSet};
use crate::gateway::{Gateway, GatewayError};
use crate::model::{Space, SpaceId, Window, WindowId};

/// Cache with upsert-by-identifier and eviction of entries the live set no
/// longer contains. One instance per reconciliation pass; never shared.
pub struct StateMirror<'a> {
    gateway: &'a dyn Gateway,
    windows: HashMap<WindowId, Window>,
    spaces: HashMap<SpaceId, Space>,
}

impl<'a> StateMirror<'a> {
    pub fn new(gateway: &'a dyn Gateway) -> Self {
        Self {
            gateway,
            windows: HashMap::default(),
            spaces: HashMap::default(),
        }
    }

    /// Pull the full live window set: upsert every record, evict the ones
    /// that disappeared. Returns the live set in query order.
    pub async fn refresh_all_windows(&mut self) -> Result<Vec<Window>, GatewayError> {
        let live = self.gateway.list_windows().await?;
        let live_ids: HashSet<WindowId> = live.iter().map(|w| w.id).collect();
        self.windows.retain(|id, _| live_ids.contains(id));
        for window in &live {
            self.windows.insert(window.id, window.clone());
        }
        trace!(count = live.len(), "refreshed all windows");
        Ok(live)
    }

    /// Pull the full live space set; same upsert/evict contract. Returns
    /// spaces in live-list order, which declared indices resolve against.
    pub async fn refresh_all_spaces(&mut self) -> Result<Vec<Space>, GatewayError> {
        let live = self.gateway.list_spaces().await?;
        let live_ids: HashSet<SpaceId> = live.iter().map(|s| s.id).collect();
        self.spaces.retain(|id, _| live_ids.contains(id));
        for space in &live {
            self.spaces.insert(space.id, space.clone());
        }
        trace!(count = live.len(), "refreshed all spaces");
        Ok(live)
    }

    /// Re-query one window after a command that may have changed its frame,
    /// split orientation or space membership.
    pub async fn refresh_window(&mut self, id: WindowId) -> Result<Window, GatewayError> {
        let window = self.gateway.query_window(id).await?;
        self.windows.insert(window.id, window.clone());
        Ok(window)
    }

    /// Re-query one space after a command that may have changed its member
    /// list or designated first/last window.
    pub async fn refresh_space(&mut self, index: u32) -> Result<Space, GatewayError> {
        let space = self.gateway.query_space(index).await?;
        self.spaces.insert(space.id, space.clone());
        Ok(space)
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(&id)
    }

    pub fn space(&self, id: SpaceId) -> Option<&Space> {
        self.spaces.get(&id)
    }
}
