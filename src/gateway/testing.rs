//! Test support: an in-memory gateway over a mutable window/space world.
//! Every mutation is recorded as a [`Command`] and its observable effect is
//! simulated, so convergence tests can assert on both the command sequence
//! and the resulting arrangement.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::gateway::{Gateway, GatewayError};
use crate::model::{
    Direction, Display, Frame, LayoutKind, ResizeAnchor, Space, SplitKind, Window, WindowId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetLayout(u32, LayoutKind),
    Balance(u32),
    MoveToSpace(WindowId, u32),
    MoveToDisplay(WindowId, u32),
    Swap(WindowId, WindowId),
    ToggleSplit(WindowId),
    SetInsert(WindowId, Direction),
    Warp(WindowId, WindowId),
    Resize(WindowId, ResizeAnchor, f64, f64),
    Focus(WindowId),
}

impl Command {
    /// Commands that change ordering, orientation or geometry. Balance and
    /// layout-mode changes are deliberately excluded: idempotence is judged
    /// on the positional commands only.
    pub fn is_positional(&self) -> bool {
        matches!(
            self,
            Self::MoveToSpace(..)
                | Self::MoveToDisplay(..)
                | Self::Swap(..)
                | Self::ToggleSplit(..)
                | Self::SetInsert(..)
                | Self::Warp(..)
                | Self::Resize(..)
        )
    }
}

#[derive(Default)]
struct World {
    windows: Vec<Window>,
    spaces: Vec<Space>,
    commands: Vec<Command>,
    fail_commands: bool,
}

impl World {
    fn window(&self, id: WindowId) -> Result<Window, GatewayError> {
        self.windows.iter().find(|w| w.id == id).cloned().ok_or_else(|| {
            GatewayError::Command {
                command: format!("query --windows --window {id}"),
                message: "could not locate window with the specified id.".into(),
            }
        })
    }

    fn space(&self, index: u32) -> Result<Space, GatewayError> {
        self.spaces.iter().find(|s| s.index == index).cloned().ok_or_else(|| {
            GatewayError::Command {
                command: format!("query --spaces --space {index}"),
                message: "could not locate space with the specified index.".into(),
            }
        })
    }

    /// Recompute the membership-derived fields of one space from window
    /// geometry: first/last window follow the leftmost/rightmost member.
    fn reindex_space(&mut self, index: u32) {
        let mut members: Vec<(WindowId, f64)> = self
            .windows
            .iter()
            .filter(|w| w.space == index)
            .map(|w| (w.id, w.frame.x))
            .collect();
        members.sort_by(|a, b| a.1.total_cmp(&b.1));
        if let Some(space) = self.spaces.iter_mut().find(|s| s.index == index) {
            space.windows = members.iter().map(|(id, _)| *id).collect();
            space.first_window = members.first().map(|(id, _)| *id).unwrap_or(0);
            space.last_window = members.last().map(|(id, _)| *id).unwrap_or(0);
        }
    }

    fn record(&mut self, command: Command) -> Result<(), GatewayError> {
        self.commands.push(command.clone());
        if self.fail_commands {
            return Err(GatewayError::Command {
                command: format!("{command:?}"),
                message: "injected failure".into(),
            });
        }
        self.apply(command);
        Ok(())
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SetLayout(index, layout) => {
                if let Some(space) = self.spaces.iter_mut().find(|s| s.index == index) {
                    space.layout = layout;
                }
            }
            Command::Balance(index) => {
                let mut members: Vec<WindowId> = self
                    .windows
                    .iter()
                    .filter(|w| w.space == index)
                    .map(|w| w.id)
                    .collect();
                members.sort_by(|a, b| {
                    let ax = self.windows.iter().find(|w| w.id == *a).unwrap().frame.x;
                    let bx = self.windows.iter().find(|w| w.id == *b).unwrap().frame.x;
                    ax.total_cmp(&bx)
                });
                if members.is_empty() {
                    return;
                }
                let total: f64 = self
                    .windows
                    .iter()
                    .filter(|w| w.space == index)
                    .map(|w| w.frame.w)
                    .sum();
                let origin: f64 = self
                    .windows
                    .iter()
                    .filter(|w| w.space == index)
                    .map(|w| w.frame.x)
                    .fold(f64::INFINITY, f64::min);
                let each = total / members.len() as f64;
                let mut x = origin;
                for id in members {
                    let window = self.windows.iter_mut().find(|w| w.id == id).unwrap();
                    window.frame.x = x;
                    window.frame.w = each;
                    x += each;
                }
            }
            Command::MoveToSpace(id, index) => {
                let Some(window) = self.windows.iter_mut().find(|w| w.id == id) else {
                    return;
                };
                let from = window.space;
                window.space = index;
                self.reindex_space(from);
                self.reindex_space(index);
            }
            Command::MoveToDisplay(id, display) => {
                if let Some(window) = self.windows.iter_mut().find(|w| w.id == id) {
                    window.display = display;
                }
            }
            Command::Swap(a, b) => {
                let Some(pa) = self.windows.iter().position(|w| w.id == a) else {
                    return;
                };
                let Some(pb) = self.windows.iter().position(|w| w.id == b) else {
                    return;
                };
                let frame_a = self.windows[pa].frame;
                let space_a = self.windows[pa].space;
                let space_b = self.windows[pb].space;
                self.windows[pa].frame = self.windows[pb].frame;
                self.windows[pa].space = space_b;
                self.windows[pb].frame = frame_a;
                self.windows[pb].space = space_a;
                self.reindex_space(space_a);
                if space_b != space_a {
                    self.reindex_space(space_b);
                }
            }
            Command::ToggleSplit(id) => {
                if let Some(window) = self.windows.iter_mut().find(|w| w.id == id) {
                    window.split_type = match window.split_type {
                        SplitKind::Horizontal => SplitKind::Vertical,
                        SplitKind::Vertical => SplitKind::Horizontal,
                        SplitKind::None => SplitKind::Vertical,
                    };
                }
            }
            Command::SetInsert(..) => {}
            Command::Warp(id, onto) => {
                let Some(target) = self.windows.iter().find(|w| w.id == onto).cloned() else {
                    return;
                };
                let Some(window) = self.windows.iter_mut().find(|w| w.id == id) else {
                    return;
                };
                let from = window.space;
                // Land immediately east of the target; close enough for
                // position-sorting purposes.
                window.frame.x = target.frame.x + 1.0;
                window.frame.y = target.frame.y;
                window.space = target.space;
                self.reindex_space(from);
                if from != target.space {
                    self.reindex_space(target.space);
                }
            }
            Command::Resize(id, anchor, dx, dy) => {
                if let Some(window) = self.windows.iter_mut().find(|w| w.id == id) {
                    match anchor {
                        ResizeAnchor::Left => {
                            window.frame.x += dx;
                            window.frame.w -= dx;
                        }
                        ResizeAnchor::Right => window.frame.w += dx,
                        ResizeAnchor::Top => {
                            window.frame.y += dy;
                            window.frame.h -= dy;
                        }
                        ResizeAnchor::Bottom => window.frame.h += dy,
                    }
                }
            }
            Command::Focus(id) => {
                for window in &mut self.windows {
                    window.has_focus = window.id == id;
                }
            }
        }
    }
}

/// Gateway double backed by a shared mutable world.
#[derive(Clone, Default)]
pub struct ScriptedGateway(Arc<Mutex<World>>);

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// A gateway whose world holds `count` empty bsp spaces, indexed from 1.
    pub fn with_spaces(count: u32) -> Self {
        let gateway = Self::new();
        {
            let mut world = gateway.0.try_lock().unwrap();
            world.spaces = (1..=count)
                .map(|index| Space {
                    id: u64::from(index),
                    index,
                    label: String::new(),
                    layout: LayoutKind::Bsp,
                    display: 1,
                    windows: Vec::new(),
                    first_window: 0,
                    last_window: 0,
                    has_focus: index == 1,
                    is_visible: index == 1,
                })
                .collect();
        }
        gateway
    }

    pub async fn put_window(&self, space: u32, mut window: Window) {
        let mut world = self.0.lock().await;
        let old_space = world.windows.iter().find(|w| w.id == window.id).map(|w| w.space);
        window.space = space;
        world.windows.retain(|w| w.id != window.id);
        world.windows.push(window);
        world.reindex_space(space);
        if let Some(old) = old_space.filter(|&old| old != space) {
            world.reindex_space(old);
        }
    }

    pub async fn remove_window(&self, id: WindowId) {
        let mut world = self.0.lock().await;
        let Some(pos) = world.windows.iter().position(|w| w.id == id) else {
            return;
        };
        let space = world.windows[pos].space;
        world.windows.remove(pos);
        world.reindex_space(space);
    }

    pub async fn set_space_layout(&self, index: u32, layout: LayoutKind) {
        let mut world = self.0.lock().await;
        if let Some(space) = world.spaces.iter_mut().find(|s| s.index == index) {
            space.layout = layout;
        }
    }

    /// Make every subsequent mutation fail (still recorded, no effect).
    pub async fn fail_commands(&self, fail: bool) {
        self.0.lock().await.fail_commands = fail;
    }

    /// Drain the recorded command log.
    pub async fn take_commands(&self) -> Vec<Command> {
        std::mem::take(&mut self.0.lock().await.commands)
    }

    pub async fn window(&self, id: WindowId) -> Window {
        self.0.lock().await.window(id).unwrap()
    }

    pub async fn space(&self, index: u32) -> Space {
        self.0.lock().await.space(index).unwrap()
    }

    /// Member windows of a space, left to right.
    pub async fn space_order(&self, index: u32) -> Vec<WindowId> {
        self.0.lock().await.space(index).unwrap().windows
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn list_windows(&self) -> Result<Vec<Window>, GatewayError> {
        Ok(self.0.lock().await.windows.clone())
    }

    async fn list_windows_on_space(&self, space: u32) -> Result<Vec<Window>, GatewayError> {
        Ok(self
            .0
            .lock()
            .await
            .windows
            .iter()
            .filter(|w| w.space == space)
            .cloned()
            .collect())
    }

    async fn list_spaces(&self) -> Result<Vec<Space>, GatewayError> {
        Ok(self.0.lock().await.spaces.clone())
    }

    async fn list_displays(&self) -> Result<Vec<Display>, GatewayError> {
        Ok(vec![Display {
            id: 1,
            index: 1,
            frame: Frame {
                x: 0.0,
                y: 0.0,
                w: 1920.0,
                h: 1080.0,
            },
            spaces: self.0.lock().await.spaces.iter().map(|s| s.index).collect(),
        }])
    }

    async fn query_window(&self, id: WindowId) -> Result<Window, GatewayError> {
        self.0.lock().await.window(id)
    }

    async fn query_space(&self, index: u32) -> Result<Space, GatewayError> {
        self.0.lock().await.space(index)
    }

    async fn set_layout(&self, space: u32, layout: LayoutKind) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::SetLayout(space, layout))
    }

    async fn balance_space(&self, space: u32) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::Balance(space))
    }

    async fn move_window_to_space(&self, id: WindowId, space: u32) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::MoveToSpace(id, space))
    }

    async fn move_window_to_display(
        &self,
        id: WindowId,
        display: u32,
    ) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::MoveToDisplay(id, display))
    }

    async fn swap_windows(&self, a: WindowId, b: WindowId) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::Swap(a, b))
    }

    async fn toggle_split(&self, id: WindowId) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::ToggleSplit(id))
    }

    async fn set_insert(&self, id: WindowId, direction: Direction) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::SetInsert(id, direction))
    }

    async fn warp_window(&self, id: WindowId, onto: WindowId) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::Warp(id, onto))
    }

    async fn resize_window(
        &self,
        id: WindowId,
        anchor: ResizeAnchor,
        dx: f64,
        dy: f64,
    ) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::Resize(id, anchor, dx, dy))
    }

    async fn focus_window(&self, id: WindowId) -> Result<(), GatewayError> {
        self.0.lock().await.record(Command::Focus(id))
    }
}

/// A vertically-split window `width` 100 at horizontal offset `x`.
pub fn win(id: WindowId, app: &str, x: f64) -> Window {
    Window {
        id,
        app: app.into(),
        title: String::new(),
        frame: Frame {
            x,
            y: 0.0,
            w: 100.0,
            h: 100.0,
        },
        space: 0,
        display: 1,
        split_type: SplitKind::Vertical,
        has_focus: false,
    }
}
