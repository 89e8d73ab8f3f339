//! Records mirroring the window manager's query output, plus the declared
//! layout model built on top of them.

pub mod plan;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub use plan::{AppQuery, Context, HydratedSpacePlan, LayoutPlan, SpacePlan, TitleMatch};

pub type WindowId = u32;
pub type SpaceId = u64;

/// Screen-space rectangle as reported by the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LayoutKind {
    #[default]
    Bsp,
    Float,
    Stack,
}

/// Split orientation of a window relative to its sibling.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SplitKind {
    Vertical,
    Horizontal,
    #[default]
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Direction {
    North,
    East,
    South,
    West,
}

/// Edge a resize delta is anchored on. `Left` with a negative horizontal
/// delta grows the window; see the ratio resizer for the sign convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResizeAnchor {
    Left,
    Right,
    Top,
    Bottom,
}

/// One live window. The external record carries many more attributes; only
/// the ones this system reads are kept, the rest are ignored on decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub app: String,
    #[serde(default)]
    pub title: String,
    pub frame: Frame,
    /// Index of the space this window currently lives on.
    pub space: u32,
    #[serde(default)]
    pub display: u32,
    #[serde(rename = "split-type", default)]
    pub split_type: SplitKind,
    #[serde(rename = "has-focus", default)]
    pub has_focus: bool,
}

/// One live space. `first_window`/`last_window` are 0 when the space is
/// empty; `first_window` is always a member of `windows` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    /// 1-based position in the live space list.
    pub index: u32,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub layout: LayoutKind,
    #[serde(default)]
    pub display: u32,
    #[serde(default)]
    pub windows: Vec<WindowId>,
    #[serde(rename = "first-window", default)]
    pub first_window: WindowId,
    #[serde(rename = "last-window", default)]
    pub last_window: WindowId,
    #[serde(rename = "has-focus", default)]
    pub has_focus: bool,
    #[serde(rename = "is-visible", default)]
    pub is_visible: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Display {
    pub id: u32,
    pub index: u32,
    pub frame: Frame,
    #[serde(default)]
    pub spaces: Vec<u32>,
}

/// Resolve a declared 1-based space index against the live space list.
/// Negative indices count from the end (`-1` is the last space); 0 never
/// resolves.
pub fn resolve_space_index(spaces: &[Space], index: i32) -> Option<&Space> {
    if index > 0 {
        spaces.get(index as usize - 1)
    } else if index < 0 {
        spaces.len().checked_sub(index.unsigned_abs() as usize).and_then(|i| spaces.get(i))
    } else {
        None
    }
}
