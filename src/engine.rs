//! The reconciliation engine.
//!
//! A pass hydrates the declared plan against a live snapshot, hands
//! unclaimed windows to the fallback, then converges each declared space in
//! order. Mutations are best-effort: a rejected command is logged and the
//! pass keeps going on whatever state resulted. Queries are load-bearing;
//! if one fails the pass cannot reason about live state and returns the
//! error instead.

mod converge;
mod hydrate;
mod resize;

use thiserror::Error;
use tracing::{debug, info};

use crate::gateway::{Gateway, GatewayError};
use crate::mirror::StateMirror;
use crate::model::{Context, LayoutPlan, Window};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("size ratios: expected {expected} entries, got {got}")]
    RatioCountMismatch { expected: usize, got: usize },
    #[error("size ratios must sum to 1, got {sum}")]
    RatioSum { sum: f64 },
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Converge the live arrangement to `plan`.
///
/// Each invocation owns a private mirror and window pool; there is no state
/// shared between passes. Spaces are processed in declaration order, and a
/// validation error in one space leaves everything converged before it in
/// place.
pub async fn apply_layout(gateway: &dyn Gateway, mut plan: LayoutPlan) -> Result<(), EngineError> {
    let mut mirror = StateMirror::new(gateway);
    let mut pool = mirror.refresh_all_windows().await?;
    let spaces = mirror.refresh_all_spaces().await?;

    let declared = std::mem::take(&mut plan.spaces);
    let hydrated = hydrate::hydrate(declared, &mut pool, &spaces);

    // Leftovers go to the fallback before any space is converged, so it can
    // park them without racing the reordering below.
    if let Some(fallback) = plan.fallback.as_mut() {
        debug!(leftovers = pool.len(), "handing unclaimed windows to fallback");
        let leftovers = std::mem::take(&mut pool);
        fallback(leftovers, Context { spaces: &spaces }, gateway).await;
    }

    for space_plan in &hydrated {
        converge::converge_space(gateway, &mut mirror, space_plan).await?;
    }
    info!(spaces = hydrated.len(), "layout applied");
    Ok(())
}

/// Standalone entry to the ratio resizer: validate `ratios` against
/// `windows` and issue the anchored resize sequence. Fails without a single
/// command when the lists disagree in length or the ratios do not sum to 1.
pub async fn apply_ratios(
    gateway: &dyn Gateway,
    windows: &[Window],
    ratios: &[f64],
) -> Result<(), EngineError> {
    let mut mirror = StateMirror::new(gateway);
    resize::apply_ratios(gateway, &mut mirror, windows, ratios).await
}
