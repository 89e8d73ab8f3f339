//! Proportional width targets turned into anchored resize deltas.

use tracing::debug;

use crate::engine::EngineError;
use crate::gateway::{CommandOutcome, Gateway};
use crate::mirror::StateMirror;
use crate::model::{ResizeAnchor, Window};

/// Tolerance for the ratios-sum-to-one check; the lists are literals in
/// practice, so anything beyond float noise is a real mistake.
const RATIO_SUM_TOLERANCE: f64 = 1e-9;

pub(crate) fn validate_ratios(ratios: &[f64], expected: usize) -> Result<(), EngineError> {
    if ratios.len() != expected {
        return Err(EngineError::RatioCountMismatch {
            expected,
            got: ratios.len(),
        });
    }
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
        return Err(EngineError::RatioSum { sum });
    }
    Ok(())
}

/// Resize `windows` so their widths divide the space according to `ratios`.
///
/// The walk is in reverse slot order: resizing left to right is unreliable
/// in the external manager once earlier windows have shrunk
/// (koekeishiya/yabai#1207). The leftmost slot is never resized directly;
/// its left edge is the container boundary, so it absorbs whatever width
/// the others leave. Deltas anchor on each window's left edge, where a
/// negative value grows the window.
pub(crate) async fn apply_ratios(
    gateway: &dyn Gateway,
    mirror: &mut StateMirror<'_>,
    windows: &[Window],
    ratios: &[f64],
) -> Result<(), EngineError> {
    validate_ratios(ratios, windows.len())?;

    // Total width comes from the pre-resize frames, once; per-step widths
    // are refreshed because each resize shifts the next window's edge.
    let total_width: f64 = windows.iter().map(|w| w.frame.w).sum();

    let reverse_pairs = windows
        .iter()
        .zip(ratios)
        .rev()
        .take(windows.len().saturating_sub(1));
    for (window, ratio) in reverse_pairs {
        let fresh = mirror.refresh_window(window.id).await?;
        let delta = fresh.frame.w - total_width * ratio;
        debug!(
            window = fresh.id,
            app = %fresh.app,
            width = fresh.frame.w,
            delta,
            "resizing against left edge"
        );
        let result = gateway.resize_window(fresh.id, ResizeAnchor::Left, delta, 0.0).await;
        let _ = CommandOutcome::note(format_args!("resize window {}", fresh.id), result);
    }
    Ok(())
}
