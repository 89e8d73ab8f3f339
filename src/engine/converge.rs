//! Per-space convergence: drive one live space toward its hydrated plan
//! with the minimum command sequence, skipping every step whose
//! postcondition already holds.

use tracing::{debug, warn};

use crate::engine::{EngineError, resize};
use crate::gateway::{CommandOutcome, Gateway};
use crate::mirror::StateMirror;
use crate::model::{Direction, HydratedSpacePlan, LayoutKind, Space, SplitKind, Window};

pub(crate) async fn converge_space(
    gateway: &dyn Gateway,
    mirror: &mut StateMirror<'_>,
    plan: &HydratedSpacePlan,
) -> Result<(), EngineError> {
    let Some(space) = plan.space.clone() else {
        warn!(index = plan.index, "declared index resolves to no live space, skipping");
        return Ok(());
    };
    // Malformed ratios fail the space before any command is issued for it.
    if let Some(sizes) = &plan.sizes {
        resize::validate_ratios(sizes, plan.slots.len())?;
    }

    debug!(space = space.index, layout = %plan.layout, "converging space");
    let mut space = space;
    if space.layout != plan.layout {
        let result = gateway.set_layout(space.index, plan.layout).await;
        let _ = CommandOutcome::note(
            format_args!("set layout {} on space {}", plan.layout, space.index),
            result,
        );
    }

    let mut bound = plan.bound_windows();
    order_windows(gateway, mirror, &mut bound, &mut space).await?;

    match &plan.sizes {
        Some(sizes) if plan.is_fully_bound() => {
            resize::apply_ratios(gateway, mirror, &bound, sizes).await?;
        }
        Some(_) => {
            warn!(
                space = space.index,
                "sizes declared but not every slot is bound, falling back to balance"
            );
            balance_if_bsp(gateway, plan.layout, space.index).await;
        }
        None => balance_if_bsp(gateway, plan.layout, space.index).await,
    }
    Ok(())
}

async fn balance_if_bsp(gateway: &dyn Gateway, layout: LayoutKind, space: u32) {
    if layout != LayoutKind::Bsp {
        return;
    }
    let result = gateway.balance_space(space).await;
    let _ = CommandOutcome::note(format_args!("balance space {space}"), result);
}

/// Steps 2–7: membership of the first window, first-window ordering,
/// orientation, then positional reordering. `bound` holds the present
/// windows in slot order and is kept fresh across every mutation that can
/// invalidate a record it contains.
async fn order_windows(
    gateway: &dyn Gateway,
    mirror: &mut StateMirror<'_>,
    bound: &mut Vec<Window>,
    space: &mut Space,
) -> Result<(), EngineError> {
    let Some(first) = bound.first().cloned() else {
        return Ok(());
    };

    if !space.windows.contains(&first.id) {
        debug!(window = first.id, app = %first.app, space = space.index, "moving first window onto space");
        let result = gateway.move_window_to_space(first.id, space.index).await;
        let _ = CommandOutcome::note(
            format_args!("move window {} to space {}", first.id, space.index),
            result,
        );
        // The move invalidates the space's member list and the window's
        // space field.
        *space = mirror.refresh_space(space.index).await?;
        bound[0] = mirror.refresh_window(first.id).await?;
    }

    if bound.len() == 1 {
        return Ok(());
    }

    let mut swapped = false;
    if space.first_window != 0 && space.first_window != bound[0].id {
        debug!(window = bound[0].id, app = %bound[0].app, "swapping into first position");
        let result = gateway.swap_windows(bound[0].id, space.first_window).await;
        let _ = CommandOutcome::note(
            format_args!("swap window {} with {}", bound[0].id, space.first_window),
            result,
        );
        swapped = true;
    }

    let mut toggled = false;
    for i in 0..bound.len() {
        // A toggle can flip a sibling's split as well, so everything after
        // the first toggle is re-read before it is inspected.
        if toggled {
            bound[i] = mirror.refresh_window(bound[i].id).await?;
        }
        if bound[i].split_type != SplitKind::Vertical {
            debug!(window = bound[i].id, app = %bound[i].app, "toggling split to vertical");
            let result = gateway.toggle_split(bound[i].id).await;
            let _ = CommandOutcome::note(format_args!("toggle split on {}", bound[i].id), result);
            toggled = true;
        }
    }

    // Frames recorded before a swap or toggle are unusable for position
    // decisions; re-read the lot before sorting.
    if swapped || toggled {
        for window in bound.iter_mut() {
            *window = mirror.refresh_window(window.id).await?;
        }
    }

    let mut by_offset: Vec<&Window> = bound.iter().collect();
    by_offset.sort_by(|a, b| a.frame.x.total_cmp(&b.frame.x));
    let in_order = by_offset.iter().zip(bound.iter()).all(|(a, b)| a.id == b.id);
    let on_space = bound.iter().all(|w| w.space == space.index);
    if in_order && on_space {
        debug!(space = space.index, "arrangement already converged");
        return Ok(());
    }

    // Pairwise insert+warp is the only reordering primitive the manager
    // exposes. Each warp changes the offsets later pairs read, so the walk
    // must stay in slot order.
    for i in 1..bound.len() {
        let previous = bound[i - 1].id;
        let current = bound[i].id;
        debug!(window = current, after = previous, "warping into place");
        let result = gateway.set_insert(previous, Direction::East).await;
        let _ = CommandOutcome::note(format_args!("set insert east on {previous}"), result);
        let result = gateway.warp_window(current, previous).await;
        let _ = CommandOutcome::note(format_args!("warp {current} after {previous}"), result);
    }
    Ok(())
}
