//! Plan hydration: resolving declared queries against the live window pool.

use tracing::debug;

use crate::model::{
    AppQuery, HydratedSpacePlan, Space, SpacePlan, Window, resolve_space_index,
};

/// Match every query of every space plan against the pool, in declaration
/// order. First match wins; a claimed window leaves the pool and can never
/// be bound to a second slot within the pass. Whatever survives in `pool`
/// afterwards is unclaimed and belongs to the fallback handler.
pub(crate) fn hydrate(
    plans: Vec<SpacePlan>,
    pool: &mut Vec<Window>,
    spaces: &[Space],
) -> Vec<HydratedSpacePlan> {
    plans
        .into_iter()
        .map(|plan| {
            let slots = plan.windows.iter().map(|query| claim(pool, query)).collect();
            let space = resolve_space_index(spaces, plan.index).cloned();
            HydratedSpacePlan {
                index: plan.index,
                layout: plan.layout,
                slots,
                sizes: plan.sizes,
                space,
            }
        })
        .collect()
}

fn claim(pool: &mut Vec<Window>, query: &AppQuery) -> Option<Window> {
    let position = pool.iter().position(|window| query.matches(window));
    match position {
        Some(position) => Some(pool.remove(position)),
        None => {
            debug!(app = %query.app, "no live window matches query");
            None
        }
    }
}
