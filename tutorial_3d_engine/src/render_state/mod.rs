//! Render-state selection - UI indices mapped to pre-created state objects

mod render_state_selection;
mod render_state_catalog;

pub use render_state_selection::{
    RenderStateSelection, DEPTH_STATE_LABELS, CULL_MODE_LABELS, CULL_INDEX_BASE,
    DEPTH_INDEX_DISABLED, depth_index_to_desc, cull_index_to_mode,
};
pub use render_state_catalog::RenderStateCatalog;
