/// Render-state catalog - every selectable state, created once at load
///
/// Lookups hand out references to the pre-created objects, so switching
/// states every frame allocates nothing.

use std::sync::Arc;

use crate::error::Result;
use crate::graphics_device::{
    DepthStencilState, DeviceContext, FillMode, GraphicsDevice, RasterizerDesc, RasterizerState,
};
use crate::render_state::render_state_selection::{
    cull_index_to_mode, depth_index_to_desc, RenderStateSelection, CULL_INDEX_BASE,
    CULL_MODE_LABELS, DEPTH_STATE_LABELS,
};
use crate::{engine_error, engine_info, engine_trace};

const FILL_MODES: [FillMode; 2] = [FillMode::Solid, FillMode::Wireframe];

pub struct RenderStateCatalog {
    /// Indexed by depth index
    depth_states: Vec<Arc<dyn DepthStencilState>>,
    /// Indexed by `fill * 3 + (cull index - CULL_INDEX_BASE)`
    rasterizer_states: Vec<Arc<dyn RasterizerState>>,
}

impl RenderStateCatalog {
    /// Create the 9 depth-stencil states and the 6 rasterizer states
    ///
    /// The first failure aborts loading.
    pub fn load(device: &mut dyn GraphicsDevice) -> Result<Self> {
        let mut depth_states = Vec::with_capacity(DEPTH_STATE_LABELS.len());
        for (index, label) in DEPTH_STATE_LABELS.iter().enumerate() {
            let Some(desc) = depth_index_to_desc(index as i32) else {
                continue;
            };
            let state = device.create_depth_stencil_state(&desc).map_err(|e| {
                engine_error!("tutorial3d::RenderStateCatalog", "Failed to create depth stencil state '{}': {}", label, e);
                e
            })?;
            depth_states.push(state);
        }

        let mut rasterizer_states = Vec::with_capacity(FILL_MODES.len() * CULL_MODE_LABELS.len());
        for fill_mode in FILL_MODES {
            for (slot, label) in CULL_MODE_LABELS.iter().enumerate() {
                let Some(cull_mode) = cull_index_to_mode(CULL_INDEX_BASE + slot as i32) else {
                    continue;
                };
                let desc = RasterizerDesc::new(fill_mode, cull_mode);
                let state = device.create_rasterizer_state(&desc).map_err(|e| {
                    engine_error!(
                        "tutorial3d::RenderStateCatalog",
                        "Failed to create rasterizer state ({:?}, cull {}): {}",
                        fill_mode,
                        label,
                        e
                    );
                    e
                })?;
                rasterizer_states.push(state);
            }
        }

        engine_info!(
            "tutorial3d::RenderStateCatalog",
            "Created {} depth stencil states and {} rasterizer states",
            depth_states.len(),
            rasterizer_states.len()
        );

        Ok(Self { depth_states, rasterizer_states })
    }

    /// State for a depth index, `None` when out of range
    pub fn depth_stencil_state(&self, index: i32) -> Option<&Arc<dyn DepthStencilState>> {
        usize::try_from(index).ok().and_then(|i| self.depth_states.get(i))
    }

    /// State for a cull index and fill mode, `None` when the cull index is out of range
    pub fn rasterizer_state(&self, cull_index: i32, wireframe: bool) -> Option<&Arc<dyn RasterizerState>> {
        cull_index_to_mode(cull_index)?;
        let slot = (cull_index - CULL_INDEX_BASE) as usize;
        let fill = usize::from(wireframe);
        self.rasterizer_states.get(fill * CULL_MODE_LABELS.len() + slot)
    }

    /// Bind the states named by `selection`
    ///
    /// An out-of-range index binds nothing for that state, leaving the
    /// previously bound one in effect. Returns which states were bound
    /// as `(depth_stencil, rasterizer)`.
    pub fn apply(&self, context: &mut dyn DeviceContext, selection: &RenderStateSelection) -> Result<(bool, bool)> {
        let depth = match self.depth_stencil_state(selection.depth_index) {
            Some(state) => {
                context.set_depth_stencil_state(state)?;
                true
            }
            None => false,
        };

        let rasterizer = match self.rasterizer_state(selection.cull_index, selection.wireframe) {
            Some(state) => {
                context.set_rasterizer_state(state)?;
                true
            }
            None => false,
        };

        if !depth || !rasterizer {
            engine_trace!(
                "tutorial3d::RenderStateCatalog",
                "Selection out of range, keeping previous state ({})",
                selection.describe()
            );
        }

        Ok((depth, rasterizer))
    }

    pub fn depth_state_count(&self) -> usize {
        self.depth_states.len()
    }

    pub fn rasterizer_state_count(&self) -> usize {
        self.rasterizer_states.len()
    }
}

#[cfg(test)]
#[path = "render_state_catalog_tests.rs"]
mod tests;
