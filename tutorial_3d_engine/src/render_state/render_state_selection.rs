/// Render-state selection indices and their meaning
///
/// Depth indices `0..=8` and cull indices `10..=12` are the values written
/// by the debug overlay radio buttons. Anything outside those ranges is a
/// valid selection value that simply maps to no state.

use crate::graphics_device::{CompareOp, CullMode, DepthStencilDesc};

/// Depth index meaning "depth test disabled"
pub const DEPTH_INDEX_DISABLED: i32 = 0;

/// First cull index
pub const CULL_INDEX_BASE: i32 = 10;

/// Comparison for each enabled depth index (1..=8)
const DEPTH_FUNCTIONS: [CompareOp; 8] = [
    CompareOp::Less,
    CompareOp::LessOrEqual,
    CompareOp::Greater,
    CompareOp::GreaterOrEqual,
    CompareOp::Equal,
    CompareOp::NotEqual,
    CompareOp::Always,
    CompareOp::Never,
];

/// Cull mode for cull indices 10, 11, 12
const CULL_MODES: [CullMode; 3] = [CullMode::Front, CullMode::Back, CullMode::None];

/// Radio button labels, indexed by depth index
pub const DEPTH_STATE_LABELS: [&str; 9] = [
    "Disabled",
    "Less",
    "LessEqual",
    "Greater",
    "GreaterEqual",
    "Equal",
    "NotEqual",
    "Always",
    "Never",
];

/// Radio button labels, indexed by `cull index - CULL_INDEX_BASE`
pub const CULL_MODE_LABELS: [&str; 3] = ["Front", "Back", "None"];

/// Depth-stencil descriptor for a depth index, `None` when out of range
pub fn depth_index_to_desc(index: i32) -> Option<DepthStencilDesc> {
    match index {
        DEPTH_INDEX_DISABLED => Some(DepthStencilDesc::disabled()),
        1..=8 => Some(DepthStencilDesc::enabled(DEPTH_FUNCTIONS[(index - 1) as usize])),
        _ => None,
    }
}

/// Cull mode for a cull index, `None` when out of range
pub fn cull_index_to_mode(index: i32) -> Option<CullMode> {
    let slot = index.checked_sub(CULL_INDEX_BASE)?;
    usize::try_from(slot).ok().and_then(|slot| CULL_MODES.get(slot).copied())
}

/// Current UI choice of depth-stencil and rasterizer state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderStateSelection {
    /// Depth index, `0..=8`
    pub depth_index: i32,
    /// Cull index, `10..=12`
    pub cull_index: i32,
    /// Draw edges only
    pub wireframe: bool,
}

impl Default for RenderStateSelection {
    /// Depth "Less", cull "Back", solid fill
    fn default() -> Self {
        Self {
            depth_index: 1,
            cull_index: 11,
            wireframe: false,
        }
    }
}

impl RenderStateSelection {
    /// Human-readable summary, out-of-range indices shown as `?`
    pub fn describe(&self) -> String {
        let depth = usize::try_from(self.depth_index)
            .ok()
            .and_then(|i| DEPTH_STATE_LABELS.get(i))
            .copied()
            .unwrap_or("?");
        let cull = self
            .cull_index
            .checked_sub(CULL_INDEX_BASE)
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| CULL_MODE_LABELS.get(i))
            .copied()
            .unwrap_or("?");
        format!(
            "depth={} cull={} fill={}",
            depth,
            cull,
            if self.wireframe { "Wireframe" } else { "Solid" }
        )
    }
}
