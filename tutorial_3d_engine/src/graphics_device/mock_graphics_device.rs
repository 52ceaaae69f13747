/// Mock graphics device for unit tests (no GPU required)
///
/// Every device, context and swapchain call is appended to a shared call
/// log. Failures are injected through [`MockControl`], and every object
/// carries a live token so leaks and outstanding back-buffer views are
/// observable.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::graphics_device::{
    Buffer, BufferDesc, BufferUsage, ClearFlags, CullMode, DepthStencilDesc, DepthStencilState,
    DepthStencilView, DeviceContext, FillMode, GraphicsDevice, GraphicsDeviceStats, IndexType,
    LiveObjectReport, OverlayDrawData, Pipeline, PipelineDesc, RasterizerDesc, RasterizerState,
    RenderTargetView, Sampler, SamplerDesc, Swapchain, SwapchainDesc, Texture, TextureDesc,
    TextureFormat, TextureInfo, TextureUsage, VertexLayoutKind, Viewport,
};

// ============================================================================
// Shared state
// ============================================================================

/// Failure switches
#[derive(Debug, Clone, Default)]
pub struct MockControl {
    pub fail_back_buffer: bool,
    pub fail_render_target_view: bool,
    pub fail_depth_texture: bool,
    /// Fail sampled (non-depth) texture uploads
    pub fail_sampled_texture: bool,
    pub fail_depth_stencil_view: bool,
    pub fail_resize_buffers: bool,
    /// Fail the nth state creation (depth-stencil and rasterizer share the counter)
    pub fail_state_creation_at: Option<usize>,
    pub fail_draw: bool,
    pub fail_present: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiveKind {
    Buffer,
    Texture,
    BackBuffer,
    Sampler,
    Pipeline,
    DepthStencilState,
    RasterizerState,
    RenderTargetView,
    DepthStencilView,
}

#[derive(Default)]
struct MockState {
    calls: Vec<String>,
    control: MockControl,
    report: LiveObjectReport,
    back_buffer_refs: u32,
    states_created: usize,
    stats: GraphicsDeviceStats,
}

/// Cloneable handle to the state shared by every mock object
#[derive(Clone, Default)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockHandle {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn record(&self, call: impl Into<String>) {
        self.lock().calls.push(call.into());
    }

    /// Copy of the call log
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    /// Empty the call log
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Mutate the failure switches
    pub fn control(&self, f: impl FnOnce(&mut MockControl)) {
        f(&mut self.lock().control);
    }

    /// Back buffer handles still alive (directly or through views)
    pub fn back_buffer_refs(&self) -> u32 {
        self.lock().back_buffer_refs
    }

    pub fn live_objects(&self) -> LiveObjectReport {
        self.lock().report
    }

    fn token(&self, kind: LiveKind) -> LiveToken {
        {
            let mut state = self.lock();
            match kind {
                LiveKind::Buffer => state.report.buffers += 1,
                LiveKind::Texture => state.report.textures += 1,
                LiveKind::BackBuffer => state.back_buffer_refs += 1,
                LiveKind::Sampler => state.report.samplers += 1,
                LiveKind::Pipeline => state.report.pipelines += 1,
                LiveKind::DepthStencilState => state.report.depth_stencil_states += 1,
                LiveKind::RasterizerState => state.report.rasterizer_states += 1,
                LiveKind::RenderTargetView => state.report.render_target_views += 1,
                LiveKind::DepthStencilView => state.report.depth_stencil_views += 1,
            }
        }
        LiveToken { handle: self.clone(), kind }
    }
}

/// Decrements the matching live counter on drop
struct LiveToken {
    handle: MockHandle,
    kind: LiveKind,
}

impl Drop for LiveToken {
    fn drop(&mut self) {
        let mut state = self.handle.lock();
        match self.kind {
            LiveKind::Buffer => state.report.buffers -= 1,
            LiveKind::Texture => state.report.textures -= 1,
            LiveKind::BackBuffer => state.back_buffer_refs -= 1,
            LiveKind::Sampler => state.report.samplers -= 1,
            LiveKind::Pipeline => state.report.pipelines -= 1,
            LiveKind::DepthStencilState => state.report.depth_stencil_states -= 1,
            LiveKind::RasterizerState => state.report.rasterizer_states -= 1,
            LiveKind::RenderTargetView => state.report.render_target_views -= 1,
            LiveKind::DepthStencilView => state.report.depth_stencil_views -= 1,
        }
    }
}

fn depth_label(desc: &DepthStencilDesc) -> String {
    if desc.depth_enable {
        format!("{:?}", desc.depth_func)
    } else {
        "Disabled".to_string()
    }
}

fn rasterizer_label(desc: &RasterizerDesc) -> String {
    let fill = match desc.fill_mode {
        FillMode::Solid => "Solid",
        FillMode::Wireframe => "Wireframe",
    };
    let cull = match desc.cull_mode {
        CullMode::None => "None",
        CullMode::Front => "Front",
        CullMode::Back => "Back",
    };
    format!("{},{}", fill, cull)
}

// ============================================================================
// Mock resources
// ============================================================================

pub struct MockBuffer {
    size: u64,
    usage: BufferUsage,
    _token: LiveToken,
}

impl Buffer for MockBuffer {
    fn size(&self) -> u64 { self.size }
    fn usage(&self) -> BufferUsage { self.usage }
    fn update(&self, offset: u64, data: &[u8]) -> Result<()> {
        if offset + data.len() as u64 > self.size {
            return Err(Error::InvalidResource("write past end of buffer".to_string()));
        }
        Ok(())
    }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockTexture {
    info: TextureInfo,
    _token: LiveToken,
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo { &self.info }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockSampler {
    desc: SamplerDesc,
    _token: LiveToken,
}

impl Sampler for MockSampler {
    fn desc(&self) -> &SamplerDesc { &self.desc }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockPipeline {
    layout: VertexLayoutKind,
    _token: LiveToken,
}

impl Pipeline for MockPipeline {
    fn vertex_layout(&self) -> VertexLayoutKind { self.layout }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockDepthStencilState {
    desc: DepthStencilDesc,
    _token: LiveToken,
}

impl DepthStencilState for MockDepthStencilState {
    fn desc(&self) -> &DepthStencilDesc { &self.desc }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockRasterizerState {
    desc: RasterizerDesc,
    _token: LiveToken,
}

impl RasterizerState for MockRasterizerState {
    fn desc(&self) -> &RasterizerDesc { &self.desc }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockRenderTargetView {
    texture: Arc<dyn Texture>,
    _token: LiveToken,
}

impl RenderTargetView for MockRenderTargetView {
    fn texture(&self) -> &Arc<dyn Texture> { &self.texture }
    fn as_any(&self) -> &dyn Any { self }
}

pub struct MockDepthStencilView {
    texture: Arc<dyn Texture>,
    _token: LiveToken,
}

impl DepthStencilView for MockDepthStencilView {
    fn texture(&self) -> &Arc<dyn Texture> { &self.texture }
    fn as_any(&self) -> &dyn Any { self }
}

// ============================================================================
// Mock swapchain
// ============================================================================

pub struct MockSwapchain {
    handle: MockHandle,
    desc: SwapchainDesc,
}

impl Swapchain for MockSwapchain {
    fn back_buffer(&mut self) -> Result<Arc<dyn Texture>> {
        self.handle.record("back_buffer");
        if self.handle.lock().control.fail_back_buffer {
            return Err(Error::BackendError("back buffer lost".to_string()));
        }
        Ok(Arc::new(MockTexture {
            info: TextureInfo {
                width: self.desc.width,
                height: self.desc.height,
                format: self.desc.format,
                usage: TextureUsage::RenderTarget,
            },
            _token: self.handle.token(LiveKind::BackBuffer),
        }))
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<()> {
        self.handle.record(format!("resize_buffers({}x{})", width, height));
        let state = self.handle.lock();
        if state.back_buffer_refs > 0 {
            return Err(Error::BackendError(format!(
                "{} back buffer references still alive",
                state.back_buffer_refs
            )));
        }
        if state.control.fail_resize_buffers {
            return Err(Error::BackendError("resize_buffers failed".to_string()));
        }
        drop(state);
        self.desc.width = width;
        self.desc.height = height;
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> Result<()> {
        self.handle.record(format!("present({})", sync_interval));
        if self.handle.lock().control.fail_present {
            return Err(Error::BackendError("present failed".to_string()));
        }
        Ok(())
    }

    fn width(&self) -> u32 { self.desc.width }
    fn height(&self) -> u32 { self.desc.height }
    fn format(&self) -> TextureFormat { self.desc.format }
    fn buffer_count(&self) -> u32 { self.desc.buffer_count }
    fn as_any(&self) -> &dyn Any { self }
}

// ============================================================================
// Mock device context
// ============================================================================

pub struct MockDeviceContext {
    handle: MockHandle,
    bound_color: Option<Arc<dyn RenderTargetView>>,
    bound_depth: Option<Arc<dyn DepthStencilView>>,
    draw_calls: u32,
}

impl MockDeviceContext {
    fn draw_result(&mut self, call: String) -> Result<()> {
        self.handle.record(call);
        if self.handle.lock().control.fail_draw {
            return Err(Error::BackendError("draw failed".to_string()));
        }
        self.draw_calls += 1;
        Ok(())
    }
}

impl DeviceContext for MockDeviceContext {
    fn clear_render_target(&mut self, _view: &Arc<dyn RenderTargetView>, color: [f32; 4]) -> Result<()> {
        self.handle.record(format!("clear_render_target({:?})", color));
        Ok(())
    }

    fn clear_depth_stencil(
        &mut self,
        _view: &Arc<dyn DepthStencilView>,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    ) -> Result<()> {
        self.handle.record(format!("clear_depth_stencil({:?},{},{})", flags, depth, stencil));
        Ok(())
    }

    fn set_render_targets(
        &mut self,
        color: Option<&Arc<dyn RenderTargetView>>,
        depth: Option<&Arc<dyn DepthStencilView>>,
    ) -> Result<()> {
        self.handle.record(format!(
            "set_render_targets({},{})",
            if color.is_some() { "color" } else { "none" },
            if depth.is_some() { "depth" } else { "none" },
        ));
        self.bound_color = color.cloned();
        self.bound_depth = depth.cloned();
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.handle.record(format!("set_viewport({}x{})", viewport.width, viewport.height));
    }

    fn set_pipeline(&mut self, _pipeline: &Arc<dyn Pipeline>) -> Result<()> {
        self.handle.record("set_pipeline");
        Ok(())
    }

    fn set_depth_stencil_state(&mut self, state: &Arc<dyn DepthStencilState>) -> Result<()> {
        self.handle.record(format!("set_depth_stencil_state({})", depth_label(state.desc())));
        Ok(())
    }

    fn set_rasterizer_state(&mut self, state: &Arc<dyn RasterizerState>) -> Result<()> {
        self.handle.record(format!("set_rasterizer_state({})", rasterizer_label(state.desc())));
        Ok(())
    }

    fn set_vertex_buffer(&mut self, _buffer: &Arc<dyn Buffer>, offset: u64) -> Result<()> {
        self.handle.record(format!("set_vertex_buffer({})", offset));
        Ok(())
    }

    fn set_index_buffer(&mut self, _buffer: &Arc<dyn Buffer>, index_type: IndexType) -> Result<()> {
        self.handle.record(format!("set_index_buffer({:?})", index_type));
        Ok(())
    }

    fn set_constant_buffer(&mut self, slot: u32, _buffer: &Arc<dyn Buffer>) -> Result<()> {
        self.handle.record(format!("set_constant_buffer({})", slot));
        Ok(())
    }

    fn set_texture(&mut self, slot: u32, _texture: &Arc<dyn Texture>) -> Result<()> {
        self.handle.record(format!("set_texture({})", slot));
        Ok(())
    }

    fn set_sampler(&mut self, slot: u32, _sampler: &Arc<dyn Sampler>) -> Result<()> {
        self.handle.record(format!("set_sampler({})", slot));
        Ok(())
    }

    fn update_buffer(&mut self, buffer: &Arc<dyn Buffer>, data: &[u8]) -> Result<()> {
        self.handle.record(format!("update_buffer({})", data.len()));
        buffer.update(0, data)
    }

    fn draw(&mut self, vertex_count: u32, _first_vertex: u32) -> Result<()> {
        self.draw_result(format!("draw({})", vertex_count))
    }

    fn draw_indexed(&mut self, index_count: u32, _first_index: u32, _base_vertex: i32) -> Result<()> {
        self.draw_result(format!("draw_indexed({})", index_count))
    }

    fn draw_overlay(&mut self, data: &OverlayDrawData, _font_texture: &Arc<dyn Texture>) -> Result<()> {
        self.handle.record(format!("draw_overlay({})", data.commands.len()));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.handle.record("flush");
        Ok(())
    }

    fn draw_call_count(&self) -> u32 {
        self.draw_calls
    }
}

// ============================================================================
// Mock graphics device
// ============================================================================

pub struct MockGraphicsDevice {
    handle: MockHandle,
    context_taken: bool,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            handle: MockHandle::default(),
            context_taken: false,
        }
    }

    /// Handle to inspect calls and inject failures
    pub fn handle(&self) -> MockHandle {
        self.handle.clone()
    }

    fn create_state_check(&mut self) -> Result<()> {
        let mut state = self.handle.lock();
        let index = state.states_created;
        state.states_created += 1;
        state.stats.states_created += 1;
        if state.control.fail_state_creation_at == Some(index) {
            return Err(Error::BackendError(format!("state creation {} failed", index)));
        }
        Ok(())
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_buffer(&mut self, desc: BufferDesc) -> Result<Arc<dyn Buffer>> {
        self.handle.record(format!("create_buffer({:?},{})", desc.usage, desc.size));
        self.handle.lock().stats.buffers_created += 1;
        Ok(Arc::new(MockBuffer {
            size: desc.size,
            usage: desc.usage,
            _token: self.handle.token(LiveKind::Buffer),
        }))
    }

    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        self.handle.record(format!("create_texture({:?},{}x{})", desc.usage, desc.width, desc.height));
        if desc.usage == TextureUsage::DepthStencil && self.handle.lock().control.fail_depth_texture {
            return Err(Error::OutOfMemory);
        }
        if desc.usage == TextureUsage::Sampled && self.handle.lock().control.fail_sampled_texture {
            return Err(Error::BackendError("texture upload failed".to_string()));
        }
        self.handle.lock().stats.textures_created += 1;
        Ok(Arc::new(MockTexture {
            info: TextureInfo {
                width: desc.width,
                height: desc.height,
                format: desc.format,
                usage: desc.usage,
            },
            _token: self.handle.token(LiveKind::Texture),
        }))
    }

    fn create_sampler(&mut self, desc: SamplerDesc) -> Result<Arc<dyn Sampler>> {
        self.handle.record("create_sampler");
        Ok(Arc::new(MockSampler {
            desc,
            _token: self.handle.token(LiveKind::Sampler),
        }))
    }

    fn create_pipeline(&mut self, desc: PipelineDesc) -> Result<Arc<dyn Pipeline>> {
        self.handle.record(format!("create_pipeline({:?})", desc.vertex_layout));
        self.handle.lock().stats.pipelines_created += 1;
        Ok(Arc::new(MockPipeline {
            layout: desc.vertex_layout,
            _token: self.handle.token(LiveKind::Pipeline),
        }))
    }

    fn create_depth_stencil_state(&mut self, desc: &DepthStencilDesc) -> Result<Arc<dyn DepthStencilState>> {
        self.handle.record(format!("create_depth_stencil_state({})", depth_label(desc)));
        self.create_state_check()?;
        Ok(Arc::new(MockDepthStencilState {
            desc: *desc,
            _token: self.handle.token(LiveKind::DepthStencilState),
        }))
    }

    fn create_rasterizer_state(&mut self, desc: &RasterizerDesc) -> Result<Arc<dyn RasterizerState>> {
        self.handle.record(format!("create_rasterizer_state({})", rasterizer_label(desc)));
        self.create_state_check()?;
        Ok(Arc::new(MockRasterizerState {
            desc: *desc,
            _token: self.handle.token(LiveKind::RasterizerState),
        }))
    }

    fn create_swapchain(&mut self, desc: &SwapchainDesc) -> Result<Box<dyn Swapchain>> {
        self.handle.record(format!("create_swapchain({}x{})", desc.width, desc.height));
        Ok(Box::new(MockSwapchain {
            handle: self.handle.clone(),
            desc: desc.clone(),
        }))
    }

    fn create_render_target_view(&mut self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn RenderTargetView>> {
        self.handle.record("create_render_target_view");
        if self.handle.lock().control.fail_render_target_view {
            return Err(Error::BackendError("render target view failed".to_string()));
        }
        self.handle.lock().stats.views_created += 1;
        Ok(Arc::new(MockRenderTargetView {
            texture: texture.clone(),
            _token: self.handle.token(LiveKind::RenderTargetView),
        }))
    }

    fn create_depth_stencil_view(&mut self, texture: &Arc<dyn Texture>) -> Result<Arc<dyn DepthStencilView>> {
        self.handle.record("create_depth_stencil_view");
        if self.handle.lock().control.fail_depth_stencil_view {
            return Err(Error::BackendError("depth stencil view failed".to_string()));
        }
        self.handle.lock().stats.views_created += 1;
        Ok(Arc::new(MockDepthStencilView {
            texture: texture.clone(),
            _token: self.handle.token(LiveKind::DepthStencilView),
        }))
    }

    fn create_immediate_context(&mut self) -> Result<Box<dyn DeviceContext>> {
        if self.context_taken {
            return Err(Error::InitializationFailed("Immediate context already created".to_string()));
        }
        self.context_taken = true;
        Ok(Box::new(MockDeviceContext {
            handle: self.handle.clone(),
            bound_color: None,
            bound_depth: None,
            draw_calls: 0,
        }))
    }

    fn wait_idle(&self) -> Result<()> {
        self.handle.record("wait_idle");
        Ok(())
    }

    fn stats(&self) -> GraphicsDeviceStats {
        self.handle.lock().stats
    }

    fn report_live_objects(&self) -> LiveObjectReport {
        self.handle.record("report_live_objects");
        self.handle.live_objects()
    }
}

#[cfg(test)]
#[path = "mock_graphics_device_tests.rs"]
mod tests;
