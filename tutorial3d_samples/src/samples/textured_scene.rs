/// Textured mesh shared by the overlay and camera samples
///
/// Holds everything the two samples draw: the pipeline built from the
/// textured shaders, the mesh, its texture and sampler, the render-state
/// catalog, both constant buffers and the imgui overlay.

use std::sync::Arc;

use tutorial_3d_engine::tutorial3d::app::DeviceResources;
use tutorial_3d_engine::tutorial3d::assets::{Model, PipelineFactory, PipelineFormats};
use tutorial_3d_engine::tutorial3d::camera::{CameraConstants, PerspectiveCamera};
use tutorial_3d_engine::tutorial3d::overlay::ImguiOverlay;
use tutorial_3d_engine::tutorial3d::render::{
    Buffer, DeviceContext, DrawCall, FrameBindings, FrameRenderer, Pipeline, RenderStateCatalog,
    RenderStateSelection, Sampler, SamplerDesc, SwapchainManager, Texture, VertexLayoutKind,
    CAMERA_CONSTANTS_SLOT, OBJECT_CONSTANTS_SLOT,
};
use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::engine_info;

use super::common::{self, asset_root, ObjectConstants};
use crate::args::SampleArgs;

pub struct TexturedScene {
    pub pipeline: Arc<dyn Pipeline>,
    pub model: Model,
    pub texture: Arc<dyn Texture>,
    pub sampler: Arc<dyn Sampler>,
    pub catalog: RenderStateCatalog,
    pub camera_buffer: Arc<dyn Buffer>,
    pub object_buffer: Arc<dyn Buffer>,
    pub overlay: ImguiOverlay,
}

impl TexturedScene {
    pub fn load(resources: &mut DeviceResources, args: &SampleArgs) -> Result<Self> {
        let formats = PipelineFormats {
            color: resources.swapchain().format(),
            depth: resources.swapchain().depth_format(),
        };
        let (width, height) = (resources.swapchain().width(), resources.swapchain().height());
        let device = resources.device();

        let pipeline = PipelineFactory::new(asset_root()).create_pipeline(
            device,
            "shaders/textured.vs.wgsl",
            "shaders/textured.fs.wgsl",
            VertexLayoutKind::PositionColorUv,
            formats,
        )?;
        let model = common::load_model(device, args)?;
        let texture = common::load_texture(device, args)?;
        let sampler = device.create_sampler(SamplerDesc::default())?;
        let catalog = RenderStateCatalog::load(device)?;
        let camera_buffer = common::create_constant_buffer::<CameraConstants>(device)?;
        let object_buffer = common::create_constant_buffer::<ObjectConstants>(device)?;
        let overlay = ImguiOverlay::new(device, width, height)?;

        engine_info!(
            "tutorial3d::samples",
            "Scene loaded ({} vertices, {} indices)",
            model.vertex_count,
            model.index_count
        );

        Ok(Self {
            pipeline,
            model,
            texture,
            sampler,
            catalog,
            camera_buffer,
            object_buffer,
            overlay,
        })
    }

    /// Upload both constant buffers
    pub fn update_constants(
        &self,
        context: &mut dyn DeviceContext,
        camera: &mut PerspectiveCamera,
        angle_degrees: f32,
    ) -> Result<()> {
        let camera_constants = *camera.update();
        context.update_buffer(&self.camera_buffer, bytemuck::bytes_of(&camera_constants))?;
        let object = ObjectConstants::rotation_y(angle_degrees);
        context.update_buffer(&self.object_buffer, bytemuck::bytes_of(&object))
    }

    /// Record one frame: clear, mesh, overlay, present
    ///
    /// The overlay's draw data must already be built for this frame.
    pub fn render_frame(
        &self,
        frame: &mut FrameRenderer,
        context: &mut dyn DeviceContext,
        swapchain: &mut SwapchainManager,
        selection: &RenderStateSelection,
    ) -> Result<()> {
        frame.begin_frame();
        frame.clear(context, swapchain)?;

        let constant_buffers = [
            (CAMERA_CONSTANTS_SLOT, &self.camera_buffer),
            (OBJECT_CONSTANTS_SLOT, &self.object_buffer),
        ];
        let bindings = FrameBindings {
            pipeline: &self.pipeline,
            render_states: Some((&self.catalog, selection)),
            vertex_buffer: Some(&self.model.vertex_buffer),
            index_buffer: Some((&self.model.index_buffer, self.model.index_type)),
            constant_buffers: &constant_buffers,
            texture: Some(&self.texture),
            sampler: Some(&self.sampler),
        };
        frame.bind(context, &bindings)?;
        frame.draw(
            context,
            DrawCall::Indexed {
                index_count: self.model.index_count,
                first_index: 0,
                base_vertex: 0,
            },
        )?;

        frame.draw_overlay(context, self.overlay.draw_data(), self.overlay.font_texture())?;
        frame.present(swapchain)
    }
}
