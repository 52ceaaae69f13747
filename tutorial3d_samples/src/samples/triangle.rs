/// Colored triangle on a grey background, no depth buffer

use std::sync::Arc;

use tutorial_3d_engine::tutorial3d::app::{AppContext, Application, DeviceResources, UpdateContext};
use tutorial_3d_engine::tutorial3d::assets::{PipelineFactory, PipelineFormats};
use tutorial_3d_engine::tutorial3d::render::{
    Buffer, BufferDesc, BufferUsage, DrawCall, FrameBindings, FrameRenderer, Pipeline, VertexLayoutKind,
    VertexPositionColor,
};
use tutorial_3d_engine::tutorial3d::Result;
use tutorial_3d_engine::engine_info;
use winit::keyboard::KeyCode;

use super::common::{self, asset_root, not_loaded};
use crate::args::SampleArgs;

/// Clockwise, front-facing under the default rasterizer state
pub const TRIANGLE_VERTICES: [VertexPositionColor; 3] = [
    VertexPositionColor { position: [0.0, 0.5, 0.0], color: [0.25, 0.39, 0.19] },
    VertexPositionColor { position: [0.5, -0.5, 0.0], color: [0.44, 0.75, 0.35] },
    VertexPositionColor { position: [-0.5, -0.5, 0.0], color: [0.38, 0.55, 0.20] },
];

struct TriangleScene {
    pipeline: Arc<dyn Pipeline>,
    vertex_buffer: Arc<dyn Buffer>,
}

pub struct TriangleSample {
    args: SampleArgs,
    frame: FrameRenderer,
    scene: Option<TriangleScene>,
    resources: Option<DeviceResources>,
}

impl TriangleSample {
    pub fn new(args: SampleArgs) -> Self {
        Self {
            args,
            frame: FrameRenderer::new(),
            scene: None,
            resources: None,
        }
    }
}

impl Application for TriangleSample {
    fn initialize(&mut self, context: &mut AppContext<'_>) -> Result<()> {
        self.resources = Some(common::create_device_resources(context, &self.args, None)?);
        Ok(())
    }

    fn load(&mut self) -> Result<()> {
        let resources = self.resources.as_mut().ok_or_else(|| not_loaded("load"))?;
        let color_format = resources.swapchain().format();
        let device = resources.device();

        let pipeline = PipelineFactory::new(asset_root()).create_pipeline(
            device,
            "shaders/color.vs.wgsl",
            "shaders/color.fs.wgsl",
            VertexLayoutKind::PositionColor,
            PipelineFormats { color: color_format, depth: None },
        )?;
        let vertex_buffer = device.create_buffer(BufferDesc::with_data(BufferUsage::Vertex, &TRIANGLE_VERTICES))?;

        engine_info!("tutorial3d::samples::triangle", "Triangle loaded");
        self.scene = Some(TriangleScene { pipeline, vertex_buffer });
        Ok(())
    }

    fn update(&mut self, context: &mut UpdateContext<'_>) {
        if context.input.is_key_pressed(KeyCode::Escape) {
            context.request_exit();
        }
    }

    fn render(&mut self) -> Result<()> {
        let (Some(resources), Some(scene)) = (self.resources.as_mut(), self.scene.as_ref()) else {
            return Err(not_loaded("render"));
        };
        let (_, context, swapchain) = resources.parts();

        self.frame.begin_frame();
        self.frame.clear(context, swapchain)?;

        let mut bindings = FrameBindings::new(&scene.pipeline);
        bindings.vertex_buffer = Some(&scene.vertex_buffer);
        self.frame.bind(context, &bindings)?;

        self.frame.draw(context, DrawCall::NonIndexed { vertex_count: 3, first_vertex: 0 })?;
        self.frame.present(swapchain)
    }

    fn on_resize(&mut self, width: u32, height: u32) {
        common::resize(&mut self.resources, width, height, &mut []);
    }

    fn shutdown(&mut self) {
        self.scene = None;
        self.resources = None;
        engine_info!(
            "tutorial3d::samples::triangle",
            "Shut down after {} frames",
            self.frame.frames_presented()
        );
    }
}

#[cfg(test)]
#[path = "triangle_tests.rs"]
mod tests;
