//! Tutorial3D samples
//!
//! Runs one of the samples on the Vulkan backend:
//!
//! - `triangle`: colored triangle, no depth buffer
//! - `overlay`: rotating textured mesh with an imgui rotation toggle
//! - `camera`: free camera plus depth, cull and fill-mode controls

mod args;
mod samples;

use std::process::ExitCode;

use tutorial_3d_engine::tutorial3d::app::{AppConfig, ApplicationHost};
use tutorial_3d_engine::tutorial3d::log::LogSeverity;
use tutorial_3d_engine::tutorial3d::{Engine, Result};
use tutorial_3d_engine::{engine_error, engine_info};

use clap::Parser;

use args::{SampleArgs, SampleKind};
use samples::{CameraSample, OverlaySample, TriangleSample};

fn run(args: SampleArgs) -> Result<()> {
    tutorial_3d_engine_renderer_vulkan::register()?;

    let config = AppConfig {
        title: args.sample.title().to_string(),
        renderer: tutorial_3d_engine_renderer_vulkan::PLUGIN_NAME.to_string(),
        ..AppConfig::default()
    };
    engine_info!("tutorial3d::samples", "Starting '{}'", config.title);

    match args.sample {
        SampleKind::Triangle => ApplicationHost::run(TriangleSample::new(args), config),
        SampleKind::Overlay => ApplicationHost::run(OverlaySample::new(args), config),
        SampleKind::Camera => ApplicationHost::run(CameraSample::new(args), config),
    }
}

fn main() -> ExitCode {
    Engine::set_min_severity(if cfg!(debug_assertions) {
        LogSeverity::Debug
    } else {
        LogSeverity::Info
    });

    let args = SampleArgs::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            engine_error!("tutorial3d::samples", "Sample failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
