/// Command line for the samples binary
///
/// ```text
/// tutorial3d_samples [triangle|overlay|camera] [--model <path>] [--texture <path>] [--no-validation]
/// ```

use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SampleKind {
    /// Colored triangle, no depth buffer
    Triangle,
    /// Rotating textured mesh with a rotation toggle
    Overlay,
    /// Free camera plus the full render-state overlay
    #[default]
    Camera,
}

impl SampleKind {
    /// Window title
    pub fn title(self) -> &'static str {
        match self {
            SampleKind::Triangle => "Tutorial3D - Triangle",
            SampleKind::Overlay => "Tutorial3D - Overlay",
            SampleKind::Camera => "Tutorial3D - Camera",
        }
    }
}

#[derive(clap::Parser, Debug, Clone, Default, PartialEq, Eq)]
#[command(about = "Tutorial3D rendering samples", long_about = None)]
pub struct SampleArgs {
    /// Sample to run.
    #[arg(value_enum, ignore_case = true, default_value_t = SampleKind::Camera)]
    pub sample: SampleKind,

    /// glTF model, relative to the asset root unless absolute.
    #[arg(long, value_name = "PATH")]
    pub model: Option<PathBuf>,

    /// Image file, relative to the asset root unless absolute.
    #[arg(long, value_name = "PATH")]
    pub texture: Option<PathBuf>,

    /// Skip the Vulkan validation layers in debug builds.
    #[arg(long)]
    pub no_validation: bool,
}

impl SampleArgs {
    /// Validation layers are a debug-build feature
    pub fn validation(&self) -> bool {
        cfg!(debug_assertions) && !self.no_validation
    }
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
