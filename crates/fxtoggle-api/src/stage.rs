use std::fmt;

/// Pipeline stages the scheduler tracks per command list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Pixel,
    Vertex,
    Compute,
}

impl ShaderStage {
    pub const COUNT: usize = 3;
    pub const ALL: [Self; Self::COUNT] = [Self::Pixel, Self::Vertex, Self::Compute];

    pub const fn index(self) -> usize {
        match self {
            Self::Pixel => 0,
            Self::Vertex => 1,
            Self::Compute => 2,
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStage::Pixel => write!(f, "pixel"),
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Compute => write!(f, "compute"),
        }
    }
}

/// Host callback at which queued actions are resolved or executed.
///
/// `Draw` covers both draw and dispatch submissions. `BindPipeline` fires when the application
/// binds the next pipeline, i.e. after the draws of the previous one were recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CallSite {
    #[default]
    Draw,
    BindPipeline,
}

impl CallSite {
    pub const COUNT: usize = 2;
    pub const ALL: [Self; Self::COUNT] = [Self::Draw, Self::BindPipeline];

    pub const fn index(self) -> usize {
        match self {
            Self::Draw => 0,
            Self::BindPipeline => 1,
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallSite::Draw => write!(f, "draw"),
            CallSite::BindPipeline => write!(f, "bind_pipeline"),
        }
    }
}
