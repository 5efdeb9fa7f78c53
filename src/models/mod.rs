pub mod character;
pub mod loaders;
pub mod scene;
pub mod video_config;

pub use character::{CharacterReference, CharacterVariation};
pub use scene::{GenerationProgress, Scene, ScenePrompt};
pub use video_config::{VideoConfig, VideoFormat};
