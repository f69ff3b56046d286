pub mod common;
pub mod gateway;
pub mod gemini;
pub mod image;
pub mod pose;

pub use self::common::*;
pub use self::gateway::*;
pub use self::gemini::*;
pub use self::image::*;
pub use self::pose::*;
