pub mod constants;
pub mod input;
pub mod markdown;
pub mod render;
