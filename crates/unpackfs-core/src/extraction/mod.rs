//! The extraction engine.

pub mod engine;
mod prepare;

pub use engine::Extractor;
