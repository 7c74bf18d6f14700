//! I/O adapters used by the source readers.

pub mod window;

pub use window::WindowReader;
