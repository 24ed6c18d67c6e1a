//! Resource providers for the overprint engine.
//!
//! - [`FilesystemResourceProvider`]: loads assets from a local directory
//! - [`InMemoryResourceProvider`]: re-exported from overprint-traits

mod filesystem;

pub use filesystem::FilesystemResourceProvider;

pub use overprint_traits::InMemoryResourceProvider;
