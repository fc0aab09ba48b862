//! Session data sources for Paddock

pub mod archive;
pub mod demo;

pub use archive::ArchiveSource;
pub use demo::DemoSource;
