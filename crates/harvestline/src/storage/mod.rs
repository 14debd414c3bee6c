pub mod artifacts;

pub use artifacts::ArtifactStore;
