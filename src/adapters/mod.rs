// Adapters layer: concrete implementations of the platform port.

pub mod local;

pub use local::{LocalMount, LocalPlatform};
