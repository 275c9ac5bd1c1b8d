//! Engine configuration assembled from the process environment.

mod settings;

pub use settings::*;
