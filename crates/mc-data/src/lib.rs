pub mod cache;
pub mod loaders;

pub use cache::*;
pub use loaders::*;
