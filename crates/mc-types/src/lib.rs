pub mod errors;
pub mod game;
pub mod mode;
pub mod params;
pub mod regression;

pub use errors::*;
pub use game::*;
pub use mode::*;
pub use params::*;
pub use regression::*;
