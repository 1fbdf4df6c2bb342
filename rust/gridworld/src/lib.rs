extern crate rand;
extern crate serde;

pub mod common;
pub mod environment;
pub mod error;
pub mod hazard;
pub mod world;

pub use common::defs::*;
pub use environment::*;
pub use error::Error;
pub use hazard::*;
pub use world::*;
