extern crate gridworld;

pub mod algos;
pub mod config;
pub mod environments;
mod envs;
pub mod error;
pub mod math;
pub mod policy;

pub use error::{Error, Result};
