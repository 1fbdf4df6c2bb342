pub mod monte_carlo;
pub mod td;
