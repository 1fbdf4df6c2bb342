pub mod one_step;
