#[cfg(test)]
pub mod simple_golf;
