pub mod off_policy;
pub mod on_policy;
