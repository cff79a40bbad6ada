pub mod ping;
pub mod serve;
