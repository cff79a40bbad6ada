//! Request payloads with validation at construction
//!
//! Invalid input returns ValidationError, not panic.

pub mod movie;
pub mod validation;

pub use movie::{CreateMovieRequest, MovieTitle};
pub use validation::ValidationError;
