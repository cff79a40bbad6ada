//! Datastore gateway - connection pool and the movies table
//!
//! - One process-wide pool, never bypassed with ad hoc connections
//! - Every statement is parameterized and runs in its own transaction
//! - Every call runs under a caller-supplied [`crate::Deadline`]

pub mod movies;
pub mod pool;

pub use movies::{DbError, Movie, MovieStore, PgMovieStore};
pub use pool::{connect, spawn_pool_stats, ConnectError, PoolStats};
