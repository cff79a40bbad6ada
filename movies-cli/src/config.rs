//! Environment loading

use std::path::PathBuf;

/// Load `.env` from the current directory, if present.
///
/// Variables already set in the environment win; dotenvy never
/// overwrites them. Runs before logging is initialized, so the caller
/// reports the outcome.
pub fn load_dotenv() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}
