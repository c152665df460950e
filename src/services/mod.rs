pub mod compactor;
pub mod prober;
pub mod state;
pub mod transcript;

pub use compactor::{CompactionPolicy, ContextCompactor, SummarizationError};
pub use prober::{ProbeConfig, StatusProber};
pub use state::AppState;
