pub mod error;
pub mod identity;
pub mod loader;
pub mod orchestrator;
pub mod source;
pub mod transform;

pub use error::PipelineError;
pub use identity::IdentityResolver;
pub use orchestrator::{run, run_import, EntitySummary, ImportSummary};
