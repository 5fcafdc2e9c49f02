//! Tool adapters: the deterministic, side-effecting half of the pipeline.
//!
//! Extract and load are trait seams with in-process reference
//! implementations; transformation is a pure in-process engine applying
//! allow-listed actions to the working dataset.

mod extract;
mod load;
mod transform;

pub use extract::{ExtractTool, JsonRecordsSource};
pub use load::{LoadTool, MemorySink};
pub use transform::{apply_action, AppliedAction};
