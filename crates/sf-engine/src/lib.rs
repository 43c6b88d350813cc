pub mod autosave;
pub mod editor;
pub mod error;
pub mod events;
pub mod versions;

pub use crate::autosave::{AutoSave, AutoSaveError, AutoSaveOptions, AutoSaveStatus};
pub use crate::editor::{EditorSession, GenerationOutcome};
pub use crate::error::EngineError;
pub use crate::events::{EngineEvent, EventBus};
pub use crate::versions::VersionStore;
