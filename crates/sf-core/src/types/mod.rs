pub mod diff;
pub mod enums;
pub mod ids;
pub mod stage;

pub use diff::{DiffKind, DiffRun};
pub use enums::{StageStatus, StageType, VersionSource};
pub use ids::{ProjectId, StageId, VersionId};
pub use stage::{Stage, StageVersion};
