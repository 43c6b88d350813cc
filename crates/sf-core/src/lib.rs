pub mod compare;
pub mod error;
pub mod navigator;

pub mod types;

pub use crate::error::CoreError;
pub use crate::navigator::StageNavigator;
pub use crate::types::{ProjectId, Stage, StageId, StageStatus, StageType, StageVersion, VersionId};
