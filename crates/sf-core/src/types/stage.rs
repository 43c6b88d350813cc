use crate::types::enums::{StageStatus, StageType, VersionSource};
use crate::types::ids::{ProjectId, StageId, VersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The live content record for one (project, stage type) pair. The server
/// owns status transitions and version numbering; the client only ever
/// submits new content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub id: StageId,
    pub project_id: ProjectId,
    pub stage_type: StageType,
    pub status: StageStatus,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub last_ai_model: Option<String>,
    #[serde(default)]
    pub last_ai_params: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable content snapshot. Only `label` may change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageVersion {
    pub id: VersionId,
    pub stage_id: StageId,
    pub version_number: i64,
    pub content: String,
    pub source: VersionSource,
    #[serde(default)]
    pub ai_model: Option<String>,
    #[serde(default)]
    pub ai_params: Option<Value>,
    #[serde(default)]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StageVersion {
    /// Label when set, otherwise "version N".
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.is_empty() => label.clone(),
            _ => format!("version {}", self.version_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_deserializes_from_wire_shape() {
        let json = r#"{
            "id": 7,
            "project_id": 3,
            "stage_type": "story",
            "status": "in_progress",
            "content": "once upon a time",
            "last_ai_model": "gpt-4o",
            "created_at": "2025-01-01T00:00:00Z",
            "updated_at": "2025-01-02T00:00:00Z"
        }"#;
        let stage: Stage = serde_json::from_str(json).unwrap();
        assert_eq!(stage.id, StageId(7));
        assert_eq!(stage.stage_type, StageType::Story);
        assert_eq!(stage.status, StageStatus::InProgress);
        assert_eq!(stage.content, "once upon a time");
        assert_eq!(stage.last_ai_model.as_deref(), Some("gpt-4o"));
        assert!(stage.last_ai_params.is_none());
    }

    #[test]
    fn version_display_name_prefers_label() {
        let json = r#"{
            "id": 1,
            "stage_id": 7,
            "version_number": 4,
            "content": "draft",
            "source": "manual",
            "created_at": "2025-01-01T00:00:00Z"
        }"#;
        let mut version: StageVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.display_name(), "version 4");
        version.label = Some("final cut".to_string());
        assert_eq!(version.display_name(), "final cut");
        version.label = Some(String::new());
        assert_eq!(version.display_name(), "version 4");
    }
}
