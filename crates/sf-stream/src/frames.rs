use serde::{Deserialize, Serialize};
use sf_core::types::{ProjectId, StageType};

/// The single initiation frame sent after the connection opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub project_id: ProjectId,
    pub stage_type: StageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_prompt: Option<String>,
}

impl GenerateRequest {
    pub fn new(project_id: ProjectId, stage_type: StageType) -> Self {
        Self {
            project_id,
            stage_type,
            settings_id: None,
            custom_prompt: None,
        }
    }
}

/// Inbound frames, discriminated by the `type` field. The server signals
/// completion as `done`; an older protocol revision used `complete`. Error
/// frames carry the message under `error` or `message`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    Token {
        content: String,
    },
    #[serde(alias = "complete")]
    Done,
    Error {
        #[serde(alias = "message")]
        error: String,
    },
}
