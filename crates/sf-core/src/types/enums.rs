use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The fixed eight-step creative pipeline, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    Idea,
    Story,
    Script,
    Character,
    Scene,
    Storyboard,
    ImagePrompt,
    MotionPrompt,
}

impl StageType {
    pub const ORDER: [StageType; 8] = [
        StageType::Idea,
        StageType::Story,
        StageType::Script,
        StageType::Character,
        StageType::Scene,
        StageType::Storyboard,
        StageType::ImagePrompt,
        StageType::MotionPrompt,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageType::Idea => "idea",
            StageType::Story => "story",
            StageType::Script => "script",
            StageType::Character => "character",
            StageType::Scene => "scene",
            StageType::Storyboard => "storyboard",
            StageType::ImagePrompt => "image_prompt",
            StageType::MotionPrompt => "motion_prompt",
        }
    }

    /// Zero-based position in the fixed order.
    pub fn position(self) -> usize {
        Self::ORDER
            .iter()
            .position(|stage| *stage == self)
            .unwrap_or(0)
    }

    pub fn next(self) -> Option<StageType> {
        Self::ORDER.get(self.position() + 1).copied()
    }

    pub fn prev(self) -> Option<StageType> {
        self.position()
            .checked_sub(1)
            .and_then(|index| Self::ORDER.get(index))
            .copied()
    }
}

impl fmt::Display for StageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "idea" => Ok(StageType::Idea),
            "story" => Ok(StageType::Story),
            "script" => Ok(StageType::Script),
            "character" => Ok(StageType::Character),
            "scene" => Ok(StageType::Scene),
            "storyboard" => Ok(StageType::Storyboard),
            "image_prompt" => Ok(StageType::ImagePrompt),
            "motion_prompt" => Ok(StageType::MotionPrompt),
            other => Err(format!("unknown stage type: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Locked,
    Unlocked,
    InProgress,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    Manual,
    Ai,
}
