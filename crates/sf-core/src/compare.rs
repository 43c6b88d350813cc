use crate::error::CoreError;
use crate::types::diff::{DiffKind, DiffRun};
use crate::types::ids::VersionId;
use crate::types::stage::StageVersion;
use similar::{ChangeTag, TextDiff};

/// Line-granularity diff between two snapshots, grouped into maximal runs of
/// one kind. Removed lines come from `old`, added lines from `new`.
pub fn diff_lines(old: &str, new: &str) -> Vec<DiffRun> {
    let diff = TextDiff::from_lines(old, new);
    let mut runs: Vec<DiffRun> = Vec::new();
    for change in diff.iter_all_changes() {
        let kind = match change.tag() {
            ChangeTag::Equal => DiffKind::Unchanged,
            ChangeTag::Delete => DiffKind::Removed,
            ChangeTag::Insert => DiffKind::Added,
        };
        let value = change.value();
        let line = value.strip_suffix('\n').unwrap_or(value);
        let line = line.strip_suffix('\r').unwrap_or(line).to_string();
        match runs.last_mut() {
            Some(run) if run.kind == kind => run.lines.push(line),
            _ => runs.push(DiffRun {
                kind,
                lines: vec![line],
            }),
        }
    }
    runs
}

/// Two-slot rotating selection for picking a comparison pair. The first
/// click fills slot A, the second fills slot B, and any further distinct
/// click replaces slot B. Clicking a selected version deselects it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompareSelection {
    slots: Vec<VersionId>,
}

impl CompareSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self, id: VersionId) {
        if let Some(index) = self.slots.iter().position(|slot| *slot == id) {
            self.slots.remove(index);
        } else if self.slots.len() < 2 {
            self.slots.push(id);
        } else {
            self.slots[1] = id;
        }
    }

    pub fn contains(&self, id: VersionId) -> bool {
        self.slots.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The chosen pair once both slots are filled.
    pub fn pair(&self) -> Option<(VersionId, VersionId)> {
        match self.slots.as_slice() {
            [first, second] => Some((*first, *second)),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Prev,
    Next,
}

/// An open comparison over an already-fetched, ascending version list.
/// Either side steps independently to the adjacent version; stepping past
/// an end is a no-op.
#[derive(Debug, Clone)]
pub struct VersionCompare {
    versions: Vec<StageVersion>,
    left: usize,
    right: usize,
}

impl VersionCompare {
    pub fn new(
        versions: Vec<StageVersion>,
        left: VersionId,
        right: VersionId,
    ) -> Result<Self, CoreError> {
        let position = |id: VersionId| {
            versions
                .iter()
                .position(|version| version.id == id)
                .ok_or(CoreError::VersionNotFound)
        };
        let left = position(left)?;
        let right = position(right)?;
        Ok(Self {
            versions,
            left,
            right,
        })
    }

    pub fn left(&self) -> &StageVersion {
        &self.versions[self.left]
    }

    pub fn right(&self) -> &StageVersion {
        &self.versions[self.right]
    }

    pub fn can_step(&self, side: CompareSide, direction: StepDirection) -> bool {
        let index = match side {
            CompareSide::Left => self.left,
            CompareSide::Right => self.right,
        };
        match direction {
            StepDirection::Prev => index > 0,
            StepDirection::Next => index + 1 < self.versions.len(),
        }
    }

    /// Returns whether the side moved.
    pub fn step(&mut self, side: CompareSide, direction: StepDirection) -> bool {
        if !self.can_step(side, direction) {
            return false;
        }
        let index = match side {
            CompareSide::Left => &mut self.left,
            CompareSide::Right => &mut self.right,
        };
        match direction {
            StepDirection::Prev => *index -= 1,
            StepDirection::Next => *index += 1,
        }
        true
    }

    pub fn diff(&self) -> Vec<DiffRun> {
        diff_lines(&self.left().content, &self.right().content)
    }
}
