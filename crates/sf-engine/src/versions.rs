use sf_api::{ApiClient, ApiError};
use sf_core::compare::VersionCompare;
use sf_core::{CoreError, ProjectId, StageType, StageVersion, VersionId};
use tokio::sync::watch;

/// Cached version history for one stage.
///
/// The backend owns version numbering and restore snapshots, so every
/// mutation here re-fetches the list instead of patching the cache. The
/// list is held oldest-first.
pub struct VersionStore {
    client: ApiClient,
    project: ProjectId,
    stage: StageType,
    versions: watch::Sender<Vec<StageVersion>>,
}

impl VersionStore {
    pub fn new(client: ApiClient, project: ProjectId, stage: StageType) -> Self {
        let (versions, _) = watch::channel(Vec::new());
        Self {
            client,
            project,
            stage,
            versions,
        }
    }

    pub fn versions(&self) -> Vec<StageVersion> {
        self.versions.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<Vec<StageVersion>> {
        self.versions.subscribe()
    }

    pub async fn refresh(&self) -> Result<Vec<StageVersion>, ApiError> {
        let listed = self
            .client
            .versions()
            .list(self.project, self.stage)
            .await?;
        self.versions.send_replace(listed.clone());
        Ok(listed)
    }

    pub async fn rename(&self, version: VersionId, label: &str) -> Result<(), ApiError> {
        self.client
            .versions()
            .rename(self.project, self.stage, version, label)
            .await?;
        self.refresh().await?;
        Ok(())
    }

    pub async fn delete(&self, version: VersionId) -> Result<(), ApiError> {
        self.client
            .versions()
            .delete(self.project, self.stage, version)
            .await?;
        self.refresh().await?;
        Ok(())
    }

    /// Side-by-side comparison over the cached list. Fails with
    /// [`CoreError::VersionNotFound`] when either id is not cached;
    /// callers refresh first when in doubt.
    pub fn compare(&self, left: VersionId, right: VersionId) -> Result<VersionCompare, CoreError> {
        VersionCompare::new(self.versions.borrow().clone(), left, right)
    }
}
