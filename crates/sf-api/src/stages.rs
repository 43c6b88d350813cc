use crate::error::{check, ApiError};
use crate::ApiClient;
use serde::Serialize;
use sf_core::types::{ProjectId, Stage, StageType, VersionId};
use std::collections::HashMap;

#[derive(Debug, Serialize)]
struct UpdateStageBody<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RestoreBody {
    version_id: VersionId,
}

/// Client for the stage HTTP resource. The server is the source of truth
/// for status transitions and version numbering; writes are last-write-wins.
pub struct StagesApi<'a> {
    pub(crate) client: &'a ApiClient,
}

impl StagesApi<'_> {
    pub async fn get(&self, project: ProjectId, stage: StageType) -> Result<Stage, ApiError> {
        let url = self
            .client
            .url(&format!("/projects/{project}/stages/{stage}"));
        let response = self.client.http().get(url).send().await?;
        Ok(check(response).await?.json().await?)
    }

    /// Idempotent overwrite. The server recomputes status and appends a
    /// manual-source version when the content actually changed.
    pub async fn update(
        &self,
        project: ProjectId,
        stage: StageType,
        content: &str,
    ) -> Result<Stage, ApiError> {
        let url = self
            .client
            .url(&format!("/projects/{project}/stages/{stage}"));
        let response = self
            .client
            .http()
            .put(url)
            .json(&UpdateStageBody { content })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Copies a historical snapshot's content into the live stage. Later
    /// versions are untouched; the server records the pre-restore content as
    /// a fresh manual version first.
    pub async fn restore(
        &self,
        project: ProjectId,
        stage: StageType,
        version: VersionId,
    ) -> Result<Stage, ApiError> {
        let url = self
            .client
            .url(&format!("/projects/{project}/stages/{stage}/restore"));
        let response = self
            .client
            .http()
            .post(url)
            .json(&RestoreBody {
                version_id: version,
            })
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }

    /// Fetches every stage of the project concurrently. Stages the server
    /// has no record for yet are simply absent from the map.
    pub async fn fetch_all(
        &self,
        project: ProjectId,
    ) -> Result<HashMap<StageType, Stage>, ApiError> {
        let fetches = StageType::ORDER
            .iter()
            .map(|stage| async move { (*stage, self.get(project, *stage).await) });
        let results = futures::future::join_all(fetches).await;

        let mut stages = HashMap::new();
        for (stage_type, result) in results {
            match result {
                Ok(stage) => {
                    stages.insert(stage_type, stage);
                }
                Err(ApiError::NotFound) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(stages)
    }
}
