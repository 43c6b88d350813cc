use crate::error::{check, ApiError};
use crate::ApiClient;
use serde::{Deserialize, Serialize};
use sf_core::types::{ProjectId, StageType, StageVersion, VersionId};

#[derive(Debug, Deserialize)]
struct VersionListResponse {
    items: Vec<StageVersion>,
}

#[derive(Debug, Serialize)]
struct RenameBody<'a> {
    label: &'a str,
}

/// Client for the version HTTP resource. Snapshots are immutable except for
/// their label; ordering is owned by the server.
pub struct VersionsApi<'a> {
    pub(crate) client: &'a ApiClient,
}

impl VersionsApi<'_> {
    /// Returns versions ascending by version number. The wire list arrives
    /// newest-first; normalize here so callers index by creation order.
    pub async fn list(
        &self,
        project: ProjectId,
        stage: StageType,
    ) -> Result<Vec<StageVersion>, ApiError> {
        let url = self
            .client
            .url(&format!("/projects/{project}/stages/{stage}/versions"));
        let response = self.client.http().get(url).send().await?;
        let mut items = check(response)
            .await?
            .json::<VersionListResponse>()
            .await?
            .items;
        items.sort_by_key(|version| version.version_number);
        Ok(items)
    }

    pub async fn rename(
        &self,
        project: ProjectId,
        stage: StageType,
        version: VersionId,
        label: &str,
    ) -> Result<(), ApiError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ApiError::InvalidInput {
                message: "label must not be empty".to_string(),
            });
        }
        let url = self.client.url(&format!(
            "/projects/{project}/stages/{stage}/versions/{version}"
        ));
        let response = self
            .client
            .http()
            .put(url)
            .json(&RenameBody { label })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    pub async fn delete(
        &self,
        project: ProjectId,
        stage: StageType,
        version: VersionId,
    ) -> Result<(), ApiError> {
        let url = self.client.url(&format!(
            "/projects/{project}/stages/{stage}/versions/{version}"
        ));
        let response = self.client.http().delete(url).send().await?;
        check(response).await?;
        Ok(())
    }
}
