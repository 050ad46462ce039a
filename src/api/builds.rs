//! Build and build definition endpoints (`{project}/_apis/build/...`).

use reqwest::Method;
use std::collections::BTreeMap;
use tracing::info;

use super::client::{JSON, Scope, TfsClient};
use crate::error::{ApiError, ApiResult};
use crate::models::{
    Build, BuildArtifact, BuildDefinitionReference, DefinitionId, ListResponse,
    QueueBuildRequest, WorkItemReference,
};

impl TfsClient {
    /// Fetches a build by id.
    pub async fn get_build(&self, build_id: &str) -> ApiResult<Build> {
        let url = self.endpoint(Scope::Project, &["build", "builds", build_id], &[])?;
        self.get_json(url).await
    }

    /// Fetches the build's `status` (`inProgress`, `completed`, `notStarted`, ...).
    pub async fn get_build_status(&self, build_id: &str) -> ApiResult<String> {
        let build = self.get_build(build_id).await?;
        build.status.ok_or_else(|| missing(build_id, "status"))
    }

    /// Fetches the build's `result`; `None` until the build has finished.
    pub async fn get_build_result(&self, build_id: &str) -> ApiResult<Option<String>> {
        Ok(self.get_build(build_id).await?.result)
    }

    pub async fn get_build_number(&self, build_id: &str) -> ApiResult<String> {
        let build = self.get_build(build_id).await?;
        build
            .build_number
            .ok_or_else(|| missing(build_id, "buildNumber"))
    }

    /// The most recently finished build of a definition, if any.
    pub async fn get_latest_build(&self, definition_id: i32) -> ApiResult<Option<Build>> {
        let definition = definition_id.to_string();
        let url = self.endpoint(
            Scope::Project,
            &["build", "builds"],
            &[
                ("definitions", definition.as_str()),
                ("$top", "1"),
                ("queryOrder", "finishTimeDescending"),
            ],
        )?;
        let builds: ListResponse<Build> = self.get_json(url).await?;
        Ok(builds.value.into_iter().next())
    }

    pub async fn get_build_definitions(&self) -> ApiResult<Vec<BuildDefinitionReference>> {
        let url = self.endpoint(Scope::Project, &["build", "definitions"], &[])?;
        let definitions: ListResponse<BuildDefinitionReference> = self.get_json(url).await?;
        Ok(definitions.value)
    }

    /// Looks up a definition id by exact name.
    pub async fn get_build_definition_id(&self, name: &str) -> ApiResult<Option<i32>> {
        let url = self.endpoint(Scope::Project, &["build", "definitions"], &[("name", name)])?;
        let definitions: ListResponse<BuildDefinitionReference> = self.get_json(url).await?;
        Ok(definitions.value.first().map(|d| d.id))
    }

    /// Queues a build of `definition_id`.
    ///
    /// `parameters` become the JSON-encoded `parameters` string the build
    /// service expects; an empty slice sends none.
    pub async fn queue_build(
        &self,
        definition_id: i32,
        source_branch: Option<&str>,
        parameters: &[(String, String)],
    ) -> ApiResult<Build> {
        let url = self.endpoint(Scope::Project, &["build", "builds"], &[])?;
        let parameters = if parameters.is_empty() {
            None
        } else {
            let map: BTreeMap<&str, &str> = parameters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            Some(serde_json::to_string(&map).map_err(|e| ApiError::Decode {
                resource: url.path().to_string(),
                message: format!("failed to encode build parameters: {}", e),
            })?)
        };
        let body = QueueBuildRequest {
            definition: DefinitionId { id: definition_id },
            source_branch: source_branch.map(str::to_string),
            parameters,
        };

        let build: Build = self.send_json(Method::POST, url, JSON, &body).await?;
        info!(
            definition_id,
            build_id = build.id,
            build_number = build.build_number.as_deref().unwrap_or(""),
            "Queued build"
        );
        Ok(build)
    }

    pub async fn get_build_artifacts(&self, build_id: &str) -> ApiResult<Vec<BuildArtifact>> {
        let url = self.endpoint(
            Scope::Project,
            &["build", "builds", build_id, "artifacts"],
            &[],
        )?;
        let artifacts: ListResponse<BuildArtifact> = self.get_json(url).await?;
        Ok(artifacts.value)
    }

    /// Ids of work items associated with a build. Non-numeric ids are skipped.
    pub async fn get_build_work_item_ids(&self, build_id: &str) -> ApiResult<Vec<i32>> {
        let url = self.endpoint(
            Scope::Project,
            &["build", "builds", build_id, "workitems"],
            &[],
        )?;
        let refs: ListResponse<WorkItemReference> = self.get_json(url).await?;
        Ok(refs
            .value
            .iter()
            .filter_map(|r| r.id.parse::<i32>().ok())
            .collect())
    }
}

fn missing(build_id: &str, field: &'static str) -> ApiError {
    ApiError::MissingField {
        resource: format!("build {}", build_id),
        field,
    }
}
