//! Test management endpoints (`{project}/_apis/test/...`).

use super::client::{Scope, TfsClient};
use crate::error::ApiResult;
use crate::models::{ListResponse, TestPlan, TestRun, TestSuite};

impl TfsClient {
    pub async fn get_test_plans(&self) -> ApiResult<Vec<TestPlan>> {
        let url = self.endpoint(Scope::Project, &["test", "plans"], &[])?;
        let plans: ListResponse<TestPlan> = self.get_json(url).await?;
        Ok(plans.value)
    }

    pub async fn get_test_plan(&self, plan_id: i32) -> ApiResult<TestPlan> {
        let id = plan_id.to_string();
        let url = self.endpoint(Scope::Project, &["test", "plans", id.as_str()], &[])?;
        self.get_json(url).await
    }

    pub async fn get_test_suites(&self, plan_id: i32) -> ApiResult<Vec<TestSuite>> {
        let id = plan_id.to_string();
        let url = self.endpoint(
            Scope::Project,
            &["test", "plans", id.as_str(), "suites"],
            &[],
        )?;
        let suites: ListResponse<TestSuite> = self.get_json(url).await?;
        Ok(suites.value)
    }

    /// Test runs published against a build.
    pub async fn get_test_runs_for_build(&self, build_id: i32) -> ApiResult<Vec<TestRun>> {
        let build_uri = format!("vstfs:///Build/Build/{}", build_id);
        let url = self.endpoint(
            Scope::Project,
            &["test", "runs"],
            &[("buildUri", build_uri.as_str())],
        )?;
        let runs: ListResponse<TestRun> = self.get_json(url).await?;
        Ok(runs.value)
    }
}
