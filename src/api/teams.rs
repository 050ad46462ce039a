//! Core endpoints: team projects and teams (`{collection}/_apis/projects/...`).

use super::client::{Scope, TfsClient};
use crate::error::ApiResult;
use crate::models::{IdentityRef, ListResponse, TeamMemberEntry, TeamProjectReference, WebApiTeam};

impl TfsClient {
    /// All team projects in the collection.
    pub async fn get_projects(&self) -> ApiResult<Vec<TeamProjectReference>> {
        let url = self.endpoint(Scope::Collection, &["projects"], &[])?;
        let projects: ListResponse<TeamProjectReference> = self.get_json(url).await?;
        Ok(projects.value)
    }

    /// Teams of the configured project.
    pub async fn get_teams(&self) -> ApiResult<Vec<WebApiTeam>> {
        let url = self.endpoint(
            Scope::Collection,
            &["projects", self.project(), "teams"],
            &[],
        )?;
        let teams: ListResponse<WebApiTeam> = self.get_json(url).await?;
        Ok(teams.value)
    }

    /// Members of `team` (name or id) in the configured project.
    pub async fn get_team_members(&self, team: &str) -> ApiResult<Vec<IdentityRef>> {
        let url = self.endpoint(
            Scope::Collection,
            &["projects", self.project(), "teams", team, "members"],
            &[],
        )?;
        let members: ListResponse<TeamMemberEntry> = self.get_json(url).await?;
        Ok(members.value.into_iter().map(IdentityRef::from).collect())
    }
}
