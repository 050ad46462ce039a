//! TFVC endpoints: changesets and shelvesets (`{collection}/_apis/tfvc/...`).

use super::client::{Scope, TfsClient};
use crate::error::ApiResult;
use crate::models::{AssociatedWorkItem, Change, Changeset, ListResponse, ShelvesetReference};

impl TfsClient {
    pub async fn get_changeset(&self, changeset_id: i32) -> ApiResult<Changeset> {
        let id = changeset_id.to_string();
        let url = self.endpoint(Scope::Collection, &["tfvc", "changesets", id.as_str()], &[])?;
        self.get_json(url).await
    }

    /// Check-in comment of a changeset; `None` when none was given.
    pub async fn get_changeset_comment(&self, changeset_id: i32) -> ApiResult<Option<String>> {
        Ok(self.get_changeset(changeset_id).await?.comment)
    }

    pub async fn get_changeset_changes(&self, changeset_id: i32) -> ApiResult<Vec<Change>> {
        let id = changeset_id.to_string();
        let url = self.endpoint(
            Scope::Collection,
            &["tfvc", "changesets", id.as_str(), "changes"],
            &[],
        )?;
        let changes: ListResponse<Change> = self.get_json(url).await?;
        Ok(changes.value)
    }

    pub async fn get_changeset_work_items(
        &self,
        changeset_id: i32,
    ) -> ApiResult<Vec<AssociatedWorkItem>> {
        let id = changeset_id.to_string();
        let url = self.endpoint(
            Scope::Collection,
            &["tfvc", "changesets", id.as_str(), "workItems"],
            &[],
        )?;
        let items: ListResponse<AssociatedWorkItem> = self.get_json(url).await?;
        Ok(items.value)
    }

    /// Newest changeset touching `item_path` (e.g. `$/Fabrikam/Main`), or
    /// `None` when the path has no history.
    pub async fn get_latest_changeset(&self, item_path: &str) -> ApiResult<Option<Changeset>> {
        let url = self.endpoint(
            Scope::Collection,
            &["tfvc", "changesets"],
            &[("searchCriteria.itemPath", item_path), ("$top", "1")],
        )?;
        let changesets: ListResponse<Changeset> = self.get_json(url).await?;
        Ok(changesets.value.into_iter().next())
    }

    /// Shelvesets, optionally restricted to one owner.
    pub async fn get_shelvesets(&self, owner: Option<&str>) -> ApiResult<Vec<ShelvesetReference>> {
        let query: Vec<(&str, &str)> = owner
            .map(|o| vec![("requestData.owner", o)])
            .unwrap_or_default();
        let url = self.endpoint(Scope::Collection, &["tfvc", "shelvesets"], &query)?;
        let shelvesets: ListResponse<ShelvesetReference> = self.get_json(url).await?;
        Ok(shelvesets.value)
    }

    pub async fn get_shelveset(&self, name: &str, owner: &str) -> ApiResult<ShelvesetReference> {
        let shelveset_id = shelveset_id(name, owner);
        let url = self.endpoint(
            Scope::Collection,
            &["tfvc", "shelvesets", "shelveset"],
            &[("shelvesetId", shelveset_id.as_str())],
        )?;
        self.get_json(url).await
    }

    pub async fn get_shelveset_changes(&self, name: &str, owner: &str) -> ApiResult<Vec<Change>> {
        let shelveset_id = shelveset_id(name, owner);
        let url = self.endpoint(
            Scope::Collection,
            &["tfvc", "shelvesets", "changes"],
            &[("shelvesetId", shelveset_id.as_str())],
        )?;
        let changes: ListResponse<Change> = self.get_json(url).await?;
        Ok(changes.value)
    }
}

/// Shelvesets are addressed as `{name};{owner}`.
fn shelveset_id(name: &str, owner: &str) -> String {
    format!("{};{}", name, owner)
}

#[cfg(test)]
mod tests {
    use super::shelveset_id;
    use crate::api::test_support::{query, test_client};
    use crate::error::ApiError;
    use mockito::Server;
    use serde_json::json;

    const TFVC: &str = "/tfs/DefaultCollection/_apis/tfvc";

    #[test]
    fn test_shelveset_id_format() {
        assert_eq!(shelveset_id("Hotfix", "CONTOSO\\jdoe"), "Hotfix;CONTOSO\\jdoe");
    }

    /// # Changeset Lookups
    ///
    /// Tests that changeset calls are collection scoped and decode the
    /// comment, the changes and the associated work items.
    ///
    /// ## Expected Outcome
    /// - No project segment in the path
    /// - A missing comment reads as None
    #[tokio::test]
    async fn test_changeset_lookups() {
        let mut server = Server::new_async().await;
        let _changeset = server
            .mock("GET", format!("{}/changesets/1234", TFVC).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(
                json!({
                    "changesetId": 1234,
                    "author": {"displayName": "Jamie Doe", "uniqueName": "CONTOSO\\jdoe"},
                    "createdDate": "2024-03-01T10:00:00Z",
                    "comment": "Fix installer path"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let _silent = server
            .mock("GET", format!("{}/changesets/1235", TFVC).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(json!({"changesetId": 1235}).to_string())
            .create_async()
            .await;
        let _changes = server
            .mock("GET", format!("{}/changesets/1234/changes", TFVC).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(
                json!({"count": 1, "value": [{
                    "item": {"path": "$/Fabrikam/Main/setup.iss", "version": 1234},
                    "changeType": "edit"
                }]})
                .to_string(),
            )
            .create_async()
            .await;
        let _work_items = server
            .mock("GET", format!("{}/changesets/1234/workItems", TFVC).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(
                json!({"count": 1, "value": [{
                    "id": 77, "title": "Installer fails", "state": "Resolved",
                    "workItemType": "Bug", "assignedTo": "Jamie Doe"
                }]})
                .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let changeset = client.get_changeset(1234).await.unwrap();
        assert_eq!(changeset.author.unwrap().name(), "Jamie Doe");
        assert_eq!(
            client.get_changeset_comment(1234).await.unwrap().as_deref(),
            Some("Fix installer path")
        );
        assert_eq!(client.get_changeset_comment(1235).await.unwrap(), None);

        let changes = client.get_changeset_changes(1234).await.unwrap();
        assert_eq!(changes[0].item.path.as_deref(), Some("$/Fabrikam/Main/setup.iss"));
        assert_eq!(changes[0].change_type.as_deref(), Some("edit"));

        let items = client.get_changeset_work_items(1234).await.unwrap();
        assert_eq!(items[0].id, 77);
        assert_eq!(items[0].work_item_type.as_deref(), Some("Bug"));
    }

    /// # Latest Changeset
    ///
    /// Tests that an empty history is distinguishable from a failed lookup.
    ///
    /// ## Test Scenario
    /// - One path has a changeset, one has none, one returns 404
    ///
    /// ## Expected Outcome
    /// - Some(changeset), None and NotFound respectively
    #[tokio::test]
    async fn test_latest_changeset_empty_history_vs_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{}/changesets", TFVC).as_str())
            .match_query(query(&[
                ("searchCriteria.itemPath", "$/Fabrikam/Empty"),
                ("$top", "1"),
            ]))
            .with_status(200)
            .with_body(json!({"count": 0, "value": []}).to_string())
            .create_async()
            .await;

        let _main = server
            .mock("GET", format!("{}/changesets", TFVC).as_str())
            .match_query(query(&[
                ("searchCriteria.itemPath", "$/Fabrikam/Main"),
                ("$top", "1"),
            ]))
            .with_status(200)
            .with_body(
                json!({"count": 1, "value": [{"changesetId": 1240, "comment": "Bump version"}]})
                    .to_string(),
            )
            .create_async()
            .await;
        let _missing = server
            .mock("GET", format!("{}/changesets", TFVC).as_str())
            .match_query(query(&[
                ("searchCriteria.itemPath", "$/Nowhere"),
                ("$top", "1"),
            ]))
            .with_status(404)
            .with_body(r#"{"message":"TF14019: The path $/Nowhere does not exist"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let latest = client.get_latest_changeset("$/Fabrikam/Main").await.unwrap();
        assert_eq!(latest.map(|c| c.changeset_id), Some(1240));

        let empty = client.get_latest_changeset("$/Fabrikam/Empty").await.unwrap();
        assert!(empty.is_none());

        let err = client.get_latest_changeset("$/Nowhere").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound { .. }));
    }

    /// # Shelveset Queries
    ///
    /// Tests owner filtering and `{name};{owner}` addressing.
    ///
    /// ## Expected Outcome
    /// - requestData.owner only sent when an owner is given
    /// - shelvesetId carries name and owner joined by a semicolon
    /// - A single shelveset is read from shelvesets/shelveset, not the list
    #[tokio::test]
    async fn test_shelveset_queries() {
        let mut server = Server::new_async().await;
        let _by_owner = server
            .mock("GET", format!("{}/shelvesets", TFVC).as_str())
            .match_query(query(&[("requestData.owner", "CONTOSO\\jdoe")]))
            .with_status(200)
            .with_body(
                json!({"count": 1, "value": [{
                    "id": "Hotfix;abc-123", "name": "Hotfix",
                    "owner": {"displayName": "Jamie Doe"}
                }]})
                .to_string(),
            )
            .create_async()
            .await;
        let single = server
            .mock("GET", format!("{}/shelvesets/shelveset", TFVC).as_str())
            .match_query(query(&[("shelvesetId", "Hotfix;CONTOSO\\jdoe")]))
            .with_status(200)
            .with_body(
                json!({"id": "Hotfix;abc-123", "name": "Hotfix", "comment": "wip"}).to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let _changes = server
            .mock("GET", format!("{}/shelvesets/changes", TFVC).as_str())
            .match_query(query(&[("shelvesetId", "Hotfix;CONTOSO\\jdoe")]))
            .with_status(200)
            .with_body(
                json!({"count": 1, "value": [{"item": {"path": "$/Fabrikam/Main/a.cs"}, "changeType": "add"}]})
                    .to_string(),
            )
            .create_async()
            .await;

        let client = test_client(&server.url());
        let list = client.get_shelvesets(Some("CONTOSO\\jdoe")).await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Hotfix");

        let shelveset = client.get_shelveset("Hotfix", "CONTOSO\\jdoe").await.unwrap();
        assert_eq!(shelveset.comment.as_deref(), Some("wip"));
        single.assert_async().await;

        let changes = client
            .get_shelveset_changes("Hotfix", "CONTOSO\\jdoe")
            .await
            .unwrap();
        assert_eq!(changes[0].change_type.as_deref(), Some("add"));
    }
}
