//! Work item tracking endpoints (`{collection}/_apis/wit/workitems/...`).

use reqwest::Method;
use serde_json::Value;
use tracing::info;

use super::client::{JSON_PATCH, Scope, TfsClient};
use crate::error::ApiResult;
use crate::models::{JsonPatchOperation, WorkItem};

const TITLE_FIELD: &str = "System.Title";
const STATE_FIELD: &str = "System.State";

impl TfsClient {
    pub async fn get_work_item(&self, id: i32) -> ApiResult<WorkItem> {
        let id = id.to_string();
        let url = self.endpoint(Scope::Collection, &["wit", "workitems", id.as_str()], &[])?;
        self.get_json(url).await
    }

    /// `None` when the item has no `System.Title`.
    pub async fn get_work_item_title(&self, id: i32) -> ApiResult<Option<String>> {
        let item = self.get_work_item(id).await?;
        Ok(item.field_str(TITLE_FIELD).map(str::to_string))
    }

    pub async fn get_work_item_state(&self, id: i32) -> ApiResult<Option<String>> {
        let item = self.get_work_item(id).await?;
        Ok(item.field_str(STATE_FIELD).map(str::to_string))
    }

    /// Sets one field with a single JSON-patch `add` operation and returns
    /// the updated work item.
    pub async fn update_work_item_field(
        &self,
        id: i32,
        field: &str,
        value: Value,
    ) -> ApiResult<WorkItem> {
        let id_segment = id.to_string();
        let url = self.endpoint(
            Scope::Collection,
            &["wit", "workitems", id_segment.as_str()],
            &[],
        )?;
        let patch = [JsonPatchOperation {
            op: "add",
            path: format!("/fields/{}", field),
            value,
        }];

        let item: WorkItem = self
            .send_json(Method::PATCH, url, JSON_PATCH, &patch[..])
            .await?;
        info!(work_item = id, field, rev = ?item.rev, "Updated work item field");
        Ok(item)
    }

    pub async fn update_work_item_state(&self, id: i32, state: &str) -> ApiResult<WorkItem> {
        self.update_work_item_field(id, STATE_FIELD, Value::String(state.to_string()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{query, test_client};
    use crate::error::ApiError;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const WORK_ITEMS: &str = "/tfs/DefaultCollection/_apis/wit/workitems";

    #[tokio::test]
    async fn test_title_and_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{}/77", WORK_ITEMS).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(
                json!({
                    "id": 77,
                    "rev": 4,
                    "fields": {
                        "System.Title": "Installer fails on clean machine",
                        "System.State": "Active",
                        "System.WorkItemType": "Bug"
                    }
                })
                .to_string(),
            )
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server.url());
        assert_eq!(
            client.get_work_item_title(77).await.unwrap().as_deref(),
            Some("Installer fails on clean machine")
        );
        assert_eq!(
            client.get_work_item_state(77).await.unwrap().as_deref(),
            Some("Active")
        );
    }

    #[tokio::test]
    async fn test_missing_title_reads_as_none() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", format!("{}/78", WORK_ITEMS).as_str())
            .match_query(query(&[]))
            .with_status(200)
            .with_body(json!({"id": 78, "fields": {}}).to_string())
            .expect(2)
            .create_async()
            .await;

        let client = test_client(&server.url());
        assert_eq!(client.get_work_item_title(78).await.unwrap(), None);
        assert_eq!(client.get_work_item_state(78).await.unwrap(), None);
    }

    /// # State Update
    ///
    /// Tests the JSON-patch request issued by update_work_item_state.
    ///
    /// ## Test Scenario
    /// - Move work item 77 to Resolved
    ///
    /// ## Expected Outcome
    /// - PATCH with application/json-patch+json
    /// - Body is a single `add` on /fields/System.State
    #[tokio::test]
    async fn test_update_state_sends_json_patch() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("PATCH", format!("{}/77", WORK_ITEMS).as_str())
            .match_query(query(&[]))
            .match_header("content-type", "application/json-patch+json")
            .match_body(Matcher::Json(json!([
                {"op": "add", "path": "/fields/System.State", "value": "Resolved"}
            ])))
            .with_status(200)
            .with_body(
                json!({"id": 77, "rev": 5, "fields": {"System.State": "Resolved"}}).to_string(),
            )
            .expect(1)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let item = client.update_work_item_state(77, "Resolved").await.unwrap();
        assert_eq!(item.state(), Some("Resolved"));
        assert_eq!(item.rev, Some(5));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rejected_update_surfaces_server_message() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("PATCH", format!("{}/77", WORK_ITEMS).as_str())
            .match_query(Matcher::Any)
            .with_status(400)
            .with_body(r#"{"message":"TF401320: Rule Error for field State"}"#)
            .create_async()
            .await;

        let client = test_client(&server.url());
        let err = client
            .update_work_item_field(77, "System.State", json!("Bogus"))
            .await
            .unwrap_err();
        match err {
            ApiError::RequestFailed { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("TF401320"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
