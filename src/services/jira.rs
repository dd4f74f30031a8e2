//! Jira
//!
//! Basic auth against an organization's Jira cloud site, plus the service
//! desk helpers used to file issues on behalf of a reporter.

use crate::client::request::RequestOptions;
use crate::client::response::{self, RawResponse};
use crate::client::service::{Service, SessionConfig};
use crate::client::HttpClient;
use crate::config::settings::require;
use crate::config::{HttpSettings, JiraConfig};
use crate::error::{Result, StacError};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::info;

const SERVICE_DESK_ENDPOINT: &str = "rest/servicedeskapi/servicedesk";

pub struct JiraService {
    api_user: String,
    api_key: String,
    base_url: String,
}

impl JiraService {
    pub fn new(
        api_user: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_user: api_user.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &JiraConfig) -> Result<Self> {
        Ok(Self::new(
            require(&config.api_user, "jira", "api_user", "JIRA_API_USER")?,
            require(&config.api_key, "jira", "api_key", "JIRA_API_KEY")?,
            require(&config.base_url, "jira", "base_url", "JIRA_BASE_URL")?,
        ))
    }
}

#[async_trait]
impl Service for JiraService {
    fn name(&self) -> &str {
        "jira"
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn create_session(&self, _http: &reqwest::Client) -> Result<SessionConfig> {
        Ok(SessionConfig::new()
            .header("X-Atlassian-Token", "nocheck")
            .header("Accept", "application/json")
            .basic_auth(&self.api_user, &self.api_key))
    }

    /// Undecodable bodies become `{"errors": <reason>}`
    fn transform_response(&self, response: &RawResponse, use_snake_case: bool) -> Result<Value> {
        let data = match response::decode_body(response) {
            Ok(Value::Null) => Value::Object(Map::new()),
            Ok(data) => data,
            Err(e) => json!({"errors": e.to_string()}),
        };
        Ok(response::reshape(data, use_snake_case))
    }
}

/// What to file and who reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    /// Project key of the service desk, e.g. `"HELP"`
    pub jira_board: String,
    pub summary: String,
    pub reporter_email: String,
    pub reporter_first_name: String,
    pub reporter_last_name: String,
    /// Issue type name, `"Task"` unless set
    pub issue_type: String,
    /// Account ID of the reporter; looked up (or created) by email when unset
    pub reporter_id: Option<String>,
}

impl NewIssue {
    pub fn new(jira_board: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            jira_board: jira_board.into(),
            summary: summary.into(),
            reporter_email: String::new(),
            reporter_first_name: String::new(),
            reporter_last_name: String::new(),
            issue_type: "Task".to_string(),
            reporter_id: None,
        }
    }

    pub fn reporter(
        mut self,
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.reporter_email = email.into();
        self.reporter_first_name = first_name.into();
        self.reporter_last_name = last_name.into();
        self
    }

    pub fn reporter_id(mut self, reporter_id: impl Into<String>) -> Self {
        self.reporter_id = Some(reporter_id.into());
        self
    }

    pub fn issue_type(mut self, issue_type: impl Into<String>) -> Self {
        self.issue_type = issue_type.into();
        self
    }
}

pub type JiraClient = HttpClient<JiraService>;

impl JiraClient {
    pub fn from_config(config: &JiraConfig, settings: HttpSettings) -> Result<Self> {
        Ok(HttpClient::new(JiraService::from_config(config)?, settings))
    }

    pub fn issue_url(issue_key: &str) -> String {
        format!("rest/api/3/issue/{}", issue_key)
    }

    pub fn issue_transitions_url(issue_key: &str) -> String {
        format!("{}/transitions", Self::issue_url(issue_key))
    }

    /// Issue types available in a project
    pub async fn get_issue_types(&self, project_id: &str) -> Result<Vec<Value>> {
        let response = self
            .get(
                "rest/api/3/issuetype/project",
                RequestOptions::new().param("projectId", project_id),
            )
            .await?;
        Ok(as_list(response.data))
    }

    pub async fn get_service_desks(&self) -> Result<Value> {
        Ok(self.get(SERVICE_DESK_ENDPOINT, RequestOptions::new()).await?.data)
    }

    /// Account ID of the user with `email`, creating a service desk
    /// customer when none exists
    pub async fn find_or_create_user(
        &self,
        email: &str,
        first_name: &str,
        last_name: &str,
    ) -> Result<String> {
        let existing = self
            .get("rest/api/3/user/search", RequestOptions::new().param("query", email))
            .await?;

        if let Some(account_id) = as_list(existing.data)
            .first()
            .and_then(|user| user.get("accountId"))
            .and_then(Value::as_str)
        {
            return Ok(account_id.to_string());
        }

        info!("Creating Jira customer for {}", email);
        let created = self
            .post(
                "rest/servicedeskapi/customer",
                RequestOptions::new().json(json!({
                    "email": email,
                    "displayName": format!("{} {}", first_name, last_name),
                })),
            )
            .await?;

        created
            .get("accountId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StacError::Response(format!("No accountId for new customer {}", email)))
    }

    /// Resolve the service desk, issue type and reporter into a create-issue payload
    pub async fn build_create_issue_payload(&self, issue: &NewIssue) -> Result<Value> {
        let desks = self.get_service_desks().await?;
        let matching: Vec<&Value> = desks
            .get("values")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter(|desk| desk.get("projectKey").and_then(Value::as_str) == Some(issue.jira_board.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        let [desk] = matching.as_slice() else {
            return Err(StacError::Response(format!(
                "Could not find a single service desk matching key '{}'",
                issue.jira_board
            )));
        };
        let project_id = desk
            .get("projectId")
            .map(value_to_string)
            .unwrap_or_default();

        let issue_types = self.get_issue_types(&project_id).await?;
        let matching: Vec<&Value> = issue_types
            .iter()
            .filter(|t| t.get("name").and_then(Value::as_str) == Some(issue.issue_type.as_str()))
            .collect();

        let [issue_type] = matching.as_slice() else {
            return Err(StacError::Response(format!(
                "Could not find a single issue type matching '{}' in this service desk",
                issue.issue_type
            )));
        };

        let reporter_id = match &issue.reporter_id {
            Some(id) => id.clone(),
            None => {
                self.find_or_create_user(
                    &issue.reporter_email,
                    &issue.reporter_first_name,
                    &issue.reporter_last_name,
                )
                .await?
            }
        };

        Ok(json!({
            "fields": {
                "summary": issue.summary,
                "issuetype": {"id": issue_type.get("id").cloned().unwrap_or(Value::Null)},
                "project": {"id": project_id},
                "reporter": {"id": reporter_id},
            }
        }))
    }

    pub async fn create_issue(&self, payload: Value) -> Result<Value> {
        Ok(self
            .post("rest/api/3/issue", RequestOptions::new().json(payload))
            .await?
            .data)
    }

    pub async fn get_issue(&self, issue_key: &str) -> Result<Value> {
        Ok(self.get(&Self::issue_url(issue_key), RequestOptions::new()).await?.data)
    }

    pub async fn transition_issue(&self, issue_key: &str, transition_id: &str) -> Result<()> {
        self.post(
            &Self::issue_transitions_url(issue_key),
            RequestOptions::new().json(json!({"transition": {"id": transition_id}})),
        )
        .await?;
        Ok(())
    }

    /// Move an issue to the status called `status_name`
    ///
    /// Does nothing when the issue is already there.
    pub async fn transition_issue_by_name(&self, issue_key: &str, status_name: &str) -> Result<()> {
        let issue = self.get_issue(issue_key).await?;
        if issue.pointer("/fields/status/name").and_then(Value::as_str) == Some(status_name) {
            info!("{} already in status '{}'", issue_key, status_name);
            return Ok(());
        }

        let transitions = self
            .get(&Self::issue_transitions_url(issue_key), RequestOptions::new())
            .await?;
        let transition_id = transitions
            .get("transitions")
            .and_then(Value::as_array)
            .and_then(|list| {
                list.iter()
                    .find(|t| t.pointer("/to/name").and_then(Value::as_str) == Some(status_name))
            })
            .and_then(|t| t.get("id"))
            .map(value_to_string)
            .ok_or_else(|| {
                StacError::Response(format!("No transition to '{}' for {}", status_name, issue_key))
            })?;

        self.transition_issue(issue_key, &transition_id).await
    }
}

fn as_list(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn client(url: &str) -> JiraClient {
        HttpClient::new(JiraService::new("foo", "bar", url), HttpSettings::default())
    }

    #[test]
    fn test_issue_urls() {
        assert_eq!(JiraClient::issue_url("ABC-1"), "rest/api/3/issue/ABC-1");
        assert_eq!(
            JiraClient::issue_transitions_url("ABC-1"),
            "rest/api/3/issue/ABC-1/transitions"
        );
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let config = JiraConfig {
            api_user: Some("foo".to_string()),
            api_key: Some("bar".to_string()),
            base_url: None,
        };
        let err = JiraClient::from_config(&config, HttpSettings::default()).err().unwrap();
        assert!(matches!(err, StacError::MissingCredential { ref field, .. } if field == "base_url"));
    }

    #[tokio::test]
    async fn test_session_headers_and_raw_keys() {
        let mut server = mockito::Server::new_async().await;
        // base64("foo:bar")
        let mock = server
            .mock("GET", "/rest/api/3/issue/ABC-1")
            .match_header("authorization", "Basic Zm9vOmJhcg==")
            .match_header("x-atlassian-token", "nocheck")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_body(r#"{"fooBar": "spam"}"#)
            .create_async()
            .await;

        let issue = client(&server.url()).get_issue("ABC-1").await.unwrap();

        mock.assert_async().await;
        assert_eq!(issue, json!({"fooBar": "spam"}));
    }

    #[tokio::test]
    async fn test_no_content_is_empty_object() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/api/3/issue/ABC-1/transitions")
            .with_status(204)
            .create_async()
            .await;

        client(&server.url()).transition_issue("ABC-1", "31").await.unwrap();
    }

    #[tokio::test]
    async fn test_find_existing_user() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/user/search")
            .match_query(Matcher::UrlEncoded("query".into(), "ada@example.org".into()))
            .with_status(200)
            .with_body(r#"[{"accountId": "abc123"}]"#)
            .create_async()
            .await;

        let id = client(&server.url())
            .find_or_create_user("ada@example.org", "Ada", "Lovelace")
            .await
            .unwrap();
        assert_eq!(id, "abc123");
    }

    #[tokio::test]
    async fn test_create_user_when_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/user/search")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        let create = server
            .mock("POST", "/rest/servicedeskapi/customer")
            .match_body(Matcher::Json(json!({
                "email": "ada@example.org",
                "displayName": "Ada Lovelace"
            })))
            .with_status(201)
            .with_body(r#"{"accountId": "new-1"}"#)
            .create_async()
            .await;

        let id = client(&server.url())
            .find_or_create_user("ada@example.org", "Ada", "Lovelace")
            .await
            .unwrap();

        create.assert_async().await;
        assert_eq!(id, "new-1");
    }

    #[tokio::test]
    async fn test_build_create_issue_payload() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/servicedeskapi/servicedesk")
            .with_status(200)
            .with_body(
                json!({"values": [
                    {"projectKey": "HELP", "projectId": "10001"},
                    {"projectKey": "OPS", "projectId": "10002"}
                ]})
                .to_string(),
            )
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/issuetype/project")
            .match_query(Matcher::UrlEncoded("projectId".into(), "10001".into()))
            .with_status(200)
            .with_body(r#"[{"id": "1", "name": "Bug"}, {"id": "2", "name": "Task"}]"#)
            .create_async()
            .await;

        let issue = NewIssue::new("HELP", "Printer on fire").reporter_id("acc-9");
        let payload = client(&server.url())
            .build_create_issue_payload(&issue)
            .await
            .unwrap();

        assert_eq!(
            payload,
            json!({"fields": {
                "summary": "Printer on fire",
                "issuetype": {"id": "2"},
                "project": {"id": "10001"},
                "reporter": {"id": "acc-9"}
            }})
        );

        let missing = NewIssue::new("NOPE", "x").reporter_id("acc-9");
        let err = client(&server.url())
            .build_create_issue_payload(&missing)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("NOPE"));
    }

    #[tokio::test]
    async fn test_transition_by_name() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/rest/api/3/issue/ABC-1")
            .with_status(200)
            .with_body(r#"{"fields": {"status": {"name": "To Do"}}}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/rest/api/3/issue/ABC-1/transitions")
            .with_status(200)
            .with_body(r#"{"transitions": [{"id": "21", "to": {"name": "In Progress"}}, {"id": "31", "to": {"name": "Done"}}]}"#)
            .create_async()
            .await;
        let post = server
            .mock("POST", "/rest/api/3/issue/ABC-1/transitions")
            .match_body(Matcher::Json(json!({"transition": {"id": "31"}})))
            .with_status(204)
            .create_async()
            .await;

        client(&server.url())
            .transition_issue_by_name("ABC-1", "Done")
            .await
            .unwrap();

        post.assert_async().await;
    }
}
