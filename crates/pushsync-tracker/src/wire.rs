//! Request and response bodies of the tracker REST API.
//!
//! Every write goes through a typed struct; the `{"<Type>": {...}}` envelope
//! the API expects is added at serialization time by the client.

use serde::{Deserialize, Serialize};

use pushsync_core::{ArtifactId, ArtifactKind, ChangeAction, ScheduleState};

// ── Queries ──

/// Queryable tracker collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Workspace,
    ScmRepository,
    User,
    Artifact(ArtifactKind),
}

impl Collection {
    /// Path segment under the API root.
    pub fn path(self) -> &'static str {
        match self {
            Collection::Workspace => "workspace",
            Collection::ScmRepository => "scmrepository",
            Collection::User => "user",
            Collection::Artifact(kind) => kind.collection(),
        }
    }

    /// Field the collection is looked up by.
    pub fn filter_field(self) -> &'static str {
        match self {
            Collection::Workspace | Collection::ScmRepository => "Name",
            Collection::User => "UserName",
            Collection::Artifact(_) => "FormattedID",
        }
    }
}

/// An equality lookup: `(Field = value)` against one collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Query {
    pub collection: Collection,
    pub value: String,
}

impl Query {
    pub fn workspace(name: &str) -> Self {
        Self {
            collection: Collection::Workspace,
            value: name.to_string(),
        }
    }

    pub fn repository(name: &str) -> Self {
        Self {
            collection: Collection::ScmRepository,
            value: name.to_string(),
        }
    }

    pub fn user(username: &str) -> Self {
        Self {
            collection: Collection::User,
            value: username.to_string(),
        }
    }

    pub fn artifact(id: &ArtifactId) -> Self {
        Self {
            collection: Collection::Artifact(id.kind()),
            value: id.as_str().to_string(),
        }
    }

    /// Value of the `query` URL parameter.
    pub fn expression(&self) -> String {
        format!("({} = {})", self.collection.filter_field(), self.value)
    }
}

/// Object reference as returned in query results and create responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(rename = "_ref", default)]
    pub reference: String,
    #[serde(
        rename = "_refObjectName",
        default,
        skip_serializing_if = "String::is_empty"
    )]
    pub name: String,
}

impl Reference {
    pub fn to(reference: &str) -> Self {
        Self {
            reference: reference.to_string(),
            name: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QueryResult {
    #[serde(rename = "TotalResultCount", default)]
    pub total_result_count: u64,
    #[serde(rename = "Results", default)]
    pub results: Vec<Reference>,
    #[serde(rename = "Errors", default)]
    pub errors: Vec<String>,
}

impl QueryResult {
    pub fn from_refs(refs: &[String]) -> Self {
        Self {
            total_result_count: refs.len() as u64,
            results: refs.iter().map(|r| Reference::to(r)).collect(),
            errors: Vec::new(),
        }
    }

    /// The reference of the only result, or `None` when there are zero or several.
    pub fn single(&self) -> Option<&str> {
        match self.results.as_slice() {
            [only] => Some(only.reference.as_str()),
            _ => None,
        }
    }

    /// The reference of the first result, if the tracker reported any match.
    pub fn first(&self) -> Option<&str> {
        if self.total_result_count == 0 {
            return None;
        }
        self.results.first().map(|r| r.reference.as_str())
    }
}

#[derive(Deserialize)]
pub(crate) struct QueryEnvelope {
    #[serde(rename = "QueryResult")]
    pub query_result: QueryResult,
}

// ── Writes ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewRepository {
    #[serde(rename = "SCMType")]
    pub scm_type: String,
    pub name: String,
    pub workspace: String,
    pub description: String,
    pub uri: String,
}

impl NewRepository {
    /// A GitHub-backed repository record in `workspace`.
    pub fn github(name: &str, uri: &str, workspace: &str) -> Self {
        Self {
            scm_type: "GitHub".to_string(),
            name: name.to_string(),
            workspace: workspace.to_string(),
            description: "GitHub-Service push Changesets".to_string(),
            uri: uri.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewChangeset {
    #[serde(rename = "SCMRepository")]
    pub scm_repository: String,
    pub revision: String,
    pub message: String,
    pub uri: String,
    pub commit_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Reference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewChange {
    pub action: ChangeAction,
    pub changeset: String,
    pub path_and_filename: String,
    pub uri: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub(crate) struct StateUpdate {
    #[serde(rename = "ScheduleState")]
    pub schedule_state: ScheduleState,
}

// ── Write responses ──

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateResult {
    #[serde(rename = "Object", default)]
    pub object: Reference,
    #[serde(rename = "Errors", default)]
    pub errors: Vec<String>,
}

impl CreateResult {
    pub fn created(reference: &str) -> Self {
        Self {
            object: Reference::to(reference),
            errors: Vec::new(),
        }
    }

    /// Reference of the created object; `None` when the tracker returned none.
    pub fn reference(&self) -> Option<&str> {
        Some(self.object.reference.as_str()).filter(|r| !r.is_empty())
    }
}

#[derive(Deserialize)]
pub(crate) struct CreateEnvelope {
    #[serde(rename = "CreateResult")]
    pub create_result: CreateResult,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatedArtifact {
    #[serde(rename = "ScheduleState", default)]
    pub schedule_state: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OperationResult {
    #[serde(rename = "Object", default)]
    pub object: UpdatedArtifact,
    #[serde(rename = "Errors", default)]
    pub errors: Vec<String>,
}

impl OperationResult {
    pub fn with_state(state: &str) -> Self {
        Self {
            object: UpdatedArtifact {
                schedule_state: Some(state.to_string()),
            },
            errors: Vec::new(),
        }
    }

    /// State the tracker reports after the update.
    pub fn schedule_state(&self) -> Option<&str> {
        self.object.schedule_state.as_deref()
    }
}

#[derive(Deserialize)]
pub(crate) struct OperationEnvelope {
    #[serde(rename = "OperationResult")]
    pub operation_result: OperationResult,
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_expression_uses_filter_field() {
        let id = ArtifactId::parse("US42").unwrap();
        assert_eq!(Query::artifact(&id).expression(), "(FormattedID = US42)");
        assert_eq!(Query::artifact(&id).collection.path(), "hierarchicalrequirement");
        assert_eq!(
            Query::user("jane@example.com").expression(),
            "(UserName = jane@example.com)"
        );
        assert_eq!(Query::workspace("Acme").expression(), "(Name = Acme)");
    }

    #[test]
    fn query_result_single_and_first() {
        let none = QueryResult::from_refs(&[]);
        assert_eq!(none.single(), None);
        assert_eq!(none.first(), None);

        let two = QueryResult::from_refs(&["r/1".into(), "r/2".into()]);
        assert_eq!(two.single(), None);
        assert_eq!(two.first(), Some("r/1"));

        let one = QueryResult::from_refs(&["r/1".into()]);
        assert_eq!(one.single(), Some("r/1"));
    }

    #[test]
    fn decode_query_envelope() {
        let json = r#"{"QueryResult": {
            "_rallyAPIMajor": "2", "_rallyAPIMinor": "0",
            "Errors": [], "Warnings": [],
            "TotalResultCount": 1, "StartIndex": 1, "PageSize": 20,
            "Results": [{"_ref": "https://t/slm/webservice/v2.0/user/123", "_refObjectName": "Jane", "_type": "User"}]
        }}"#;
        let env: QueryEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(
            env.query_result.single(),
            Some("https://t/slm/webservice/v2.0/user/123")
        );
        assert_eq!(env.query_result.results[0].name, "Jane");
    }

    #[test]
    fn changeset_serializes_with_tracker_field_names() {
        let changeset = NewChangeset {
            scm_repository: "repo/1".into(),
            revision: "abc".into(),
            message: "US1 fix".into(),
            uri: "https://github.com/a/b/commit/abc".into(),
            commit_timestamp: "2019-05-15T15:20:30-05:00".into(),
            author: None,
            artifacts: vec![Reference::to("story/9")],
        };
        let json = serde_json::to_value(&changeset).unwrap();
        assert_eq!(json["SCMRepository"], "repo/1");
        assert_eq!(json["CommitTimestamp"], "2019-05-15T15:20:30-05:00");
        assert_eq!(json["Artifacts"][0]["_ref"], "story/9");
        assert!(json.get("Author").is_none());
        assert!(json["Artifacts"][0].get("_refObjectName").is_none());
    }

    #[test]
    fn changeset_without_artifacts_omits_field() {
        let changeset = NewChangeset {
            scm_repository: "repo/1".into(),
            revision: "abc".into(),
            message: "chore".into(),
            uri: "u".into(),
            commit_timestamp: "t".into(),
            author: Some("user/7".into()),
            artifacts: Vec::new(),
        };
        let json = serde_json::to_value(&changeset).unwrap();
        assert_eq!(json["Author"], "user/7");
        assert!(json.get("Artifacts").is_none());
    }

    #[test]
    fn change_serializes_action_letter() {
        let change = NewChange {
            action: ChangeAction::Removed,
            changeset: "cs/1".into(),
            path_and_filename: "src/old.rs".into(),
            uri: "https://github.com/a/b/blob/main/src/old.rs".into(),
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["Action"], "R");
        assert_eq!(json["PathAndFilename"], "src/old.rs");
        assert_eq!(json["Changeset"], "cs/1");
    }

    #[test]
    fn repository_body() {
        let json = serde_json::to_value(NewRepository::github("widgets", "https://g/w", "ws/1")).unwrap();
        assert_eq!(json["SCMType"], "GitHub");
        assert_eq!(json["Name"], "widgets");
        assert_eq!(json["Workspace"], "ws/1");
        assert_eq!(json["Uri"], "https://g/w");
    }

    #[test]
    fn create_result_without_object_has_no_reference() {
        let env: CreateEnvelope = serde_json::from_str(
            r#"{"CreateResult": {"Errors": ["Could not create"], "Warnings": []}}"#,
        )
        .unwrap();
        assert_eq!(env.create_result.reference(), None);
        assert_eq!(env.create_result.errors, vec!["Could not create"]);
    }

    #[test]
    fn operation_result_reports_state() {
        let env: OperationEnvelope = serde_json::from_str(
            r#"{"OperationResult": {"Errors": [], "Object": {"ScheduleState": "Completed", "FormattedID": "US1"}}}"#,
        )
        .unwrap();
        assert_eq!(env.operation_result.schedule_state(), Some("Completed"));
    }
}
