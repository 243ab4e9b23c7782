//! Resource payloads for the ClickUp v2 API.
//!
//! # Design
//! The execution core treats these as opaque JSON destinations. They are
//! deliberately lenient: every struct defaults missing fields, and members
//! whose shape varies between endpoints stay as `serde_json::Value`.
//! List endpoints wrap their items in a single-key object (`{"tasks": [...]}`);
//! the `*Page` wrappers mirror that.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reference to a parent resource as embedded in other payloads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parent {
    pub id: String,
    pub name: Option<String>,
    pub access: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: Value,
    pub username: Option<String>,
    pub email: Option<String>,
    pub color: Option<String>,
    #[serde(rename = "profilePicture")]
    pub profile_picture: Option<String>,
    pub initials: Option<String>,
    pub role: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Status {
    pub id: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub orderindex: Value,
    pub color: Option<String>,
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// A workspace; the v2 API calls these teams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Workspace {
    pub id: String,
    pub name: String,
    pub color: Option<String>,
    pub avatar: Option<String>,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Member {
    pub user: User,
    pub invited_by: Option<User>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesPage {
    pub teams: Vec<Workspace>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Space {
    pub id: String,
    pub name: String,
    pub private: bool,
    pub color: Option<String>,
    pub avatar: Option<String>,
    pub admin_can_manage: Option<bool>,
    pub statuses: Vec<Status>,
    pub multiple_assignees: bool,
    /// Feature toggles; most are `{"enabled": bool}` but some carry settings.
    pub features: serde_json::Map<String, Value>,
    pub archived: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacesPage {
    pub spaces: Vec<Space>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Folder {
    pub id: String,
    pub name: String,
    pub orderindex: Value,
    pub override_statuses: bool,
    pub hidden: bool,
    pub space: Parent,
    pub task_count: Value,
    pub archived: bool,
    pub lists: Vec<List>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FoldersPage {
    pub folders: Vec<Folder>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct List {
    pub id: String,
    pub name: String,
    pub deleted: bool,
    pub orderindex: Value,
    pub content: Option<String>,
    pub status: Option<Value>,
    pub priority: Option<Value>,
    pub assignee: Option<Value>,
    pub task_count: Value,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub folder: Option<Parent>,
    pub space: Option<Parent>,
    pub inbound_address: Option<String>,
    pub archived: bool,
    pub override_statuses: Option<bool>,
    pub statuses: Vec<Status>,
    pub permission_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListsPage {
    pub lists: Vec<List>,
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    pub tag_fg: Option<String>,
    pub tag_bg: Option<String>,
    pub creator: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomField {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub type_config: Value,
    pub date_created: Option<String>,
    pub hide_from_guests: bool,
    pub value: Option<Value>,
    pub required: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    pub id: String,
    pub custom_id: Option<String>,
    pub name: String,
    pub text_content: Option<String>,
    pub description: Option<String>,
    pub status: Status,
    pub orderindex: Option<String>,
    pub date_created: Option<String>,
    pub date_updated: Option<String>,
    pub date_closed: Option<String>,
    pub creator: Option<User>,
    pub assignees: Vec<User>,
    pub checklists: Vec<Value>,
    pub tags: Vec<Tag>,
    pub parent: Option<String>,
    pub priority: Option<Value>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    pub time_estimate: Option<Value>,
    pub time_spent: Option<Value>,
    pub custom_fields: Vec<CustomField>,
    pub list: Option<Parent>,
    pub folder: Option<Parent>,
    pub space: Option<Parent>,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksPage {
    pub tasks: Vec<Task>,
    /// Present on team task listings; `true` on the final page.
    pub last_page: Option<bool>,
}

/// Payload for creating a task in a list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateTask {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub tags: Vec<String>,
}

/// Partial update for a task. Omitted fields stay unchanged on the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateTask {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ---------------------------------------------------------------------------
// Views, goals, groups
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct View {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub parent: Value,
    pub grouping: Value,
    pub divide: Value,
    pub sorting: Value,
    pub filters: Value,
    pub columns: Value,
    pub team_sidebar: Value,
    pub settings: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewEnvelope {
    pub view: View,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewsPage {
    pub views: Vec<View>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Comment {
    pub id: String,
    pub comment: Vec<Value>,
    pub comment_text: String,
    pub user: User,
    pub resolved: bool,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsPage {
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Goal {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub date_created: Option<String>,
    pub start_date: Option<String>,
    pub due_date: Option<String>,
    pub description: Option<String>,
    pub private: bool,
    pub archived: bool,
    pub creator: Option<i64>,
    pub color: Option<String>,
    pub pretty_id: Option<String>,
    pub multiple_owners: bool,
    pub folder_id: Option<String>,
    pub members: Vec<User>,
    pub owners: Vec<User>,
    pub key_results: Vec<Value>,
    pub percent_completed: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalEnvelope {
    pub goal: Goal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoalsPage {
    pub goals: Vec<Goal>,
    pub folders: Vec<Value>,
}

/// A user group (team in the UI).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Group {
    pub id: String,
    pub team_id: String,
    pub userid: Option<i64>,
    pub name: String,
    pub handle: Option<String>,
    pub date_created: Option<String>,
    pub initials: Option<String>,
    pub members: Vec<User>,
    pub avatar: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupsPage {
    pub groups: Vec<Group>,
}
