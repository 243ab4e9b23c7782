//! Thin resource services over [`Client`].
//!
//! Each service borrows the client, formats a path, and hands the request to
//! [`Client::fetch`]. Every call takes extra query parameters, which are
//! appended with form encoding after any parameters the path already has.
//! List endpoints return the unwrapped items alongside the [`Response`].

use crate::client::{Client, Destination, NO_BODY};
use crate::context::Context;
use crate::error::ClientError;
use crate::fan_out::{FanOut, PageScan};
use crate::http::HttpMethod;
use crate::response::Response;
use crate::types::{
    Comment, CommentsPage, CreateTask, Folder, FoldersPage, Goal, GoalEnvelope, GoalsPage, Group,
    GroupsPage, List, ListsPage, Space, SpacesPage, Task, TasksPage, UpdateTask, View, ViewEnvelope,
    ViewsPage, Workspace, WorkspacesPage,
};

/// Extra query parameters for a call.
pub type Query<'a> = &'a [(&'a str, &'a str)];

impl Client {
    pub fn workspaces(&self) -> WorkspacesService<'_> {
        WorkspacesService { client: self }
    }

    pub fn spaces(&self) -> SpacesService<'_> {
        SpacesService { client: self }
    }

    pub fn folders(&self) -> FoldersService<'_> {
        FoldersService { client: self }
    }

    pub fn lists(&self) -> ListsService<'_> {
        ListsService { client: self }
    }

    pub fn tasks(&self) -> TasksService<'_> {
        TasksService { client: self }
    }

    pub fn views(&self) -> ViewsService<'_> {
        ViewsService { client: self }
    }

    pub fn goals(&self) -> GoalsService<'_> {
        GoalsService { client: self }
    }

    pub fn groups(&self) -> GroupsService<'_> {
        GroupsService { client: self }
    }
}

async fn get<T>(
    client: &Client,
    ctx: &Context,
    path: &str,
    query: Query<'_>,
) -> Result<(T, Response), ClientError>
where
    T: serde::de::DeserializeOwned + Default + Send,
{
    let request = client
        .new_request(HttpMethod::Get, path, NO_BODY)?
        .with_query(query);
    client.fetch(ctx, request).await
}

// ---------------------------------------------------------------------------
// Hierarchy
// ---------------------------------------------------------------------------

/// Workspaces the credential can see.
pub struct WorkspacesService<'a> {
    client: &'a Client,
}

impl WorkspacesService<'_> {
    /// `GET team`
    pub async fn list(
        &self,
        ctx: &Context,
        query: Query<'_>,
    ) -> Result<(Vec<Workspace>, Response), ClientError> {
        let (page, response): (WorkspacesPage, _) = get(self.client, ctx, "team", query).await?;
        Ok((page.teams, response))
    }
}

pub struct SpacesService<'a> {
    client: &'a Client,
}

impl SpacesService<'_> {
    pub async fn get(
        &self,
        ctx: &Context,
        space_id: &str,
        query: Query<'_>,
    ) -> Result<(Space, Response), ClientError> {
        get(self.client, ctx, &format!("space/{space_id}"), query).await
    }

    /// Spaces of a workspace.
    pub async fn list(
        &self,
        ctx: &Context,
        team_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Space>, Response), ClientError> {
        let (page, response): (SpacesPage, _) =
            get(self.client, ctx, &format!("team/{team_id}/space"), query).await?;
        Ok((page.spaces, response))
    }
}

pub struct FoldersService<'a> {
    client: &'a Client,
}

impl FoldersService<'_> {
    pub async fn get(
        &self,
        ctx: &Context,
        folder_id: &str,
        query: Query<'_>,
    ) -> Result<(Folder, Response), ClientError> {
        get(self.client, ctx, &format!("folder/{folder_id}"), query).await
    }

    /// Folders of a space.
    pub async fn list(
        &self,
        ctx: &Context,
        space_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Folder>, Response), ClientError> {
        let (page, response): (FoldersPage, _) =
            get(self.client, ctx, &format!("space/{space_id}/folder"), query).await?;
        Ok((page.folders, response))
    }

    pub async fn views(
        &self,
        ctx: &Context,
        folder_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<View>, Response), ClientError> {
        let (page, response): (ViewsPage, _) =
            get(self.client, ctx, &format!("folder/{folder_id}/view"), query).await?;
        Ok((page.views, response))
    }
}

pub struct ListsService<'a> {
    client: &'a Client,
}

impl ListsService<'_> {
    pub async fn get(
        &self,
        ctx: &Context,
        list_id: &str,
        query: Query<'_>,
    ) -> Result<(List, Response), ClientError> {
        get(self.client, ctx, &format!("list/{list_id}"), query).await
    }

    pub async fn folder_lists(
        &self,
        ctx: &Context,
        folder_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<List>, Response), ClientError> {
        let (page, response): (ListsPage, _) =
            get(self.client, ctx, &format!("folder/{folder_id}/list"), query).await?;
        Ok((page.lists, response))
    }

    /// Lists that sit directly in a space, outside any folder.
    pub async fn folderless_lists(
        &self,
        ctx: &Context,
        space_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<List>, Response), ClientError> {
        let (page, response): (ListsPage, _) =
            get(self.client, ctx, &format!("space/{space_id}/list"), query).await?;
        Ok((page.lists, response))
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

pub struct TasksService<'a> {
    client: &'a Client,
}

impl TasksService<'_> {
    pub async fn get(
        &self,
        ctx: &Context,
        task_id: &str,
        query: Query<'_>,
    ) -> Result<(Task, Response), ClientError> {
        get(self.client, ctx, &format!("task/{task_id}"), query).await
    }

    /// One page of tasks in a list.
    pub async fn list(
        &self,
        ctx: &Context,
        list_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Task>, Response), ClientError> {
        let (page, response): (TasksPage, _) =
            get(self.client, ctx, &format!("list/{list_id}/task"), query).await?;
        Ok((page.tasks, response))
    }

    /// One page of tasks across a workspace. Pass `("page", "N")` to pick the
    /// page; the server starts at 0.
    pub async fn for_team(
        &self,
        ctx: &Context,
        team_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Task>, Response), ClientError> {
        let (page, response): (TasksPage, _) =
            get(self.client, ctx, &format!("team/{team_id}/task"), query).await?;
        Ok((page.tasks, response))
    }

    pub async fn create(
        &self,
        ctx: &Context,
        list_id: &str,
        input: &CreateTask,
    ) -> Result<(Task, Response), ClientError> {
        let request = self.client.new_request(
            HttpMethod::Post,
            &format!("list/{list_id}/task"),
            Some(input),
        )?;
        self.client.fetch(ctx, request).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        task_id: &str,
        input: &UpdateTask,
    ) -> Result<(Task, Response), ClientError> {
        let request =
            self.client
                .new_request(HttpMethod::Put, &format!("task/{task_id}"), Some(input))?;
        self.client.fetch(ctx, request).await
    }

    pub async fn delete(&self, ctx: &Context, task_id: &str) -> Result<Response, ClientError> {
        let request =
            self.client
                .new_request(HttpMethod::Delete, &format!("task/{task_id}"), NO_BODY)?;
        self.client.execute(ctx, request, Destination::Discard).await
    }

    /// Fetch pages `0..pages` of a workspace's tasks concurrently.
    ///
    /// The scan owns a clone of the client, so it outlives this service.
    /// Failed pages are reported by [`PageScan::finish`].
    pub fn scan_team(
        &self,
        ctx: &Context,
        team_id: &str,
        pages: u32,
        fan_out: FanOut,
    ) -> PageScan<Task> {
        let client = self.client.clone();
        let path = format!("team/{team_id}/task");
        fan_out.scan(ctx, pages, move |page_ctx, page| {
            let client = client.clone();
            let path = path.clone();
            async move {
                let page = page.to_string();
                let request = client
                    .new_request(HttpMethod::Get, &path, NO_BODY)?
                    .with_query(&[("page", page.as_str())]);
                let (body, _): (TasksPage, _) = client.fetch(&page_ctx, request).await?;
                Ok::<_, ClientError>(body.tasks)
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Views, goals, groups
// ---------------------------------------------------------------------------

pub struct ViewsService<'a> {
    client: &'a Client,
}

impl ViewsService<'_> {
    pub async fn get(
        &self,
        ctx: &Context,
        view_id: &str,
        query: Query<'_>,
    ) -> Result<(View, Response), ClientError> {
        let (envelope, response): (ViewEnvelope, _) =
            get(self.client, ctx, &format!("view/{view_id}"), query).await?;
        Ok((envelope.view, response))
    }

    pub async fn tasks(
        &self,
        ctx: &Context,
        view_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Task>, Response), ClientError> {
        let (page, response): (TasksPage, _) =
            get(self.client, ctx, &format!("view/{view_id}/task"), query).await?;
        Ok((page.tasks, response))
    }

    /// Comments of a chat view.
    pub async fn comments(
        &self,
        ctx: &Context,
        view_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Comment>, Response), ClientError> {
        let (page, response): (CommentsPage, _) =
            get(self.client, ctx, &format!("view/{view_id}/comment"), query).await?;
        Ok((page.comments, response))
    }
}

pub struct GoalsService<'a> {
    client: &'a Client,
}

impl GoalsService<'_> {
    /// Goals of a workspace.
    pub async fn list(
        &self,
        ctx: &Context,
        team_id: &str,
        query: Query<'_>,
    ) -> Result<(Vec<Goal>, Response), ClientError> {
        let (page, response): (GoalsPage, _) =
            get(self.client, ctx, &format!("team/{team_id}/goal"), query).await?;
        Ok((page.goals, response))
    }

    pub async fn get(
        &self,
        ctx: &Context,
        goal_id: &str,
        query: Query<'_>,
    ) -> Result<(Goal, Response), ClientError> {
        let (envelope, response): (GoalEnvelope, _) =
            get(self.client, ctx, &format!("goal/{goal_id}"), query).await?;
        Ok((envelope.goal, response))
    }
}

pub struct GroupsService<'a> {
    client: &'a Client,
}

impl GroupsService<'_> {
    /// User groups; filter with `team_id` or `group_ids` in `query`.
    pub async fn list(
        &self,
        ctx: &Context,
        query: Query<'_>,
    ) -> Result<(Vec<Group>, Response), ClientError> {
        let (page, response): (GroupsPage, _) = get(self.client, ctx, "group", query).await?;
        Ok((page.groups, response))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::http::{HttpRequest, HttpResponse};
    use crate::transport::{Transport, TransportError};

    /// Answers by path (without query) and records every request.
    #[derive(Default)]
    struct Routes {
        bodies: HashMap<String, (u16, String)>,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Routes {
        fn with(mut self, path: &str, status: u16, body: serde_json::Value) -> Self {
            self.bodies.insert(path.to_string(), (status, body.to_string()));
            self
        }
    }

    #[async_trait]
    impl Transport for Routes {
        async fn round_trip(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            let path = request.url.path().trim_start_matches("/api/v2/");
            Ok(match self.bodies.get(path) {
                Some((status, body)) => {
                    HttpResponse::for_request(request, *status).with_body(body.clone())
                }
                None => HttpResponse::for_request(request, 404)
                    .with_body(r#"{"err":"Route not found","ECODE":"APP_001"}"#),
            })
        }
    }

    fn client(routes: Arc<Routes>) -> Client {
        Client::builder().shared_transport(routes).build().unwrap()
    }

    #[tokio::test]
    async fn workspaces_list_unwraps_teams() {
        let routes = Arc::new(Routes::default().with(
            "team",
            200,
            json!({"teams": [{"id": "9001", "name": "Acme"}]}),
        ));
        let (teams, resp) = client(routes.clone())
            .workspaces()
            .list(&Context::new(), &[])
            .await
            .unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].name, "Acme");
        assert_eq!(resp.status, 200);
        assert_eq!(
            routes.seen.lock().unwrap()[0].url.as_str(),
            "https://api.clickup.com/api/v2/team"
        );
    }

    #[tokio::test]
    async fn query_parameters_are_form_encoded() {
        let routes = Arc::new(Routes::default().with("list/901/task", 200, json!({"tasks": []})));
        let (tasks, _) = client(routes.clone())
            .tasks()
            .list(&Context::new(), "901", &[("archived", "false"), ("order_by", "due date")])
            .await
            .unwrap();
        assert!(tasks.is_empty());
        assert_eq!(
            routes.seen.lock().unwrap()[0].url.query(),
            Some("archived=false&order_by=due+date")
        );
    }

    #[tokio::test]
    async fn hierarchy_paths() {
        let routes = Arc::new(
            Routes::default()
                .with("team/9001/space", 200, json!({"spaces": [{"id": "s1"}]}))
                .with("space/s1/folder", 200, json!({"folders": [{"id": "f1"}]}))
                .with("folder/f1/list", 200, json!({"lists": [{"id": "l1"}]}))
                .with("space/s1/list", 200, json!({"lists": [{"id": "l2"}]}))
                .with("folder/f1/view", 200, json!({"views": [{"id": "v1", "type": "list"}]})),
        );
        let c = client(routes);
        let ctx = Context::new();

        let (spaces, _) = c.spaces().list(&ctx, "9001", &[]).await.unwrap();
        assert_eq!(spaces[0].id, "s1");
        let (folders, _) = c.folders().list(&ctx, "s1", &[]).await.unwrap();
        assert_eq!(folders[0].id, "f1");
        let (lists, _) = c.lists().folder_lists(&ctx, "f1", &[]).await.unwrap();
        assert_eq!(lists[0].id, "l1");
        let (lists, _) = c.lists().folderless_lists(&ctx, "s1", &[]).await.unwrap();
        assert_eq!(lists[0].id, "l2");
        let (views, _) = c.folders().views(&ctx, "f1", &[]).await.unwrap();
        assert_eq!(views[0].kind, "list");
    }

    #[tokio::test]
    async fn envelopes_are_unwrapped() {
        let routes = Arc::new(
            Routes::default()
                .with("view/v1", 200, json!({"view": {"id": "v1", "name": "Board"}}))
                .with("goal/g1", 200, json!({"goal": {"id": "g1", "name": "Ship"}}))
                .with("team/9001/goal", 200, json!({"goals": [{"id": "g1"}], "folders": []}))
                .with("group", 200, json!({"groups": [{"id": "grp", "name": "Ops"}]})),
        );
        let c = client(routes.clone());
        let ctx = Context::new();

        let (view, _) = c.views().get(&ctx, "v1", &[]).await.unwrap();
        assert_eq!(view.name, "Board");
        let (goal, _) = c.goals().get(&ctx, "g1", &[]).await.unwrap();
        assert_eq!(goal.name, "Ship");
        let (goals, _) = c.goals().list(&ctx, "9001", &[]).await.unwrap();
        assert_eq!(goals.len(), 1);
        let (groups, _) = c.groups().list(&ctx, &[("team_id", "9001")]).await.unwrap();
        assert_eq!(groups[0].name, "Ops");

        let seen = routes.seen.lock().unwrap();
        assert_eq!(seen[3].url.query(), Some("team_id=9001"));
    }

    #[tokio::test]
    async fn task_writes_send_json_bodies() {
        let routes = Arc::new(
            Routes::default()
                .with("list/901/task", 200, json!({"id": "t1", "name": "Draft"}))
                .with("task/t1", 200, json!({"id": "t1", "name": "Final"})),
        );
        let c = client(routes.clone());
        let ctx = Context::new();

        let input = CreateTask {
            name: "Draft".into(),
            ..CreateTask::default()
        };
        let (task, _) = c.tasks().create(&ctx, "901", &input).await.unwrap();
        assert_eq!(task.id, "t1");

        let update = UpdateTask {
            name: Some("Final".into()),
            ..UpdateTask::default()
        };
        let (task, _) = c.tasks().update(&ctx, "t1", &update).await.unwrap();
        assert_eq!(task.name, "Final");

        let resp = c.tasks().delete(&ctx, "t1").await.unwrap();
        assert_eq!(resp.status, 200);

        let seen = routes.seen.lock().unwrap();
        assert_eq!(seen[0].method, HttpMethod::Post);
        assert_eq!(seen[0].body.as_deref(), Some(&br#"{"name":"Draft"}"#[..]));
        assert_eq!(seen[1].method, HttpMethod::Put);
        assert_eq!(seen[1].body.as_deref(), Some(&br#"{"name":"Final"}"#[..]));
        assert_eq!(seen[2].method, HttpMethod::Delete);
        assert!(seen[2].body.is_none());
    }

    #[tokio::test]
    async fn missing_resource_is_api_error() {
        let err = client(Arc::new(Routes::default()))
            .tasks()
            .get(&Context::new(), "nope", &[])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status(), Some(404));
    }

    #[tokio::test]
    async fn scan_team_requests_each_page() {
        struct Paged;

        #[async_trait]
        impl Transport for Paged {
            async fn round_trip(
                &self,
                request: &HttpRequest,
            ) -> Result<HttpResponse, TransportError> {
                let page = request
                    .url
                    .query_pairs()
                    .find(|(k, _)| k == "page")
                    .map(|(_, v)| v.into_owned())
                    .unwrap_or_default();
                let body = json!({"tasks": [{"id": format!("t{page}-a")}, {"id": format!("t{page}-b")}]});
                Ok(HttpResponse::for_request(request, 200).with_body(body.to_string()))
            }
        }

        let c = Client::new(Paged).unwrap();
        let scan = c
            .tasks()
            .scan_team(&Context::new(), "9001", 3, FanOut::new(2));
        let (tasks, failures) = scan.collect().await;
        assert!(failures.is_empty());
        let mut ids: Vec<_> = tasks.into_iter().map(|t| t.id).collect();
        ids.sort();
        assert_eq!(ids, ["t0-a", "t0-b", "t1-a", "t1-b", "t2-a", "t2-b"]);
    }
}
