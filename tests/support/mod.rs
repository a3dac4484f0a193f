//! A fake of the board REST API on a real socket, for driving `HttpApi`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use serde_json::{json, Value};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

const STATUSES: [&str; 4] = ["todo", "in-progress", "done", "blocked"];
const XSRF_TOKEN: &str = "tok-123";

#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub body: String,
    pub xsrf: Option<String>,
}

#[derive(Default)]
pub struct State {
    pub tasks: Vec<Value>,
    pub users: Vec<Value>,
    pub projects: Vec<Value>,
    pub comments: HashMap<String, Vec<Value>>,
    /// Route name -> status to answer with instead of handling the request.
    pub failing: HashMap<&'static str, u16>,
    pub seen: Vec<Seen>,
    /// Answer PATCH with an empty 200 instead of the updated task.
    pub bare_updates: bool,
    next_id: u32,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn task_mut(&mut self, id: &str) -> Option<&mut Value> {
        self.tasks.iter_mut().find(|t| t["_id"] == id)
    }

    fn user_ref(&self, id: &str) -> Option<Value> {
        self.users
            .iter()
            .find(|u| u["_id"] == id)
            .map(|u| json!({ "_id": u["_id"], "name": u["name"] }))
    }

    fn project_ref(&self, id: &str) -> Value {
        self.projects
            .iter()
            .find(|p| p["_id"] == id)
            .cloned()
            .unwrap_or_else(|| json!(id))
    }
}

pub struct FakeApi {
    pub base_url: String,
    pub state: Arc<Mutex<State>>,
    server: Arc<Server>,
    handle: Option<JoinHandle<()>>,
}

impl FakeApi {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind fake api"));
        let port = server
            .server_addr()
            .to_ip()
            .expect("tcp listener")
            .port();
        let state = Arc::new(Mutex::new(State::default()));
        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            std::thread::spawn(move || {
                for request in server.incoming_requests() {
                    handle(request, &state);
                }
            })
        };
        FakeApi {
            base_url: format!("http://127.0.0.1:{}/api", port),
            state,
            server,
            handle: Some(handle),
        }
    }

    pub fn with(&self, f: impl FnOnce(&mut State)) {
        let mut state = self.state.lock().unwrap();
        f(&mut *state);
    }

    pub fn fail(&self, route: &'static str, status: u16) {
        self.with(|s| {
            s.failing.insert(route, status);
        });
    }

    pub fn recover(&self, route: &'static str) {
        self.with(|s| {
            s.failing.remove(route);
        });
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn task(&self, id: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .tasks
            .iter()
            .find(|t| t["_id"] == id)
            .cloned()
    }
}

impl Drop for FakeApi {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond_json(status: u16, body: &Value) -> Response<std::io::Cursor<Vec<u8>>> {
    Response::from_string(body.to_string())
        .with_status_code(StatusCode(status))
        .with_header(Header::from_bytes("Content-Type", "application/json").unwrap())
}

fn error(status: u16, message: &str) -> Response<std::io::Cursor<Vec<u8>>> {
    respond_json(status, &json!({ "message": message }))
}

fn route_name(method: &Method, parts: &[&str]) -> &'static str {
    match (method, parts) {
        (Method::Get, ["tasks"]) => "list_tasks",
        (Method::Post, ["tasks"]) => "create_task",
        (Method::Get, ["users"]) => "list_users",
        (Method::Get, ["projects"]) => "list_projects",
        (Method::Patch, ["tasks", _]) => "update_task",
        (Method::Delete, ["tasks", _]) => "delete_task",
        (Method::Post, ["tasks", _, "status"]) => "set_status",
        (Method::Put, ["tasks", _, "assign"]) => "assign_task",
        (Method::Get, ["tasks", _, "comments"]) => "list_comments",
        (Method::Post, ["tasks", _, "comments"]) => "add_comment",
        _ => "unknown",
    }
}

fn handle(mut request: Request, state: &Mutex<State>) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let xsrf = request
        .headers()
        .iter()
        .find(|h| h.field.equiv("X-XSRF-TOKEN"))
        .map(|h| h.value.as_str().to_string());

    let mut state = state.lock().unwrap();
    state.seen.push(Seen {
        method: method.to_string(),
        path: url.clone(),
        body: body.clone(),
        xsrf,
    });

    let Some(path) = url.strip_prefix("/api/") else {
        let _ = request.respond(error(404, "not found"));
        return;
    };
    let parts: Vec<&str> = path.split('/').collect();
    let route = route_name(&method, &parts);
    if let Some(status) = state.failing.get(route).copied() {
        let _ = request.respond(error(status, &format!("{} unavailable", route)));
        return;
    }
    let parsed: Value = serde_json::from_str(&body).unwrap_or(Value::Null);

    let response = match (route, parts.get(1).copied()) {
        ("list_tasks", _) => {
            let cookie = format!("XSRF-TOKEN={}; Path=/", XSRF_TOKEN);
            respond_json(200, &Value::Array(state.tasks.clone()))
                .with_header(Header::from_bytes("Set-Cookie", cookie.as_bytes()).unwrap())
        }
        ("list_users", _) => respond_json(200, &Value::Array(state.users.clone())),
        ("list_projects", _) => respond_json(200, &Value::Array(state.projects.clone())),
        ("create_task", _) => {
            let title = parsed["title"].as_str().unwrap_or("").trim().to_string();
            if title.is_empty() {
                error(400, "title is required")
            } else {
                let id = state.next_id("task");
                let project = parsed["project"]
                    .as_str()
                    .map(|p| state.project_ref(p))
                    .unwrap_or(Value::Null);
                let task = json!({
                    "_id": id,
                    "title": title,
                    "status": parsed["status"],
                    "assignee": null,
                    "project": project,
                    "dueDate": null,
                    "commentsCount": 0,
                    "hasUnreadComments": false
                });
                state.tasks.push(task.clone());
                respond_json(201, &task)
            }
        }
        ("update_task", Some(id)) => match state.task_mut(id) {
            Some(task) => {
                if let Some(title) = parsed.get("title") {
                    task["title"] = title.clone();
                }
                if let Some(due) = parsed.get("dueDate") {
                    task["dueDate"] = due
                        .as_str()
                        .map(|d| json!(format!("{}T00:00:00.000Z", d)))
                        .unwrap_or(Value::Null);
                }
                let task = task.clone();
                if state.bare_updates {
                    Response::from_string("").with_status_code(StatusCode(200))
                } else {
                    respond_json(200, &task)
                }
            }
            None => error(404, "task not found"),
        },
        ("delete_task", Some(id)) => {
            let before = state.tasks.len();
            state.tasks.retain(|t| t["_id"] != id);
            if state.tasks.len() == before {
                error(404, "task not found")
            } else {
                Response::from_string("").with_status_code(StatusCode(204))
            }
        }
        ("set_status", Some(id)) => {
            let status = parsed["status"].as_str().unwrap_or("");
            if !STATUSES.contains(&status) {
                error(400, "invalid status")
            } else {
                match state.task_mut(id) {
                    Some(task) => {
                        task["status"] = json!(status);
                        respond_json(200, &json!({ "ok": true }))
                    }
                    None => error(404, "task not found"),
                }
            }
        }
        ("assign_task", Some(id)) => {
            let assignee_id = parsed["assigneeId"].as_str().unwrap_or("");
            let assignee = if assignee_id.is_empty() {
                Some(Value::Null)
            } else {
                state.user_ref(assignee_id)
            };
            match assignee {
                None => error(404, "user not found"),
                Some(assignee) => match state.task_mut(id) {
                    Some(task) => {
                        task["assignee"] = assignee.clone();
                        respond_json(200, &json!({ "assignee": assignee }))
                    }
                    None => error(404, "task not found"),
                },
            }
        }
        ("list_comments", Some(id)) => {
            let comments = state.comments.get(id).cloned().unwrap_or_default();
            respond_json(200, &Value::Array(comments))
        }
        ("add_comment", Some(id)) => {
            let comment_id = state.next_id("comment");
            let comment = json!({
                "_id": comment_id,
                "author": { "_id": "me", "name": "Me" },
                "content": parsed["content"],
                "createdAt": "2024-06-01T12:30:00Z"
            });
            state
                .comments
                .entry(id.to_string())
                .or_default()
                .insert(0, comment.clone());
            if let Some(task) = state.task_mut(id) {
                let count = task["commentsCount"].as_u64().unwrap_or(0);
                task["commentsCount"] = json!(count + 1);
            }
            respond_json(201, &comment)
        }
        _ => error(404, "not found"),
    };
    let _ = request.respond(response);
}
