//! In-memory emulation of the judge site, quirks included.
//!
//! Serves the Moodle login form with a one-time `logintoken`, sets a session
//! cookie on successful login, and answers the JSON backend under `/py/` the
//! way the real one does: submissions acknowledge with `result` instead of
//! `status`, the protocol endpoint omits the status key entirely, and missing
//! runs yield an HTML 404 page.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const USERNAME: &str = "student";
pub const PASSWORD: &str = "secret";
pub const USER_ID: u64 = 42;
pub const SESSION_COOKIE: &str = "MoodleSession";
pub const LOGGED_IN_MARKER: &str = "Вы зашли под именем";
/// Number of tests every stored run is judged on.
pub const TEST_COUNT: usize = 3;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredRun {
    pub id: u64,
    pub problem_id: u64,
    pub user_id: u64,
    pub create_time: String,
    pub language_id: i64,
    pub source: String,
}

#[derive(Debug, Default)]
pub struct Store {
    login_tokens: HashSet<String>,
    sessions: HashMap<String, u64>,
    runs: BTreeMap<u64, StoredRun>,
}

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/login/index.php", get(login_page).post(login))
        .route("/py/problem/{id}/submit", post(submit))
        .route("/py/problem/{id}/filter-runs", get(filter_runs))
        .route("/py/problem/run/{id}/source", get(run_source))
        .route("/py/protocol/get/{id}", get(protocol))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

// --- front-end ---

async fn login_page(State(db): State<Db>) -> Html<String> {
    let token = Uuid::new_v4().simple().to_string();
    db.write().await.login_tokens.insert(token.clone());
    Html(format!(
        r#"<html><body><div id="page-content">
<form class="mt-3" action="/login/index.php" method="post" id="login">
    <input id="anchor" type="hidden" name="anchor" value="">
    <script>document.getElementById('anchor').value = location.hash;</script>
    <input type="hidden" name="logintoken" value="{token}">
    <input type="text" name="username" id="username" value="">
    <input type="password" name="password" id="password" value="">
</form></div></body></html>"#
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub logintoken: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

async fn login(State(db): State<Db>, headers: HeaderMap, Form(form): Form<LoginForm>) -> Response {
    let mut store = db.write().await;
    let token_ok = store.login_tokens.remove(&form.logintoken);
    if !token_ok || form.username != USERNAME || form.password != PASSWORD {
        tracing::info!(username = %form.username, token_ok, "login rejected");
        return Html(
            r#"<html><body><form id="login"></form>
<div class="loginerrors">Неверный логин или пароль, попробуйте заново.</div></body></html>"#
                .to_string(),
        )
        .into_response();
    }

    let sid = Uuid::new_v4().simple().to_string();
    store.sessions.insert(sid.clone(), USER_ID);
    let host = headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost");
    let page = format!(
        r#"<html><body><div id="page-footer"><div>
<div class="logininfo">{LOGGED_IN_MARKER} <a href="http://{host}/user/profile.php?id={USER_ID}" title="Просмотр профиля">{USERNAME}</a>
(<a href="http://{host}/login/logout.php?sesskey=abc">Выход</a>)</div>
</div></div></body></html>"#
    );
    (
        [(header::SET_COOKIE, format!("{SESSION_COOKIE}={sid}; Path=/"))],
        Html(page),
    )
        .into_response()
}

// --- back-end ---

fn session_user(store: &Store, headers: &HeaderMap) -> Option<u64> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, sid)| store.sessions.get(sid).copied())
}

fn unauthorized() -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "status": "error", "error": "Unauthorized" })),
    )
        .into_response()
}

fn backend_error(message: &str) -> Response {
    Json(json!({ "result": "error", "error": message })).into_response()
}

async fn submit(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(problem_id): Path<u64>,
    mut multipart: Multipart,
) -> Response {
    let Some(user_id) = session_user(&*db.read().await, &headers) else {
        return unauthorized();
    };

    let mut lang_id = None;
    let mut source = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(_) => return backend_error("Malformed form data"),
        };
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("lang_id") => lang_id = field.text().await.ok().and_then(|t| t.parse::<i64>().ok()),
            Some("file") => source = field.bytes().await.ok(),
            _ => {}
        }
    }

    let Some(language_id) = lang_id else {
        return backend_error("Invalid lang_id");
    };
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        return backend_error("Empty file");
    };

    let mut store = db.write().await;
    let id = store.runs.len() as u64 + 1;
    let run = StoredRun {
        id,
        problem_id,
        user_id,
        create_time: format!("2024-01-01T00:00:{:02}", id % 60),
        language_id,
        source: String::from_utf8_lossy(&source).into_owned(),
    };
    tracing::info!(run_id = id, problem_id, user_id, "stored submission");
    store.runs.insert(id, run);
    Json(json!({ "result": "success" })).into_response()
}

#[derive(Debug, Deserialize)]
pub struct RunsQuery {
    pub user_id: u64,
    #[serde(default = "default_count")]
    pub count: usize,
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_count() -> usize {
    20
}

fn default_page() -> usize {
    1
}

async fn filter_runs(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(problem_id): Path<u64>,
    Query(query): Query<RunsQuery>,
) -> Response {
    let store = db.read().await;
    if session_user(&store, &headers).is_none() {
        return unauthorized();
    }
    let skip = query.page.saturating_sub(1) * query.count;
    let runs: Vec<Value> = store
        .runs
        .values()
        .rev()
        .filter(|r| r.problem_id == problem_id && r.user_id == query.user_id)
        .skip(skip)
        .take(query.count)
        .map(|r| {
            json!({
                "id": r.id,
                "create_time": r.create_time,
                "ejudge_language_id": r.language_id,
                "ejudge_score": 100,
                "ejudge_status": 0,
                "ejudge_test_num": TEST_COUNT,
            })
        })
        .collect();
    Json(json!({ "status": "success", "data": runs })).into_response()
}

async fn run_source(State(db): State<Db>, headers: HeaderMap, Path(run_id): Path<u64>) -> Response {
    let store = db.read().await;
    if session_user(&store, &headers).is_none() {
        return unauthorized();
    }
    match store.runs.get(&run_id) {
        Some(run) => Json(json!({
            "status": "success",
            "data": { "id": run.id, "source": run.source, "language_id": run.language_id }
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "status": "error", "error": "Run not found" })),
        )
            .into_response(),
    }
}

async fn protocol(State(db): State<Db>, headers: HeaderMap, Path(run_id): Path<u64>) -> Response {
    let store = db.read().await;
    if session_user(&store, &headers).is_none() {
        return unauthorized();
    }
    if !store.runs.contains_key(&run_id) {
        return (StatusCode::NOT_FOUND, Html("<h1>Not Found</h1>")).into_response();
    }
    let tests: serde_json::Map<String, Value> = (1..=TEST_COUNT)
        .map(|n| {
            (
                n.to_string(),
                json!({
                    "max_memory_used": 1024 * n,
                    "real_time": 10 * n,
                    "status": "OK",
                    "string_status": "OK",
                    "time": 5 * n,
                }),
            )
        })
        .collect();
    // No status key: the client infers it from the HTTP code.
    Json(json!({ "tests": tests })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn login_form_accepts_missing_fields() {
        let form: LoginForm = serde_json::from_str(r#"{"username":"a"}"#).unwrap();
        assert_eq!(form.username, "a");
        assert!(form.logintoken.is_empty());
    }

    #[test]
    fn runs_query_defaults_paging() {
        let query: RunsQuery = serde_json::from_str(r#"{"user_id":42}"#).unwrap();
        assert_eq!(query.count, 20);
        assert_eq!(query.page, 1);
    }

    #[test]
    fn session_cookie_is_found_among_others() {
        let mut store = Store::default();
        store.sessions.insert("abc".to_string(), 7);
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; MoodleSession=abc".parse().unwrap());
        assert_eq!(session_user(&store, &headers), Some(7));
    }

    #[test]
    fn unknown_session_is_rejected() {
        let store = Store::default();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "MoodleSession=nope".parse().unwrap());
        assert_eq!(session_user(&store, &headers), None);
    }
}
