use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header::COOKIE, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "reddit_session";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub name: String,
    pub passwd: String,
    pub link_karma: i64,
    pub comment_karma: i64,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub user: String,
    pub modhash: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct StoredComment {
    pub id: String,
    pub author: String,
    pub thing_id: String,
    pub text: String,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub user: String,
    pub passwd: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub thing_id: String,
    pub text: String,
    #[serde(default)]
    pub uh: Option<String>,
}

#[derive(Debug, Default)]
pub struct Store {
    pub accounts: HashMap<String, Account>,
    pub sessions: HashMap<String, Session>,
    pub comments: Vec<StoredComment>,
}

pub type Db = Arc<RwLock<Store>>;

/// Router seeded with one account, `alice` / `hunter2`.
pub fn app() -> Router {
    let mut store = Store::default();
    store.accounts.insert(
        "alice".to_string(),
        Account {
            name: "alice".to_string(),
            passwd: "hunter2".to_string(),
            link_karma: 42,
            comment_karma: 7,
        },
    );
    app_with_store(Arc::new(RwLock::new(store)))
}

pub fn app_with_store(db: Db) -> Router {
    Router::new()
        .route("/api/login", post(login))
        .route("/api/me.json", get(me))
        .route("/api/comment", post(comment))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn rejected(code: &str, message: &str, field: Option<&str>) -> Json<Value> {
    Json(json!({ "json": { "errors": [[code, message, field]] } }))
}

/// Session cookie value from any `Cookie` header line.
fn session_cookie(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

async fn current_session(db: &Db, headers: &HeaderMap) -> Option<Session> {
    let cookie = session_cookie(headers)?;
    db.read().await.sessions.get(&cookie).cloned()
}

async fn login(State(db): State<Db>, Form(input): Form<LoginForm>) -> Json<Value> {
    let mut store = db.write().await;
    let valid = store
        .accounts
        .get(&input.user)
        .is_some_and(|account| account.passwd == input.passwd);
    if !valid {
        return rejected("WRONG_PASSWORD", "invalid password", Some("passwd"));
    }

    let cookie = format!("{},{}", Uuid::new_v4().simple(), input.user);
    let modhash = Uuid::new_v4().simple().to_string();
    store.sessions.insert(
        cookie.clone(),
        Session {
            user: input.user,
            modhash: modhash.clone(),
        },
    );
    Json(json!({ "json": { "errors": [], "data": { "modhash": modhash, "cookie": cookie } } }))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let Some(session) = current_session(&db, &headers).await else {
        return (StatusCode::FORBIDDEN, Json(json!({})));
    };
    let store = db.read().await;
    match store.accounts.get(&session.user) {
        Some(account) => (
            StatusCode::OK,
            Json(json!({
                "kind": "t2",
                "data": {
                    "name": account.name,
                    "link_karma": account.link_karma,
                    "comment_karma": account.comment_karma,
                }
            })),
        ),
        None => (StatusCode::FORBIDDEN, Json(json!({}))),
    }
}

async fn comment(
    State(db): State<Db>,
    headers: HeaderMap,
    Form(input): Form<CommentForm>,
) -> (StatusCode, Json<Value>) {
    let Some(session) = current_session(&db, &headers).await else {
        return (StatusCode::FORBIDDEN, Json(json!({})));
    };
    if input.uh.as_deref() != Some(session.modhash.as_str()) {
        return (StatusCode::OK, rejected("BAD_MODHASH", "invalid modhash", None));
    }
    if input.text.trim().is_empty() {
        return (StatusCode::OK, rejected("NO_TEXT", "we need something here", Some("text")));
    }

    let id = format!("t1_{}", &Uuid::new_v4().simple().to_string()[..7]);
    db.write().await.comments.push(StoredComment {
        id: id.clone(),
        author: session.user,
        thing_id: input.thing_id,
        text: input.text,
    });
    (
        StatusCode::OK,
        Json(json!({ "json": { "errors": [], "data": { "id": id } } })),
    )
}
