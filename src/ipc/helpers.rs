use crate::curriculum::Grade;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::{AppState, Request};
use crate::terms::Term;
use rusqlite::Connection;
use serde_json::{Map, Value};

pub fn db_conn<'a>(state: &'a AppState) -> Result<&'a Connection, HandlerErr> {
    state
        .db
        .as_ref()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))
}

pub fn params_obj(req: &Request) -> Map<String, Value> {
    req.params.as_object().cloned().unwrap_or_default()
}

pub fn required_str(req: &Request, key: &str) -> Result<String, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Absent and null both read as `None`; any other non-string is rejected.
pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, HandlerErr> {
    match req.params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(HandlerErr::bad_params(format!("{} must be a string", key))),
    }
}

pub fn parse_grade(raw: &str) -> Result<Grade, HandlerErr> {
    raw.parse::<Grade>()
        .map_err(|e| HandlerErr::bad_params(e.to_string()))
}

pub fn required_grade(req: &Request, key: &str) -> Result<Grade, HandlerErr> {
    parse_grade(&required_str(req, key)?)
}

pub fn required_term(req: &Request, key: &str) -> Result<Term, HandlerErr> {
    Term::parse(&required_str(req, key)?).map_err(|e| HandlerErr::bad_params(e.to_string()))
}

pub fn query_failed(e: impl std::fmt::Display) -> HandlerErr {
    HandlerErr::new("db_query_failed", e.to_string())
}
