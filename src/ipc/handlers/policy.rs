use crate::db;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{db_conn, query_failed};
use crate::ipc::types::{AppState, Request};
use crate::policy::{self, CalcConfig, RankingLaw};
use serde_json::json;

fn config_json(cfg: &CalcConfig) -> serde_json::Value {
    json!({
        "bands": cfg.policies,
        "rankingLaw": cfg.ranking_law
    })
}

fn policy_get(state: &AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let cfg = db::load_calc_config(conn).map_err(query_failed)?;
    Ok(config_json(&cfg))
}

fn policy_update(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let conn = db_conn(state)?;
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return Err(HandlerErr::bad_params("patch must be an object"));
    };

    let mut cfg = db::load_calc_config(conn).map_err(query_failed)?;
    let mut band_patch = patch.clone();
    if let Some(raw) = band_patch.remove("rankingLaw") {
        let law = raw.as_str().and_then(RankingLaw::parse).ok_or_else(|| {
            HandlerErr::bad_params("rankingLaw must be \"distinctTotals\" or \"competition\"")
        })?;
        cfg.ranking_law = law;
    }
    cfg.policies
        .apply_patch(&band_patch)
        .map_err(HandlerErr::bad_params)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    let bands = serde_json::to_value(cfg.policies)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    db::settings_set_json(&tx, policy::SETTINGS_KEY_BANDS, &bands)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    db::settings_set_json(&tx, policy::SETTINGS_KEY_RANKING_LAW, &json!(cfg.ranking_law))
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    tx.commit()
        .map_err(|e| HandlerErr::new("db_tx_failed", e.to_string()))?;
    tracing::info!("policy updated: {}", serde_json::Value::Object(patch.clone()));

    Ok(config_json(&cfg))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let outcome = match req.method.as_str() {
        "policy.get" => policy_get(state, req),
        "policy.update" => policy_update(state, req),
        _ => return None,
    };
    Some(respond(&req.id, &req.method, outcome))
}
