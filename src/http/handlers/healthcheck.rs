use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::http::server::AppState;

pub async fn healthcheck(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "environment": state.config.listener.environment,
            "version": env!("CARGO_PKG_VERSION"),
        }
    }))
}
