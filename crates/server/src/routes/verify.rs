// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /v1/verify`: bearer validation and plan report.
//!
//! Billing is out of scope here; validity derives from the token check
//! the [`Identity`] extractor already performed.

use crate::auth::Identity;
use crate::state::SharedState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

pub async fn verify(State(_state): State<SharedState>, identity: Identity) -> Json<Value> {
    Json(json!({
        "valid": true,
        "plan": identity.plan,
        "validUntil": Value::Null,
    }))
}
