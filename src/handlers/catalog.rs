use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};

use crate::db::queries;
use crate::errors::AppError;
use crate::state::AppState;

// GET /api/packages
pub async fn list_packages(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let packages = {
        let db = state.db()?;
        queries::list_packages(&db)?
    };
    Ok(Json(json!({ "success": true, "packages": packages })))
}

// GET /api/packages/:id
pub async fn get_package(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let package = {
        let db = state.db()?;
        queries::get_package(&db, &id)?
    }
    .ok_or_else(|| AppError::NotFound("Package".into()))?;

    Ok(Json(json!({ "success": true, "package": package })))
}

// GET /api/guides
pub async fn list_guides(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let guides = {
        let db = state.db()?;
        queries::list_guides(&db)?
    };
    Ok(Json(json!({ "success": true, "guides": guides })))
}

// GET /api/vehicles
pub async fn list_vehicles(State(state): State<Arc<AppState>>) -> Result<Json<Value>, AppError> {
    let vehicles = {
        let db = state.db()?;
        queries::list_vehicles(&db)?
    };
    Ok(Json(json!({ "success": true, "vehicles": vehicles })))
}
