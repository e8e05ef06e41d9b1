use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use sqlab_models::SqlabError;

use crate::error::ApiResult;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new().route("/events/role-assigned", post(role_assigned))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignedEvent {
    pub role_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignedResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
}

/// Enrollment hook: provision a sandbox database for newly assigned
/// learners. Assignments of other roles are acknowledged and ignored.
pub async fn role_assigned(
    State(state): State<AppState>,
    Json(event): Json<RoleAssignedEvent>,
) -> ApiResult<Json<RoleAssignedResponse>> {
    if !state.provisioner.handles_role(event.role_id) {
        return Ok(Json(RoleAssignedResponse {
            status: "ignored",
            role_name: None,
        }));
    }

    let user = state
        .store
        .get_user(event.user_id)
        .await?
        .ok_or_else(|| SqlabError::not_found("user", event.user_id))?;

    let credential = state.provisioner.provision_if_absent(&user).await?;

    Ok(Json(RoleAssignedResponse {
        status: "success",
        role_name: Some(credential.role_name),
    }))
}
