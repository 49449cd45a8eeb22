use crate::auth::auth::AuthUser;
use crate::engine::LeaveEngine;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

#[derive(Deserialize, IntoParams)]
pub struct BalanceQuery {
    /// Look up another user's balance (Manager/Admin only)
    pub user_id: Option<u64>,
}

/// Remaining balance for a leave type, in days
#[utoipa::path(
    get,
    path = "/api/balance/{leave_type_id}",
    params(
        ("leave_type_id" = u64, Path, description = "Leave type to look up"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Remaining balance", body = Object, example = json!({
            "user_id": 1000,
            "leave_type_id": 1,
            "remaining": 17
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn get_balance(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<HttpResponse> {
    let principal = auth.principal();
    let leave_type_id = path.into_inner();
    let remaining = engine
        .balance(&principal, query.user_id, leave_type_id)
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "user_id": query.user_id.unwrap_or(principal.user_id),
        "leave_type_id": leave_type_id,
        "remaining": remaining
    })))
}
