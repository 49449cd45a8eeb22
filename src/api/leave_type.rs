use crate::auth::auth::AuthUser;
use crate::engine::LeaveEngine;
use crate::model::leave_type::{LeaveType, LeaveTypePatch, NewLeaveType};
use actix_web::{HttpResponse, web};
use serde_json::json;

/* =========================
Create leave type (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-type",
    request_body = NewLeaveType,
    responses(
        (status = 201, description = "Leave type created", body = LeaveType),
        (status = 400, description = "Invalid name or category"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn create_leave_type(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    payload: web::Json<NewLeaveType>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let ty = engine.catalog().create(payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(ty))
}

/// List all leave types
#[utoipa::path(
    get,
    path = "/api/leave-type",
    responses(
        (status = 200, description = "All leave types", body = [LeaveType]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn list_leave_types(
    _auth: AuthUser,
    engine: web::Data<LeaveEngine>,
) -> actix_web::Result<HttpResponse> {
    let types = engine.catalog().list().await?;
    Ok(HttpResponse::Ok().json(types))
}

/// Fetch one leave type
#[utoipa::path(
    get,
    path = "/api/leave-type/{type_id}",
    params(("type_id" = u64, Path, description = "ID of the leave type")),
    responses(
        (status = 200, description = "Leave type found", body = LeaveType),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn get_leave_type(
    _auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let ty = engine.catalog().get(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(ty))
}

/* =========================
Update leave type (Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave-type/{type_id}",
    params(("type_id" = u64, Path, description = "ID of the leave type to update")),
    request_body = LeaveTypePatch,
    responses(
        (status = 200, description = "Leave type updated", body = LeaveType),
        (status = 400, description = "Invalid name or category"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn update_leave_type(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
    payload: web::Json<LeaveTypePatch>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    let ty = engine
        .catalog()
        .update(path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ty))
}

/* =========================
Delete leave type (Admin)
========================= */
#[utoipa::path(
    delete,
    path = "/api/leave-type/{type_id}",
    params(("type_id" = u64, Path, description = "ID of the leave type to delete")),
    responses(
        (status = 200, description = "Leave type deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave type not found"),
        (status = 409, description = "Leave type is referenced by requests")
    ),
    security(("bearer_auth" = [])),
    tag = "LeaveType"
)]
pub async fn delete_leave_type(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    auth.require_admin()?;
    engine.catalog().delete(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Leave type deleted"
    })))
}
