use crate::auth::auth::AuthUser;
use crate::engine::{Decision, LeaveEngine};
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::store::RequestFilter;
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct SubmitLeave {
    #[schema(example = 1)]
    pub leave_type_id: u64,
    #[schema(example = "2026-03-02", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-03-04", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "family trip")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams)]
pub struct LeaveFilterQuery {
    /// Filter by request status
    pub status: Option<LeaveStatus>,
    /// Filter by owning user (company-wide listing only)
    pub user_id: Option<u64>,
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = SubmitLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request created", body = LeaveRequest),
        (status = 400, description = "Malformed input"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Unknown leave type"),
        (status = 409, description = "Insufficient balance (auto-approved types)")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn submit_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    payload: web::Json<SubmitLeave>,
) -> actix_web::Result<HttpResponse> {
    let payload = payload.into_inner();
    let request = engine
        .submit(
            &auth.principal(),
            payload.leave_type_id,
            payload.start_date,
            payload.end_date,
            payload.reason,
        )
        .await?;
    Ok(HttpResponse::Created().json(request))
}

/* =========================
Approve leave (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(("leave_id" = u64, Path, description = "ID of the leave request to approve")),
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 400, description = "Request is no longer pending"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Insufficient balance")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let request = engine
        .decide(&auth.principal(), path.into_inner(), Decision::Approve)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Reject leave (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(("leave_id" = u64, Path, description = "ID of the leave request to reject")),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Request is no longer pending"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let request = engine
        .decide(&auth.principal(), path.into_inner(), Decision::Reject)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Cancel leave (owner or Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(("leave_id" = u64, Path, description = "ID of the leave request to cancel")),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 400, description = "Request already rejected or cancelled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let request = engine.cancel(&auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Fetch one leave request (owner or Manager/Admin)
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = u64, Path, description = "ID of the leave request to fetch")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    path: web::Path<u64>,
) -> actix_web::Result<HttpResponse> {
    let request = engine.request(&auth.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(request))
}

/// Company-wide leave listing (Manager/Admin)
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilterQuery),
    responses(
        (status = 200, description = "Leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveFilterQuery>,
) -> actix_web::Result<HttpResponse> {
    let requests = engine
        .all_requests(
            &auth.principal(),
            RequestFilter {
                user_id: query.user_id,
                status: query.status,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Caller's own requests
#[utoipa::path(
    get,
    path = "/api/leave/mine",
    params(LeaveFilterQuery),
    responses(
        (status = 200, description = "Own leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveFilterQuery>,
) -> actix_web::Result<HttpResponse> {
    let requests = engine
        .own_requests(&auth.principal(), query.status)
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}

/// Requests from the caller's team (Manager/Admin)
#[utoipa::path(
    get,
    path = "/api/leave/team",
    params(LeaveFilterQuery),
    responses(
        (status = 200, description = "Team leave requests", body = [LeaveRequest]),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn team_leaves(
    auth: AuthUser,
    engine: web::Data<LeaveEngine>,
    query: web::Query<LeaveFilterQuery>,
) -> actix_web::Result<HttpResponse> {
    let requests = engine
        .team_requests(&auth.principal(), query.status)
        .await?;
    Ok(HttpResponse::Ok().json(requests))
}
