use crate::api::leave_request::SubmitLeave;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::model::leave_type::{LeaveCategory, LeaveType, LeaveTypePatch, NewLeaveType};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Management API",
        version = "1.0.0",
        description = r#"
## Leave Management Service

This API powers a staff leave-management service.

### Key Features
- **Leave Types**
  - Administer categories of absence and their policy flags
- **Leave Requests**
  - Submit, approve/reject, and cancel time-off requests
- **Balances**
  - Per-user, per-type running day balances

### Security
All endpoints require **JWT Bearer authentication**. Decision
endpoints are restricted to **Manager** or **Admin** roles; leave
type administration is **Admin** only.

### Response Format
JSON-based RESTful responses.

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::submit_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::team_leaves,

        crate::api::leave_type::create_leave_type,
        crate::api::leave_type::list_leave_types,
        crate::api::leave_type::get_leave_type,
        crate::api::leave_type::update_leave_type,
        crate::api::leave_type::delete_leave_type,

        crate::api::balance::get_balance,
    ),
    components(
        schemas(
            SubmitLeave,
            LeaveRequest,
            LeaveStatus,
            LeaveType,
            LeaveCategory,
            NewLeaveType,
            LeaveTypePatch,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "LeaveType", description = "Leave type catalog APIs"),
        (name = "Balance", description = "Leave balance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
