use crate::model::leave_request::LeaveRequest;

/// Observer informed after a transition commits. Fire-and-forget:
/// the signature cannot fail, so a broken notifier can never roll
/// back a committed transition.
pub trait TransitionNotifier: Send + Sync {
    fn notify(&self, request: &LeaveRequest, actor: Option<u64>);
}

/// Default notifier; writes transitions to the tracing log.
pub struct TracingNotifier;

impl TransitionNotifier for TracingNotifier {
    fn notify(&self, request: &LeaveRequest, actor: Option<u64>) {
        tracing::info!(
            request_id = request.id,
            user_id = request.user_id,
            status = %request.status,
            actor = ?actor,
            "leave request transition"
        );
    }
}
