use uuid::Uuid;

/// Correlation id attached to every log line of one catalog operation.
pub fn generate_request_id() -> String {
    format!("req-{}", Uuid::new_v4())
}
