use serde::Serialize;

/// Envelope for successful responses: `{"success": true, "data": {...}}`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Empty acknowledgement body (webhook deliveries)
#[derive(Debug, Serialize)]
pub struct Acknowledged {
    pub received: bool,
}

/// Liveness probe response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
