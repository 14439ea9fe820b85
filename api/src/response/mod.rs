use serde::Serialize;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// Every endpoint answers with the same shape:
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// Failures keep `success: false` and put a stable machine-readable `code`
/// (plus any error-specific fields) inside `data`:
/// ```json
/// {
///   "success": false,
///   "data": { "code": "OUTSIDE_GEOFENCE", "distance_m": 151.2, "radius_m": 100.0 },
///   "message": "Outside the allowed area: 151.2 m from the location, radius is 100 m"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
        }
    }

    /// Constructs an error response carrying `data` (usually the error code and details).
    pub fn failure(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            message: message.into(),
        }
    }
}
