//! Route resolution.

use crate::message::HttpMethod;

/// The operations the workflow engine serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `POST /machine/request`
    Reserve,
    /// `GET /machine/{id}`
    Inspect { machine_id: String },
    /// `POST /machine/{id}/start`
    Start { machine_id: String },
}

impl Route {
    /// Matches `(method, path)` against the known patterns.
    ///
    /// Paths must be absolute and have no trailing slash; machine IDs must
    /// be non-empty.
    pub fn resolve(method: HttpMethod, path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.strip_prefix('/')?.split('/').collect();
        match (method, segments.as_slice()) {
            (HttpMethod::Post, ["machine", "request"]) => Some(Route::Reserve),
            (HttpMethod::Get, ["machine", id]) if !id.is_empty() => Some(Route::Inspect {
                machine_id: id.to_string(),
            }),
            (HttpMethod::Post, ["machine", id, "start"]) if !id.is_empty() => Some(Route::Start {
                machine_id: id.to_string(),
            }),
            _ => None,
        }
    }

    /// Returns the metric label for this route.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Reserve => "RESERVE",
            Route::Inspect { .. } => "INSPECT",
            Route::Start { .. } => "START",
        }
    }
}
