//! Workflow error types.

use crate::message::{HttpMethod, Response, StatusCode};
use laundry_core::{HardwareFault, MachineRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message carried by every authentication failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Failures of a workflow.
///
/// Every failure path inside the engine is one of these. Only
/// `Unauthorized` leaves `WorkflowEngine::handle` as an error; the rest are
/// turned into ordinary responses.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("invalid token")]
    Unauthorized,

    #[error("machine not found: {machine_id}")]
    MachineNotFound { machine_id: String },

    #[error("no available machine at location {location_id}")]
    NoAvailableMachine { location_id: String },

    #[error("invalid state transition: machine {} is {}", .machine.machine_id, .machine.status)]
    InvalidStateTransition { machine: MachineRecord },

    #[error("{fault}")]
    HardwareFault {
        fault: HardwareFault,
        /// Record after the fault was written back.
        machine: MachineRecord,
    },

    #[error("unknown route: {method} {path}")]
    UnknownRoute { method: HttpMethod, path: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl WorkflowError {
    /// Returns the response status for this failure.
    pub fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::Unauthorized => StatusCode::Unauthorized,
            WorkflowError::MachineNotFound { .. } => StatusCode::NotFound,
            WorkflowError::NoAvailableMachine { .. } => StatusCode::NotFound,
            WorkflowError::InvalidStateTransition { .. } => StatusCode::BadRequest,
            WorkflowError::HardwareFault { .. } => StatusCode::HardwareError,
            WorkflowError::UnknownRoute { .. } => StatusCode::InternalServerError,
            WorkflowError::InvalidRequest(_) => StatusCode::BadRequest,
        }
    }

    /// Converts the failure into a response.
    pub fn into_response(self) -> Response {
        let status_code = self.status_code();
        match self {
            WorkflowError::InvalidStateTransition { machine }
            | WorkflowError::HardwareFault { machine, .. } => {
                Response::new(status_code).with_machine(machine)
            }
            _ => Response::new(status_code),
        }
    }
}

/// Authentication failure raised by `WorkflowEngine::handle`.
///
/// Displays as its JSON form: `{"statusCode":401,"message":"Invalid token"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{}", self.to_json())]
pub struct AuthError {
    pub status_code: StatusCode,
    pub message: String,
}

impl AuthError {
    pub fn invalid_token() -> Self {
        Self {
            status_code: StatusCode::Unauthorized,
            message: INVALID_TOKEN_MESSAGE.to_string(),
        }
    }

    /// Serializes to the JSON payload.
    pub fn to_json(&self) -> String {
        // A status code and a string always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use laundry_core::MachineStatus;

    #[test]
    fn test_status_codes() {
        let machine = MachineRecord::new("m1", "loc-a");
        let cases = [
            (WorkflowError::Unauthorized, 401),
            (
                WorkflowError::MachineNotFound {
                    machine_id: "m1".to_string(),
                },
                404,
            ),
            (
                WorkflowError::NoAvailableMachine {
                    location_id: "loc-a".to_string(),
                },
                404,
            ),
            (
                WorkflowError::InvalidStateTransition {
                    machine: machine.clone(),
                },
                400,
            ),
            (
                WorkflowError::HardwareFault {
                    fault: HardwareFault::new("m1", "jammed"),
                    machine,
                },
                420,
            ),
            (
                WorkflowError::UnknownRoute {
                    method: HttpMethod::Get,
                    path: "/x".to_string(),
                },
                500,
            ),
            (WorkflowError::InvalidRequest("missing jobId".to_string()), 400),
        ];
        for (error, code) in cases {
            assert_eq!(error.status_code().as_u16(), code, "{}", error);
        }
    }

    #[test]
    fn test_into_response_echoes_machine() {
        let machine = MachineRecord::new("m1", "loc-a").with_status(MachineStatus::Running);
        let response = WorkflowError::InvalidStateTransition {
            machine: machine.clone(),
        }
        .into_response();
        assert_eq!(response.status_code, StatusCode::BadRequest);
        assert_eq!(response.machine, Some(machine));

        let response = WorkflowError::MachineNotFound {
            machine_id: "m1".to_string(),
        }
        .into_response();
        assert_eq!(response.status_code, StatusCode::NotFound);
        assert!(response.machine.is_none());
    }

    #[test]
    fn test_auth_error_payload() {
        let error = AuthError::invalid_token();
        assert_eq!(error.to_string(), r#"{"statusCode":401,"message":"Invalid token"}"#);

        let value = serde_json::to_value(&error).unwrap();
        assert_eq!(value["statusCode"], 401);
        assert_eq!(value["message"], "Invalid token");
    }

    #[test]
    fn test_auth_error_as_boxed_error() {
        let boxed: Box<dyn std::error::Error> = Box::new(AuthError::invalid_token());
        assert!(boxed.source().is_none());
        assert_eq!(
            boxed.to_string(),
            r#"{"statusCode":401,"message":"Invalid token"}"#
        );
    }
}
