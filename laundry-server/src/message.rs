//! Request and response types.

use laundry_core::MachineRecord;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Supported request methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response status codes. Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Ok,
    /// Reserved; no workflow produces it yet.
    Created,
    BadRequest,
    Unauthorized,
    NotFound,
    /// Non-standard: the machine faulted while executing a command.
    HardwareError,
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric code.
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::NotFound => 404,
            StatusCode::HardwareError => 420,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Maps a numeric code back to a known status.
    pub fn from_u16(code: u16) -> Option<Self> {
        match code {
            200 => Some(StatusCode::Ok),
            201 => Some(StatusCode::Created),
            400 => Some(StatusCode::BadRequest),
            401 => Some(StatusCode::Unauthorized),
            404 => Some(StatusCode::NotFound),
            420 => Some(StatusCode::HardwareError),
            500 => Some(StatusCode::InternalServerError),
            _ => None,
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u16())
    }
}

impl Serialize for StatusCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

impl<'de> Deserialize<'de> for StatusCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = u16::deserialize(deserializer)?;
        StatusCode::from_u16(code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown status code: {}", code)))
    }
}

/// An inbound request, as produced by the transport.
///
/// Operation-specific fields (`locationId`, `jobId` for reservations) sit
/// next to the envelope fields on the wire and are collected in `params`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub method: HttpMethod,
    pub path: String,
    pub token: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl Request {
    /// Creates a request with no operation fields.
    pub fn new(method: HttpMethod, path: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            token: token.into(),
            params: Map::new(),
        }
    }

    /// Replaces the operation fields. Non-object values are ignored.
    pub fn with_params(mut self, params: Value) -> Self {
        if let Value::Object(map) = params {
            self.params = map;
        }
        self
    }

    /// `POST /machine/request` for `job_id` at `location_id`.
    pub fn reserve(
        token: impl Into<String>,
        location_id: impl Into<String>,
        job_id: impl Into<String>,
    ) -> Self {
        let mut request = Self::new(HttpMethod::Post, "/machine/request", token);
        request
            .params
            .insert("locationId".to_string(), Value::String(location_id.into()));
        request
            .params
            .insert("jobId".to_string(), Value::String(job_id.into()));
        request
    }

    /// `GET /machine/{machine_id}`.
    pub fn inspect(token: impl Into<String>, machine_id: &str) -> Self {
        Self::new(HttpMethod::Get, format!("/machine/{}", machine_id), token)
    }

    /// `POST /machine/{machine_id}/start`.
    pub fn start(token: impl Into<String>, machine_id: &str) -> Self {
        Self::new(HttpMethod::Post, format!("/machine/{}/start", machine_id), token)
    }
}

/// Fields of a reservation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveParams {
    pub location_id: String,
    pub job_id: String,
}

impl ReserveParams {
    /// Extracts the reservation fields from a request.
    pub fn from_request(request: &Request) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(request.params.clone()))
    }
}

/// Outcome of a handled request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine: Option<MachineRecord>,
}

impl Response {
    /// Creates a response without a machine.
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            status_code,
            machine: None,
        }
    }

    /// `200` carrying `machine`.
    pub fn ok(machine: MachineRecord) -> Self {
        Self::new(StatusCode::Ok).with_machine(machine)
    }

    /// Attaches a machine record.
    pub fn with_machine(mut self, machine: MachineRecord) -> Self {
        self.machine = Some(machine);
        self
    }
}
