use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub email: String,
}

// ---------------------------------------------------------------------------
// Alerts
// ---------------------------------------------------------------------------

/// A server-recorded threshold-exceedance event tied to a device.
///
/// The gateway's wire names come from the original Spanish-language backend
/// (`estado`, `activacion`, `desactivacion`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    /// Sensor reading that tripped the alert, in °C
    #[serde(rename = "estado")]
    pub value: f64,
    #[serde(rename = "activacion")]
    pub activation_time: DateTime<Utc>,
    #[serde(rename = "desactivacion")]
    pub deactivation_time: Option<DateTime<Utc>>,
    #[serde(rename = "serial")]
    pub device_serial: String,
}
