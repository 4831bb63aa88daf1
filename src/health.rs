use crate::config::MailTransportKind;
use crate::state::AppState;
use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::SystemTime;

/// Health status for a component or the overall system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Serving, but something needs attention
    Degraded,
}

impl HealthStatus {
    /// A degraded component still serves requests, so both map to 200.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::OK
    }

    /// Combines two health statuses, returning the worse of the two
    pub fn combine(self, other: Self) -> Self {
        match (self, other) {
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub component: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ComponentHealth {
    pub fn healthy_with_details(component: impl Into<String>, details: serde_json::Value) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Healthy,
            error: None,
            details: Some(details),
        }
    }

    pub fn degraded(component: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            status: HealthStatus::Degraded,
            error: Some(error.into()),
            details: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub timestamp: i64,
    pub version: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<ComponentHealth>,
}

impl HealthResponse {
    fn new(status: HealthStatus, components: Vec<ComponentHealth>) -> Self {
        Self {
            status,
            timestamp: SystemTime::now()
                .duration_since(SystemTime::UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64,
            version: env!("CARGO_PKG_VERSION").to_string(),
            components,
        }
    }
}

impl IntoResponse for HealthResponse {
    fn into_response(self) -> Response {
        (self.status.status_code(), Json(self)).into_response()
    }
}

pub fn check_components(state: &AppState) -> Vec<ComponentHealth> {
    let store = state.directory().store();
    let directory = ComponentHealth::healthy_with_details(
        "directory",
        serde_json::json!({
            "employees": store.employee_count(),
            "extensions": store.extension_count(),
        }),
    );

    // Notifications still "work" with the log transport, but nothing is delivered.
    let mail = match state.config().mail.transport {
        MailTransportKind::Smtp => ComponentHealth::healthy_with_details(
            "mail",
            serde_json::json!({
                "transport": "smtp",
                "relay": state.config().mail.smtp_host,
            }),
        ),
        MailTransportKind::Log => {
            ComponentHealth::degraded("mail", "log transport configured; mail is not delivered")
        }
    };

    vec![directory, mail]
}

/// Liveness: the process is up.
pub async fn liveness_handler() -> HealthResponse {
    HealthResponse::new(HealthStatus::Healthy, Vec::new())
}

/// Readiness: component breakdown.
pub async fn readiness_handler(State(state): State<Arc<AppState>>) -> HealthResponse {
    let components = check_components(&state);
    let status = components
        .iter()
        .fold(HealthStatus::Healthy, |acc, c| acc.combine(c.status));
    HealthResponse::new(status, components)
}
