//! REST surface.
//!
//! The gateway mounts a small CRUD API next to the WebSocket endpoint:
//! tenant setup (organizations, employees), attendance clock-in/out, and
//! chat history. Durable writes happen here — the realtime relay only ever
//! broadcasts.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use database::models::{AttendanceRecord, Employee, Organization, StoredMessage};
use database::{attendance, employee, message, organization, Database};
use relay::Relay;

use crate::error::ApiError;
use crate::ws::{self, WsOutbound};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub relay: Relay<WsOutbound>,
}

/// Build the gateway router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::ws_handler))
        .route(
            "/api/organizations",
            post(create_organization).get(list_organizations),
        )
        .route("/api/employees", post(create_employee))
        .route("/api/attendance/clock-in", post(clock_in))
        .route("/api/attendance/clock-out", post(clock_out))
        .route("/api/attendance/:org_id/:date", get(list_attendance))
        .route("/api/messages", post(create_message))
        .route("/api/messages/:room_id", get(list_messages))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok".to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct CreateOrganizationRequest {
    name: String,
    #[serde(default = "default_end_time")]
    end_time: String,
    #[serde(default = "default_logout_offset")]
    auto_logout_offset_hours: i64,
    #[serde(default = "default_true")]
    automation_enabled: bool,
}

fn default_end_time() -> String {
    "18:00".to_string()
}

fn default_logout_offset() -> i64 {
    2
}

fn default_true() -> bool {
    true
}

async fn create_organization(
    State(state): State<AppState>,
    Json(req): Json<CreateOrganizationRequest>,
) -> Result<Json<Organization>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("organization name cannot be empty"));
    }
    if chrono::NaiveTime::parse_from_str(&req.end_time, "%H:%M").is_err() {
        return Err(ApiError::bad_request("end_time must be \"HH:MM\""));
    }

    let org = Organization {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        end_time: req.end_time,
        auto_logout_offset_hours: req.auto_logout_offset_hours,
        automation_enabled: req.automation_enabled,
        active: true,
        created_at: String::new(),
    };
    organization::create_organization(state.db.pool(), &org).await?;

    let created = organization::get_organization(state.db.pool(), &org.id).await?;
    Ok(Json(created))
}

async fn list_organizations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Organization>>, ApiError> {
    let orgs = organization::list_active(state.db.pool()).await?;
    Ok(Json(orgs))
}

#[derive(Debug, Deserialize)]
struct CreateEmployeeRequest {
    org_id: String,
    name: String,
}

async fn create_employee(
    State(state): State<AppState>,
    Json(req): Json<CreateEmployeeRequest>,
) -> Result<Json<Employee>, ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::bad_request("employee name cannot be empty"));
    }
    // 404 on an unknown organization rather than a dangling foreign key.
    organization::get_organization(state.db.pool(), &req.org_id).await?;

    let emp = Employee {
        id: Uuid::new_v4().to_string(),
        org_id: req.org_id,
        name: req.name,
        active: true,
        created_at: String::new(),
    };
    employee::create_employee(state.db.pool(), &emp).await?;

    let created = employee::get_employee(state.db.pool(), &emp.id).await?;
    Ok(Json(created))
}

#[derive(Debug, Deserialize)]
struct ClockInRequest {
    org_id: String,
    employee_id: String,
}

async fn clock_in(
    State(state): State<AppState>,
    Json(req): Json<ClockInRequest>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let emp = employee::get_employee(state.db.pool(), &req.employee_id).await?;
    if emp.org_id != req.org_id {
        return Err(ApiError::bad_request(
            "employee does not belong to organization",
        ));
    }

    let now = Local::now();
    let record = attendance::clock_in(
        state.db.pool(),
        &req.org_id,
        &req.employee_id,
        &now.format("%Y-%m-%d").to_string(),
        &now.to_rfc3339(),
    )
    .await?;
    Ok(Json(record))
}

#[derive(Debug, Deserialize)]
struct ClockOutRequest {
    employee_id: String,
}

async fn clock_out(
    State(state): State<AppState>,
    Json(req): Json<ClockOutRequest>,
) -> Result<Json<AttendanceRecord>, ApiError> {
    let now = Local::now();
    let record = attendance::clock_out(
        state.db.pool(),
        &req.employee_id,
        &now.format("%Y-%m-%d").to_string(),
        &now.to_rfc3339(),
    )
    .await?;
    Ok(Json(record))
}

async fn list_attendance(
    State(state): State<AppState>,
    Path((org_id, date)): Path<(String, String)>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError> {
    organization::get_organization(state.db.pool(), &org_id).await?;
    let records = attendance::list_for_org_date(state.db.pool(), &org_id, &date).await?;
    Ok(Json(records))
}

#[derive(Debug, Deserialize)]
struct CreateMessageRequest {
    #[serde(default)]
    id: Option<String>,
    room_id: String,
    sender_id: String,
    sender_name: String,
    #[serde(default)]
    receiver_id: Option<String>,
    body: String,
}

async fn create_message(
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<Json<StoredMessage>, ApiError> {
    if req.body.is_empty() {
        return Err(ApiError::bad_request("message body cannot be empty"));
    }

    let msg = StoredMessage {
        id: req.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        room_id: req.room_id,
        sender_id: req.sender_id,
        sender_name: req.sender_name,
        receiver_id: req.receiver_id,
        body: req.body,
        sent_at: Local::now().to_rfc3339(),
    };
    message::create_message(state.db.pool(), &msg).await?;
    Ok(Json(msg))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    limit: i64,
}

fn default_history_limit() -> i64 {
    50
}

async fn list_messages(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<StoredMessage>>, ApiError> {
    let messages = message::list_for_room(state.db.pool(), &room_id, query.limit).await?;
    Ok(Json(messages))
}
