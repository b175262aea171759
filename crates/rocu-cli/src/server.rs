use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{ws::WebSocketUpgrade, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{debug, warn};

use rocu_nav::{mission_log_csv, Autopilot, MissionAction};
use rocu_proto::{CommandAck, DriveCommand, Health, Metrics, MissionUpload, QosAdvice, VideoTarget};
use rocu_qos::BitrateAdvisor;
use rocu_session::{relay_drive, SessionState};

use crate::ws;

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<SessionState>,
    pub autopilot: Arc<Autopilot>,
    pub qos: Arc<BitrateAdvisor>,
}

pub fn router(state: AppState, static_dir: Option<&Path>, cors_permissive: bool) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/api/v1/metrics", get(metrics))
        .route("/api/v1/cmd/drive", post(cmd_drive))
        .route("/api/v1/mission", post(set_mission))
        .route("/api/v1/mission/control", post(mission_control))
        .route("/api/v1/mission/log.csv", get(mission_csv))
        .route("/api/v1/webrtc/qos", post(webrtc_qos))
        .route("/api/v1/video/target", post(video_target))
        .route("/ws/telemetry", get(ws_telemetry))
        .route("/ws/sim", get(ws_sim))
        .with_state(state);

    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true));
    }
    if cors_permissive {
        app = app.layer(CorsLayer::permissive());
    }
    app
}

async fn health(State(st): State<AppState>) -> Json<Health> {
    Json(Health { status: "ok".into(), uptime_s: st.session.uptime().as_secs_f64() })
}

async fn metrics(State(st): State<AppState>) -> Json<Metrics> {
    Json(st.session.metrics())
}

async fn cmd_drive(State(st): State<AppState>, Json(cmd): Json<DriveCommand>) -> Json<CommandAck> {
    Json(relay_drive(&st.session, cmd).await)
}

async fn set_mission(State(st): State<AppState>, Json(m): Json<MissionUpload>) -> Json<Value> {
    let count = st.autopilot.set_mission(m.waypoints);
    Json(json!({ "ok": true, "count": count }))
}

#[derive(Debug, Default, Deserialize)]
struct ControlRequest {
    #[serde(default)]
    action: Option<String>,
}

async fn mission_control(State(st): State<AppState>, Json(req): Json<ControlRequest>) -> Json<Value> {
    let status = match req.action.unwrap_or_default().parse::<MissionAction>() {
        Ok(action) => st.autopilot.control(action).await,
        Err(e) => {
            debug!("mission control: {}", e);
            st.autopilot.status()
        }
    };
    Json(json!({ "ok": true, "state": status }))
}

async fn mission_csv(State(st): State<AppState>) -> Response {
    match mission_log_csv(st.autopilot.log()).await {
        Ok(csv) => ([(header::CONTENT_TYPE, "text/csv")], csv).into_response(),
        Err(e) => {
            warn!("mission log export failed: {:#}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "mission log unavailable").into_response()
        }
    }
}

// Malformed reports get no advice and are not logged.
async fn webrtc_qos(State(st): State<AppState>, body: Bytes) -> Json<QosAdvice> {
    let advice = match serde_json::from_slice::<Map<String, Value>>(&body) {
        Ok(payload) => st.qos.report(payload, st.session.wall_now()).await,
        Err(e) => Err(e),
    };
    match advice {
        Ok(advice) => Json(advice),
        Err(e) => {
            debug!("qos: dropping malformed report: {}", e);
            Json(QosAdvice { recommend_max_kbps: None })
        }
    }
}

async fn video_target(State(st): State<AppState>, Json(t): Json<VideoTarget>) -> Json<VideoTarget> {
    st.qos.set_target_kbps(t.max_kbps);
    Json(VideoTarget { max_kbps: st.qos.target_kbps() })
}

async fn ws_telemetry(State(st): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| ws::observer_socket(socket, st.session))
}

async fn ws_sim(State(st): State<AppState>, upgrade: WebSocketUpgrade) -> Response {
    upgrade.on_upgrade(move |socket| ws::vehicle_socket(socket, st.session))
}
