use crate::{
    auth::auth,
    models::{DiagnosticsResponse, ErrorResponse},
    AppState,
};
use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Process diagnostics
pub async fn diagnostics(
    State(state): State<Arc<AppState>>,
    Extension(prpls): Extension<Vec<String>>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {
    // Ensure the user is a cloud admin
    let _ = auth::ensure_cloud_admin(&prpls)?;

    // Aggregate counters from the core registries
    let dispatcher = &state.dispatcher;
    let sessions = dispatcher.sessions().all();
    let n_sessions = sessions.len() as u32;
    let mut n_attached: u32 = 0;
    let mut n_awareness: u32 = 0;
    for session in &sessions {
        n_attached += session.connection_count() as u32;
        n_awareness += session.awareness_count() as u32;
    }

    let groups = dispatcher.groups().all();
    let n_groups = groups.len() as u32;
    let mut n_group_users: u32 = 0;
    for group in &groups {
        n_group_users += group.user_count() as u32;
    }

    let n_conn = dispatcher.connections().len() as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Sessions: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_conn,
        n_sessions
    );

    return Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn,
            n_sessions,
            n_attached,
            n_awareness,
            n_groups,
            n_group_users,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ));
}
