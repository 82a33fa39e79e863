//! Health check handler and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;
use sysinfo::System;

#[derive(Debug, Default, Serialize)]
pub(super) struct MemoryUsage {
    /// Resident set size of this process
    pub rss_bytes: u64,
    pub virtual_bytes: u64,
    pub system_total_bytes: u64,
    pub system_used_bytes: u64,
}

#[derive(Debug, Serialize)]
pub(super) struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    /// Seconds since startup
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub version: &'static str,
}

fn memory_usage() -> MemoryUsage {
    let mut system = System::new();
    system.refresh_memory();

    let mut usage = MemoryUsage {
        system_total_bytes: system.total_memory(),
        system_used_bytes: system.used_memory(),
        ..MemoryUsage::default()
    };

    match sysinfo::get_current_pid() {
        Ok(pid) => {
            system.refresh_process(pid);
            if let Some(process) = system.process(pid) {
                usage.rss_bytes = process.memory();
                usage.virtual_bytes = process.virtual_memory();
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to resolve current pid for memory stats");
        }
    }

    usage
}

/// Process status: timestamp, uptime, memory and build version.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let memory = tokio::task::spawn_blocking(memory_usage)
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Memory sampling failed");
            MemoryUsage::default()
        });

    let response = HealthResponse {
        status: "OK",
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory,
        version: env!("CARGO_PKG_VERSION"),
    };

    (StatusCode::OK, Json(response))
}
