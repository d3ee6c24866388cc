use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use service::AppState;
use sysinfo::{ProcessesToUpdate, System, MINIMUM_CPU_UPDATE_INTERVAL};
use utoipa::ToSchema;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Serialize, ToSchema)]
pub struct SystemMetrics {
    /// RFC3339 time the snapshot was taken.
    pub timestamp: String,
    pub system_memory: SystemMemory,
    pub cpu: Cpu,
    pub process_memory: ProcessMemory,
    pub runtime: Runtime,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SystemMemory {
    pub total_mb: u64,
    pub used_mb: u64,
    pub used_percent: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Cpu {
    pub usage_percent: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProcessMemory {
    pub resident_mb: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Runtime {
    pub workers: usize,
    pub alive_tasks: usize,
    pub sessions: usize,
}

/// GET snapshot of host and runtime resource usage
#[utoipa::path(
    get,
    path = "/metrics/system",
    responses(
        (status = 200, description = "Host memory, CPU and runtime snapshot", body = SystemMetrics),
    )
)]
pub async fn system_metrics(State(app_state): State<AppState>) -> impl IntoResponse {
    let mut system = System::new();
    system.refresh_memory();

    // CPU usage is the difference between two refreshes
    system.refresh_cpu_usage();
    tokio::time::sleep(MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_cpu_usage();

    let process_bytes = sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| {
            system.refresh_processes(ProcessesToUpdate::Some(&[pid]), false);
            system.process(pid).map(sysinfo::Process::memory)
        })
        .unwrap_or(0);

    let runtime = tokio::runtime::Handle::current().metrics();

    Json(SystemMetrics {
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        system_memory: SystemMemory {
            total_mb: system.total_memory() / BYTES_PER_MB,
            used_mb: system.used_memory() / BYTES_PER_MB,
            used_percent: format!(
                "{:.2}",
                percent(system.used_memory(), system.total_memory())
            ),
        },
        cpu: Cpu {
            usage_percent: format!("{:.2}", system.global_cpu_usage()),
        },
        process_memory: ProcessMemory {
            resident_mb: format!("{:.2}", process_bytes as f64 / BYTES_PER_MB as f64),
        },
        runtime: Runtime {
            workers: runtime.num_workers(),
            alive_tasks: runtime.num_alive_tasks(),
            sessions: app_state.sse_manager.session_count(),
        },
    })
}

fn percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}
