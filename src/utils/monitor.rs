#[cfg(feature = "cli")]
use sysinfo::{Pid, RefreshKind, System};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Snapshot taken when a run phase (load, sample, write) finishes.
#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: String,
    pub phase_time: Duration,
    pub total_time: Duration,
    pub memory_usage_mb: Option<u64>,
    pub peak_memory_mb: Option<u64>,
    pub cpu_usage: Option<f32>,
}

#[derive(Debug)]
struct MonitorState {
    phase_start: Instant,
    peak_memory_mb: u64,
    reports: Vec<PhaseReport>,
}

pub struct SystemMonitor {
    #[cfg(feature = "cli")]
    system: Mutex<System>,
    #[cfg(feature = "cli")]
    pid: Option<Pid>,
    start_time: Instant,
    state: Mutex<MonitorState>,
    enabled: bool,
}

impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let now = Instant::now();
        Self {
            #[cfg(feature = "cli")]
            system: Mutex::new(if enabled {
                System::new_with_specifics(RefreshKind::everything())
            } else {
                System::new()
            }),
            #[cfg(feature = "cli")]
            pid: sysinfo::get_current_pid().ok(),
            start_time: now,
            state: Mutex::new(MonitorState {
                phase_start: now,
                peak_memory_mb: 0,
                reports: Vec::new(),
            }),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// (memory MB, CPU %) of this process, when available.
    #[cfg(feature = "cli")]
    fn process_usage(&self) -> Option<(u64, f32)> {
        let pid = self.pid?;
        let mut system = self.system.lock().ok()?;
        system.refresh_all();
        let process = system.process(pid)?;
        Some((process.memory() / 1024 / 1024, process.cpu_usage()))
    }

    #[cfg(not(feature = "cli"))]
    fn process_usage(&self) -> Option<(u64, f32)> {
        None
    }

    /// Closes the current phase and logs its report.
    pub fn end_phase(&self, phase: &str) -> Option<PhaseReport> {
        if !self.enabled {
            return None;
        }

        let usage = self.process_usage();
        let mut state = self.state.lock().ok()?;
        let now = Instant::now();

        if let Some((memory_mb, _)) = usage {
            state.peak_memory_mb = state.peak_memory_mb.max(memory_mb);
        }

        let report = PhaseReport {
            phase: phase.to_string(),
            phase_time: now.duration_since(state.phase_start),
            total_time: now.duration_since(self.start_time),
            memory_usage_mb: usage.map(|(memory_mb, _)| memory_mb),
            peak_memory_mb: usage.map(|_| state.peak_memory_mb),
            cpu_usage: usage.map(|(_, cpu)| cpu),
        };
        state.phase_start = now;
        state.reports.push(report.clone());

        match (report.memory_usage_mb, report.cpu_usage) {
            (Some(memory), Some(cpu)) => tracing::info!(
                "📊 {} - {:?} (CPU: {:.1}%, Memory: {}MB, Peak: {}MB)",
                phase,
                report.phase_time,
                cpu,
                memory,
                state.peak_memory_mb
            ),
            _ => tracing::info!("📊 {} - {:?}", phase, report.phase_time),
        }

        Some(report)
    }

    pub fn reports(&self) -> Vec<PhaseReport> {
        self.state
            .lock()
            .map(|state| state.reports.clone())
            .unwrap_or_default()
    }

    pub fn log_final_stats(&self) {
        if !self.enabled {
            return;
        }
        let peak = self.state.lock().map(|s| s.peak_memory_mb).unwrap_or(0);
        tracing::info!(
            "📊 Final Stats - Total Time: {:?}, Peak Memory: {}MB",
            self.start_time.elapsed(),
            peak
        );
    }
}

impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}
