use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use sysinfo::{Disks, System, MINIMUM_CPU_UPDATE_INTERVAL};

const CPU_SAMPLE_WINDOW: Duration = Duration::from_secs(1);

/// Host utilisation, each value a percentage rounded to two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub cpu_usage: f64,
    pub hdd_usage: f64,
    pub mem_usage: f64,
}

/// Sample CPU over a one-second window, plus current disk and memory use.
pub async fn sample() -> ResourceUsage {
    let mut system = System::new();

    // CPU usage is a delta between two refreshes
    system.refresh_cpu_usage();
    tokio::time::sleep(CPU_SAMPLE_WINDOW.max(MINIMUM_CPU_UPDATE_INTERVAL)).await;
    system.refresh_cpu_usage();
    system.refresh_memory();

    let disks = Disks::new_with_refreshed_list();
    let hdd = disk_percent(
        disks
            .list()
            .iter()
            .map(|d| (d.mount_point(), d.total_space(), d.available_space())),
    );

    ResourceUsage {
        cpu_usage: round2(system.global_cpu_usage() as f64),
        hdd_usage: round2(hdd),
        mem_usage: round2(percent(system.used_memory(), system.total_memory())),
    }
}

/// Usage of the root mount, or of the largest disk when `/` is not listed.
fn disk_percent<'a>(disks: impl Iterator<Item = (&'a Path, u64, u64)>) -> f64 {
    let mut largest: Option<(u64, u64)> = None;
    for (mount, total, available) in disks {
        if mount == Path::new("/") {
            return percent(total.saturating_sub(available), total);
        }
        if largest.map_or(true, |(t, _)| total > t) {
            largest = Some((total, available));
        }
    }
    largest
        .map(|(total, available)| percent(total.saturating_sub(available), total))
        .unwrap_or(0.0)
}

fn percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    used as f64 * 100.0 / total as f64
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
