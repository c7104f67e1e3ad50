//! Metric names and Prometheus exporter setup.

use std::net::{Ipv4Addr, SocketAddr};

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

pub const RESERVATIONS_CREATED_TOTAL: &str = "backline_reservations_created_total";
pub const CONFLICTS_REJECTED_TOTAL: &str = "backline_conflicts_rejected_total";
pub const ALERTS_EMITTED_TOTAL: &str = "backline_alerts_emitted_total";

pub const SWEEPS_TOTAL: &str = "backline_monitor_sweeps_total";
pub const SWEEP_DURATION_SECONDS: &str = "backline_monitor_sweep_duration_seconds";
pub const SWEEP_WRITE_FAILURES_TOTAL: &str = "backline_monitor_write_failures_total";
pub const LATE_WARNINGS_TOTAL: &str = "backline_late_warnings_total";
pub const NO_SHOW_CANCELLATIONS_TOTAL: &str = "backline_no_show_cancellations_total";
pub const AUTO_CHECKOUTS_TOTAL: &str = "backline_auto_checkouts_total";

/// Install the Prometheus recorder, serving `/metrics` on `port` when one
/// is given. Without a port the recorder still collects, for embedders that
/// scrape through their own surface.
pub fn init(port: Option<u16>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let builder = PrometheusBuilder::new();
    match port {
        Some(port) => {
            let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
            builder.with_http_listener(addr).install()?;
            info!(%addr, "prometheus exporter listening");
        }
        None => {
            builder.install_recorder()?;
        }
    }
    Ok(())
}
