//! Threshold alerting with cooldown de-duplication.
//!
//! Windowed metric counts are compared against per-window warning/critical
//! limits; the first breach wins and at most one alert is attempted per
//! check. Cooldown state lives in the key-value collaborator behind an
//! atomic set-if-not-exists, so concurrent breaches of the same key still
//! produce a single alert. Delivery itself is the notifier's problem.

use crate::analysis::Severity;
use crate::config::ConfigHandle;
use crate::store::KvStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Error type for alert delivery.
#[derive(Debug)]
pub enum NotifyError {
    Delivery(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::Delivery(msg) => write!(f, "alert delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Notification collaborator (email, chat, pager). External to this crate.
pub trait Notifier: Send + Sync {
    fn send_alert(
        &self,
        subject: &str,
        message: &str,
        severity: Severity,
    ) -> Result<(), NotifyError>;
}

/// Evaluation windows, checked shortest first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertWindow {
    OneMinute,
    FiveMinutes,
    FifteenMinutes,
    OneHour,
}

impl AlertWindow {
    pub const ALL: [AlertWindow; 4] = [
        AlertWindow::OneMinute,
        AlertWindow::FiveMinutes,
        AlertWindow::FifteenMinutes,
        AlertWindow::OneHour,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            AlertWindow::OneMinute => "1min",
            AlertWindow::FiveMinutes => "5min",
            AlertWindow::FifteenMinutes => "15min",
            AlertWindow::OneHour => "1hour",
        }
    }
}

/// Limits for one window; `None` disables that severity.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowThresholds {
    pub warning: Option<u64>,
    pub critical: Option<u64>,
}

/// Per-window limits for one metric.
#[derive(Clone, Copy, Debug, Default)]
pub struct AlertThresholds {
    pub one_minute: WindowThresholds,
    pub five_minutes: WindowThresholds,
    pub fifteen_minutes: WindowThresholds,
    pub one_hour: WindowThresholds,
}

impl AlertThresholds {
    fn for_window(&self, window: AlertWindow) -> WindowThresholds {
        match window {
            AlertWindow::OneMinute => self.one_minute,
            AlertWindow::FiveMinutes => self.five_minutes,
            AlertWindow::FifteenMinutes => self.fifteen_minutes,
            AlertWindow::OneHour => self.one_hour,
        }
    }
}

/// Live counts of a metric per window.
#[derive(Clone, Copy, Debug, Default)]
pub struct WindowedCounts {
    pub one_minute: u64,
    pub five_minutes: u64,
    pub fifteen_minutes: u64,
    pub one_hour: u64,
}

impl WindowedCounts {
    fn for_window(&self, window: AlertWindow) -> u64 {
        match window {
            AlertWindow::OneMinute => self.one_minute,
            AlertWindow::FiveMinutes => self.five_minutes,
            AlertWindow::FifteenMinutes => self.fifteen_minutes,
            AlertWindow::OneHour => self.one_hour,
        }
    }
}

pub struct ThresholdAlerter {
    config: ConfigHandle,
    kv: Arc<dyn KvStore>,
    notifier: Arc<dyn Notifier>,
}

impl ThresholdAlerter {
    pub fn new(config: ConfigHandle, kv: Arc<dyn KvStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            config,
            kv,
            notifier,
        }
    }

    /// Checks `counts` against `thresholds` and sends at most one alert.
    ///
    /// Per window, critical is checked before warning; the first breached
    /// (window, severity) pair stops further evaluation so a single spike
    /// cannot fan out into one alert per window.
    pub fn check_and_alert(
        &self,
        metric: &str,
        counts: &WindowedCounts,
        thresholds: &AlertThresholds,
    ) {
        for window in AlertWindow::ALL {
            let limits = thresholds.for_window(window);
            let count = counts.for_window(window);

            let breach = if limits.critical.is_some_and(|limit| count > limit) {
                Some((Severity::High, "critical", limits.critical))
            } else if limits.warning.is_some_and(|limit| count > limit) {
                Some((Severity::Medium, "warning", limits.warning))
            } else {
                None
            };

            if let Some((severity, label, limit)) = breach {
                self.deliver(metric, window, label, severity, count, limit.unwrap_or(0));
                return;
            }
        }
    }

    fn deliver(
        &self,
        metric: &str,
        window: AlertWindow,
        label: &str,
        severity: Severity,
        count: u64,
        limit: u64,
    ) {
        let key = format!("alert_cooldown:{}:{}:{}", metric, window.label(), label);
        let ttl = self.config.load().alert_cooldown_seconds;
        match self.kv.set_nx_with_ttl(&key, "1", ttl) {
            Ok(true) => {}
            Ok(false) => {
                debug!("alert for {} suppressed by cooldown", key);
                return;
            }
            // Fail open: a broken cooldown store must not silence alerting.
            Err(err) => warn!("cooldown state unavailable ({}), sending anyway", err),
        }

        let subject = format!("{} {} threshold exceeded", metric, label);
        let message = format!(
            "{}: {} events in the last {} (limit {})",
            metric,
            count,
            window.label(),
            limit,
        );
        if let Err(err) = self.notifier.send_alert(&subject, &message, severity) {
            // No synchronous retry; the next evaluation cycle re-attempts
            // once the condition persists and the cooldown expires.
            warn!("{}", err);
        }
    }
}
