//! Worker health evaluation and heartbeat history buckets.

use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;

use crate::models::setting::Setting;
use crate::models::worker::Worker;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitoringThresholds {
    pub heartbeat_minutes: i64,
    pub cpu_percent: f64,
    pub memory_percent: f64,
}

impl Default for MonitoringThresholds {
    fn default() -> Self {
        Self {
            heartbeat_minutes: 5,
            cpu_percent: 90.0,
            memory_percent: 90.0,
        }
    }
}

impl MonitoringThresholds {
    /// Applies the monitoring values saved on the settings page. Values that
    /// do not parse keep the current threshold.
    pub fn with_overrides(mut self, stored: &[Setting]) -> Self {
        for setting in stored {
            let value = setting.value.trim();
            match setting.key.as_str() {
                "heartbeat_threshold_minutes" => {
                    if let Ok(minutes) = value.parse::<i64>() {
                        self.heartbeat_minutes = minutes.max(1);
                    }
                }
                "cpu_threshold" => {
                    if let Ok(percent) = value.parse::<f64>() {
                        self.cpu_percent = percent;
                    }
                }
                "memory_threshold" => {
                    if let Ok(percent) = value.parse::<f64>() {
                        self.memory_percent = percent;
                    }
                }
                _ => {}
            }
        }
        self
    }
}

/// Failure rate above which a worker counts as failing.
const FAILING_RATE: f64 = 0.5;
/// Minimum finished tasks before the failure rate is judged.
const FAILING_MIN_TASKS: i64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerAlert {
    /// `minutes_since` is `None` when the worker never reported.
    HeartbeatMissed { minutes_since: Option<i64> },
    HighCpu { usage: f64 },
    HighMemory { usage: f64 },
    Failing { failure_rate: f64 },
}

impl WorkerAlert {
    pub fn message(&self, worker_name: &str) -> String {
        match self {
            WorkerAlert::HeartbeatMissed { minutes_since: Some(m) } => {
                format!("{} has not sent a heartbeat for {} minutes", worker_name, m)
            }
            WorkerAlert::HeartbeatMissed { minutes_since: None } => {
                format!("{} has never sent a heartbeat", worker_name)
            }
            WorkerAlert::HighCpu { usage } => format!("{} CPU usage at {:.1}%", worker_name, usage),
            WorkerAlert::HighMemory { usage } => {
                format!("{} memory usage at {:.1}%", worker_name, usage)
            }
            WorkerAlert::Failing { failure_rate } => format!(
                "{} is failing {:.0}% of its tasks",
                worker_name,
                failure_rate * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkerHealth {
    pub healthy: bool,
    pub alerts: Vec<WorkerAlert>,
}

impl MonitoringThresholds {
    pub fn heartbeat_stale(&self, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last {
            Some(at) => now - at > Duration::minutes(self.heartbeat_minutes),
            None => true,
        }
    }

    pub fn evaluate(&self, worker: &Worker, now: DateTime<Utc>) -> WorkerHealth {
        let mut alerts = Vec::new();

        if self.heartbeat_stale(worker.last_heartbeat, now) {
            alerts.push(WorkerAlert::HeartbeatMissed {
                minutes_since: worker.last_heartbeat.map(|at| (now - at).num_minutes()),
            });
        }
        if let Some(usage) = worker.cpu_usage.filter(|u| *u >= self.cpu_percent) {
            alerts.push(WorkerAlert::HighCpu { usage });
        }
        if let Some(usage) = worker.memory_usage.filter(|u| *u >= self.memory_percent) {
            alerts.push(WorkerAlert::HighMemory { usage });
        }
        if worker.tasks_completed + worker.tasks_failed >= FAILING_MIN_TASKS {
            if let Some(rate) = worker.failure_rate().filter(|r| *r > FAILING_RATE) {
                alerts.push(WorkerAlert::Failing { failure_rate: rate });
            }
        }

        WorkerHealth {
            healthy: alerts.is_empty(),
            alerts,
        }
    }
}

/// Time range of the heartbeat history chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Hour,
    SixHours,
    Day,
    Week,
}

impl HistoryWindow {
    /// Only 1, 6, 24 and 168 hours are offered.
    pub fn from_hours(hours: u32) -> Option<Self> {
        match hours {
            1 => Some(HistoryWindow::Hour),
            6 => Some(HistoryWindow::SixHours),
            24 => Some(HistoryWindow::Day),
            168 => Some(HistoryWindow::Week),
            _ => None,
        }
    }

    pub fn hours(&self) -> i64 {
        match self {
            HistoryWindow::Hour => 1,
            HistoryWindow::SixHours => 6,
            HistoryWindow::Day => 24,
            HistoryWindow::Week => 168,
        }
    }

    pub fn bucket(&self) -> Duration {
        match self {
            HistoryWindow::Hour => Duration::minutes(5),
            HistoryWindow::SixHours => Duration::minutes(30),
            HistoryWindow::Day => Duration::hours(1),
            HistoryWindow::Week => Duration::hours(6),
        }
    }

    pub fn bucket_count(&self) -> usize {
        (Duration::hours(self.hours()).num_seconds() / self.bucket().num_seconds()) as usize
    }

    fn label_format(&self) -> &'static str {
        match self {
            HistoryWindow::Week => "%m-%d %H:%M",
            _ => "%H:%M",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartbeatHistory {
    pub labels: Vec<String>,
    pub values: Vec<u32>,
}

/// Counts heartbeats per bucket, oldest bucket first.
///
/// The last bucket is the one containing `now`; buckets align to the bucket size.
pub fn bucket_heartbeats(
    window: HistoryWindow,
    now: DateTime<Utc>,
    timestamps: &[DateTime<Utc>],
) -> HeartbeatHistory {
    let size = window.bucket();
    let count = window.bucket_count();
    let last_start = now.duration_trunc(size).unwrap_or(now);
    let first_start = last_start - size * (count as i32 - 1);

    let mut values = vec![0u32; count];
    for ts in timestamps {
        if *ts < first_start || *ts > now {
            continue;
        }
        let index = ((*ts - first_start).num_seconds() / size.num_seconds()) as usize;
        if let Some(slot) = values.get_mut(index) {
            *slot += 1;
        }
    }

    let labels = (0..count)
        .map(|i| {
            (first_start + size * i as i32)
                .format(window.label_format())
                .to_string()
        })
        .collect();

    HeartbeatHistory { labels, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::worker::{WorkerKind, WorkerStatus};
    use chrono::TimeZone;

    fn setting(key: &str, value: &str) -> Setting {
        Setting {
            key: key.to_string(),
            value: value.to_string(),
            group_name: "monitoring".to_string(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_thresholds_with_overrides() {
        let stored = vec![
            setting("heartbeat_threshold_minutes", "12"),
            setting("cpu_threshold", "75"),
            setting("memory_threshold", "lots"),
            setting("site_name", "x"),
        ];
        let t = MonitoringThresholds::default().with_overrides(&stored);
        assert_eq!(t.heartbeat_minutes, 12);
        assert_eq!(t.cpu_percent, 75.0);
        assert_eq!(t.memory_percent, 90.0);
    }

    fn worker(now: DateTime<Utc>) -> Worker {
        Worker {
            id: 1,
            name: "crawler".into(),
            kind: WorkerKind::Automated,
            email: None,
            status: WorkerStatus::Active,
            cpu_usage: Some(20.0),
            memory_usage: Some(30.0),
            last_heartbeat: Some(now - Duration::minutes(1)),
            tasks_completed: 100,
            tasks_failed: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_healthy_worker() {
        let now = Utc::now();
        let health = MonitoringThresholds::default().evaluate(&worker(now), now);
        assert!(health.healthy);
        assert!(health.alerts.is_empty());
    }

    #[test]
    fn test_missed_heartbeat() {
        let now = Utc::now();
        let mut w = worker(now);
        w.last_heartbeat = Some(now - Duration::minutes(12));
        let health = MonitoringThresholds::default().evaluate(&w, now);
        assert_eq!(
            health.alerts,
            vec![WorkerAlert::HeartbeatMissed { minutes_since: Some(12) }]
        );

        w.last_heartbeat = None;
        let health = MonitoringThresholds::default().evaluate(&w, now);
        assert_eq!(health.alerts, vec![WorkerAlert::HeartbeatMissed { minutes_since: None }]);
    }

    #[test]
    fn test_resource_alerts() {
        let now = Utc::now();
        let mut w = worker(now);
        w.cpu_usage = Some(95.5);
        w.memory_usage = Some(90.0);
        let health = MonitoringThresholds::default().evaluate(&w, now);
        assert!(!health.healthy);
        assert_eq!(
            health.alerts,
            vec![
                WorkerAlert::HighCpu { usage: 95.5 },
                WorkerAlert::HighMemory { usage: 90.0 }
            ]
        );
    }

    #[test]
    fn test_failing_needs_enough_tasks() {
        let now = Utc::now();
        let mut w = worker(now);
        w.tasks_completed = 2;
        w.tasks_failed = 7;
        assert!(MonitoringThresholds::default().evaluate(&w, now).healthy);

        w.tasks_failed = 8;
        let health = MonitoringThresholds::default().evaluate(&w, now);
        assert!(matches!(health.alerts[0], WorkerAlert::Failing { .. }));
    }

    #[test]
    fn test_alert_messages() {
        assert_eq!(
            WorkerAlert::HighCpu { usage: 93.25 }.message("w1"),
            "w1 CPU usage at 93.2%"
        );
        assert_eq!(
            WorkerAlert::Failing { failure_rate: 0.75 }.message("w1"),
            "w1 is failing 75% of its tasks"
        );
    }

    #[test]
    fn test_history_window() {
        assert_eq!(HistoryWindow::from_hours(24), Some(HistoryWindow::Day));
        assert_eq!(HistoryWindow::from_hours(12), None);
        assert_eq!(HistoryWindow::Hour.bucket_count(), 12);
        assert_eq!(HistoryWindow::SixHours.bucket_count(), 12);
        assert_eq!(HistoryWindow::Day.bucket_count(), 24);
        assert_eq!(HistoryWindow::Week.bucket_count(), 28);
    }

    #[test]
    fn test_bucket_heartbeats() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 7, 0).unwrap();
        let stamps = vec![
            now,
            now - Duration::minutes(3),
            now - Duration::minutes(10),
            now - Duration::hours(2),
        ];
        let history = bucket_heartbeats(HistoryWindow::Hour, now, &stamps);
        assert_eq!(history.labels.len(), 12);
        assert_eq!(history.labels.first().unwrap(), "11:10");
        assert_eq!(history.labels.last().unwrap(), "12:05");
        // 12:07 and 12:04 fall into 12:05 and 12:00, 11:57 into 11:55
        assert_eq!(history.values[11], 1);
        assert_eq!(history.values[10], 1);
        assert_eq!(history.values[9], 1);
        assert_eq!(history.values.iter().sum::<u32>(), 3);
    }
}
