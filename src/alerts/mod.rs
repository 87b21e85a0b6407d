//! Alert Inbox (C10, spec.md §4.10). Holds externally-pushed notifications
//! and delivers them as a single voice briefing on presence return or at the
//! next natural pause.

pub mod server;

use crate::types::AlertPriority;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Cap on stored alerts (§3, M).
const MAX_ALERTS: usize = 50;
/// Time-to-live before an alert is silently dropped (§3).
const ALERT_TTL: Duration = Duration::from_secs(4 * 60 * 60);

#[derive(Debug, Clone)]
pub struct Alert {
    pub priority: AlertPriority,
    pub message: String,
    pub full_details: Option<String>,
    pub source: Option<String>,
    pub received_at: Instant,
}

pub struct AlertInbox {
    alerts: Mutex<VecDeque<Alert>>,
}

impl AlertInbox {
    pub fn new() -> Self {
        Self { alerts: Mutex::new(VecDeque::new()) }
    }

    /// Insert urgent-first, oldest-first within priority (§3, I6); evict
    /// oldest normal-priority alert first if the cap would be exceeded.
    pub fn push(&self, alert: Alert) {
        let mut alerts = self.alerts.lock().unwrap();
        alerts.retain(|a| a.received_at.elapsed() < ALERT_TTL);

        let insert_at = alerts
            .iter()
            .position(|a| a.priority < alert.priority)
            .unwrap_or(alerts.len());
        alerts.insert(insert_at, alert);

        if alerts.len() > MAX_ALERTS {
            if let Some(pos) = alerts.iter().position(|a| a.priority == AlertPriority::Normal) {
                alerts.remove(pos);
            } else {
                alerts.pop_back();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drain the whole inbox (priority-ordered) for a single briefing cycle
    /// (I6: delivered at most once per cycle).
    pub fn drain_for_briefing(&self) -> Vec<Alert> {
        let mut alerts = self.alerts.lock().unwrap();
        alerts.retain(|a| a.received_at.elapsed() < ALERT_TTL);
        alerts.drain(..).collect()
    }

    /// Render a short spoken summary per §4.10/§8 scenario 6: count plus the
    /// most urgent item.
    pub fn summarize(alerts: &[Alert]) -> String {
        if alerts.is_empty() {
            return String::new();
        }
        let top = &alerts[0];
        if alerts.len() == 1 {
            format!("You have one alert: {}", top.message)
        } else {
            format!("You have {} alerts. Most urgent: {}", alerts.len(), top.message)
        }
    }
}

impl Default for AlertInbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert(priority: AlertPriority, message: &str) -> Alert {
        Alert { priority, message: message.to_string(), full_details: None, source: None, received_at: Instant::now() }
    }

    #[test]
    fn urgent_sorts_before_normal() {
        let inbox = AlertInbox::new();
        inbox.push(alert(AlertPriority::Normal, "normal one"));
        inbox.push(alert(AlertPriority::Urgent, "urgent one"));
        let drained = inbox.drain_for_briefing();
        assert_eq!(drained[0].message, "urgent one");
        assert_eq!(drained[1].message, "normal one");
    }

    #[test]
    fn oldest_first_within_priority() {
        let inbox = AlertInbox::new();
        inbox.push(alert(AlertPriority::Urgent, "first urgent"));
        inbox.push(alert(AlertPriority::Urgent, "second urgent"));
        let drained = inbox.drain_for_briefing();
        assert_eq!(drained[0].message, "first urgent");
        assert_eq!(drained[1].message, "second urgent");
    }

    #[test]
    fn cap_evicts_normal_priority_first() {
        let inbox = AlertInbox::new();
        for i in 0..MAX_ALERTS {
            inbox.push(alert(AlertPriority::Normal, &format!("n{i}")));
        }
        inbox.push(alert(AlertPriority::Urgent, "urgent"));
        assert_eq!(inbox.len(), MAX_ALERTS);
        let drained = inbox.drain_for_briefing();
        assert_eq!(drained[0].message, "urgent");
    }

    #[test]
    fn summarize_mentions_most_urgent_first() {
        let alerts = vec![alert(AlertPriority::Urgent, "server down"), alert(AlertPriority::Normal, "fyi")];
        let summary = AlertInbox::summarize(&alerts);
        assert!(summary.contains("server down"));
        assert!(summary.contains('2'));
    }
}
