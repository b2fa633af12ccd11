//! Deal alerts.
//!
//! `AlertManager` decides which deals are worth an alert and remembers what
//! it already sent, so a long-running service does not repeat itself.
//! Delivery goes through one or more `Notifier` backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::NotificationsConfig;
use crate::report::format_isk;
use crate::types::Deal;

/// A delivery channel for alerts.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, message: &str) -> Result<()>;

    fn name(&self) -> &str;
}

/// Writes alerts to the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        info!(title, message, "Deal alert");
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Desktop notifications via `notify-send`.
pub struct DesktopNotifier {
    app_name: String,
}

impl DesktopNotifier {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, message: &str) -> Result<()> {
        let output = tokio::process::Command::new("notify-send")
            .args(["--app-name", &self.app_name, "--expire-time", "10000", title, message])
            .output()
            .await
            .context("notify-send subprocess error")?;

        if !output.status.success() {
            anyhow::bail!(
                "notify-send exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "desktop"
    }
}

pub struct AlertManager {
    enabled: bool,
    min_savings_percent: f64,
    max_notifications: usize,
    /// `type_id:location_id:order_id` of every deal already alerted.
    sent: HashSet<String>,
    notifiers: Vec<Box<dyn Notifier>>,
}

impl AlertManager {
    pub fn new(
        enabled: bool,
        min_savings_percent: f64,
        max_notifications: usize,
        notifiers: Vec<Box<dyn Notifier>>,
    ) -> Self {
        Self {
            enabled,
            min_savings_percent,
            max_notifications,
            sent: HashSet::new(),
            notifiers,
        }
    }

    pub fn from_config(cfg: &NotificationsConfig) -> Self {
        let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(LogNotifier)];
        if cfg.desktop {
            notifiers.push(Box::new(DesktopNotifier::new("marketbot")));
        }
        Self::new(
            cfg.enabled,
            cfg.min_savings_percent,
            cfg.max_notifications,
            notifiers,
        )
    }

    pub fn dedupe_key(deal: &Deal) -> String {
        format!("{}:{}:{}", deal.type_id, deal.location_id, deal.order_id)
    }

    /// Alert on the top deals meeting the savings threshold. `deals` is
    /// expected best-first. Returns how many alerts were delivered.
    pub async fn notify_deals(&mut self, deals: &[Deal], reference_name: &str) -> usize {
        if !self.enabled {
            debug!("Notifications disabled");
            return 0;
        }

        let notable: Vec<&Deal> = deals
            .iter()
            .filter(|d| d.savings_percent >= self.min_savings_percent)
            .take(self.max_notifications)
            .collect();
        if notable.is_empty() {
            debug!(min_savings_percent = self.min_savings_percent, "No deals worth an alert");
            return 0;
        }

        let mut delivered = 0;
        for deal in notable {
            let key = Self::dedupe_key(deal);
            if self.sent.contains(&key) {
                continue;
            }

            let (title, message) = format_alert(deal, reference_name);
            let mut any_ok = false;
            for notifier in &self.notifiers {
                match notifier.notify(&title, &message).await {
                    Ok(()) => any_ok = true,
                    Err(e) => warn!(
                        error = %e,
                        notifier = notifier.name(),
                        deal = %deal.type_name,
                        "Failed to send notification"
                    ),
                }
            }
            if any_ok {
                self.sent.insert(key);
                delivered += 1;
            }
        }

        info!(delivered, "Deal notifications sent");
        delivered
    }
}

fn format_alert(deal: &Deal, reference_name: &str) -> (String, String) {
    let title = format!("Market Deal: {}", deal.type_name);
    let message = format!(
        "Location: {} ({} jumps from {})\nPrice: {} ISK\nHub Price: {} ISK\nSavings: {} ISK ({:.2}%)",
        deal.location_name,
        deal.distance,
        reference_name,
        format_isk(deal.price),
        format_isk(deal.hub_price),
        format_isk(deal.savings),
        deal.savings_percent,
    );
    (title, message)
}
