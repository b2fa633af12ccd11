//! Deal presentation.
//!
//! Console table rendering and timestamped JSON export of scan results.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::Deal;

/// Format an ISK amount with thousands separators and two decimals.
pub fn format_isk(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };
    format!("{sign}{grouped}.{frac_part}")
}

/// Render deals as a fixed-width console table.
pub fn render_table(deals: &[Deal], reference_name: &str, hub_name: &str) -> String {
    if deals.is_empty() {
        return "No good deals found.".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "Found {} good deal{} near {reference_name} (vs {hub_name}):",
        deals.len(),
        if deals.len() == 1 { "" } else { "s" },
    );
    let _ = writeln!(
        out,
        "{:<4} {:<24} {:<18} {:>5} {:>20} {:>20} {:>20} {:>8}",
        "#", "Ship", "System", "Jumps", "Price", hub_name, "Savings", "%"
    );
    let _ = writeln!(out, "{}", "-".repeat(124));
    for (i, deal) in deals.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:<4} {:<24} {:<18} {:>5} {:>20} {:>20} {:>20} {:>7.2}%",
            i + 1,
            truncate(&deal.type_name, 24),
            truncate(&deal.location_name, 18),
            deal.distance,
            format_isk(deal.price),
            format_isk(deal.hub_price),
            format_isk(deal.savings),
            deal.savings_percent,
        );
    }
    out
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(width.saturating_sub(1)).collect();
        t.push('~');
        t
    }
}

/// Write deals to `dir/deals_{reference}_{YYYYmmdd_HHMMSS}.json`.
pub fn export_deals(deals: &[Deal], dir: &Path, reference_name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create export directory {}", dir.display()))?;

    let reference: String = reference_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let file_name = format!(
        "deals_{}_{}.json",
        reference.to_lowercase(),
        Utc::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(file_name);

    let json = serde_json::to_string_pretty(deals).context("Failed to serialise deals")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write deals to {}", path.display()))?;

    info!(path = %path.display(), deals = deals.len(), "Deals exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal(name: &str, savings_percent: f64) -> Deal {
        Deal {
            type_id: 24692,
            type_name: name.into(),
            price: 180_000_000.0,
            hub_price: 200_000_000.0,
            savings: 20_000_000.0,
            savings_percent,
            location_id: 30002558,
            location_name: "Sosala".into(),
            distance: 0,
            volume_remain: 1,
            order_id: 1,
        }
    }

    #[test]
    fn test_format_isk() {
        assert_eq!(format_isk(0.0), "0.00");
        assert_eq!(format_isk(999.5), "999.50");
        assert_eq!(format_isk(1000.0), "1,000.00");
        assert_eq!(format_isk(150_000_000.0), "150,000,000.00");
        assert_eq!(format_isk(-1234567.891), "-1,234,567.89");
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_table(&[], "Sosala", "Jita"), "No good deals found.");
    }

    #[test]
    fn test_render_rows() {
        let table = render_table(&[deal("Abaddon", 10.0), deal("Apocalypse", 5.0)], "Sosala", "Jita");
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("Found 2 good deals near Sosala"));
        assert!(lines[3].contains("Abaddon"));
        assert!(lines[3].contains("180,000,000.00"));
        assert!(lines[3].contains("10.00%"));
        assert!(lines[4].starts_with("2"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("Vindicator", 24), "Vindicator");
        assert_eq!(truncate("abcdef", 4), "abc~");
    }

    #[test]
    fn test_export_writes_timestamped_json() {
        let mut dir = std::env::temp_dir();
        dir.push(format!("marketbot_export_{}", uuid::Uuid::new_v4()));

        let deals = vec![deal("Abaddon", 10.0)];
        let path = export_deals(&deals, &dir, "Sosala").unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("deals_sosala_"));
        assert!(name.ends_with(".json"));
        // deals_sosala_YYYYmmdd_HHMMSS.json
        assert_eq!(name.len(), "deals_sosala_".len() + 15 + ".json".len());

        let back: Vec<Deal> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, deals);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
