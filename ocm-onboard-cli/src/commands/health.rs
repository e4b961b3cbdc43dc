//! Plugin health command

use crate::api::ApiClient;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use colored::Colorize;
use ocm_onboard_common::{HealthStatus, PluginHealth};
use serde::Serialize;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct ComponentRow {
    component: String,
    status: String,
    message: String,
}

fn status_label(status: &HealthStatus) -> String {
    match status {
        HealthStatus::Healthy => "healthy".green().to_string(),
        HealthStatus::Degraded => "degraded".yellow().to_string(),
        HealthStatus::Unhealthy => "unhealthy".red().to_string(),
    }
}

fn format_uptime(seconds: u64) -> String {
    let (days, rest) = (seconds / 86400, seconds % 86400);
    let (hours, minutes) = (rest / 3600, (rest % 3600) / 60);
    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m {}s", minutes, seconds % 60)
    }
}

pub async fn health(api: &ApiClient, format: OutputFormat) -> Result<()> {
    let health: PluginHealth = api.get("/health").await?;

    if format != OutputFormat::Table {
        return output::print_single(&health, format);
    }

    println!("Plugin health: {}", status_label(&health.status));
    println!("  Version:     {}", health.version);
    println!("  Initialized: {}", health.initialized);
    println!("  Uptime:      {}", format_uptime(health.uptime_seconds));
    println!("  Checked at:  {}", health.timestamp.to_rfc3339());
    println!();

    let rows: Vec<ComponentRow> = health
        .components
        .into_iter()
        .map(|c| ComponentRow {
            component: c.name,
            status: status_label(&c.status),
            message: c.message.unwrap_or_default(),
        })
        .collect();
    output::print_table(rows);
    Ok(())
}
