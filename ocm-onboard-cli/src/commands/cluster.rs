//! Cluster onboarding and detachment commands

use crate::api::ApiClient;
use crate::output::{self, OutputFormat};
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use ocm_onboard_common::{
    ClusterDetachRequest, ClusterEventsResponse, ClusterListResponse, ClusterStatusResponse,
    ClusterSummary, OnboardingEvent, OperationAck,
};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tabled::Tabled;

#[derive(Tabled, Serialize)]
struct ClusterRow {
    name: String,
    status: String,
    last_seen: String,
}

impl From<ClusterSummary> for ClusterRow {
    fn from(cluster: ClusterSummary) -> Self {
        Self {
            name: cluster.name,
            status: output::status_colored(cluster.status).to_string(),
            last_seen: output::format_relative_time(cluster.last_seen),
        }
    }
}

#[derive(Tabled, Serialize)]
struct EventRow {
    time: String,
    phase: String,
    reason: String,
    message: String,
}

impl From<OnboardingEvent> for EventRow {
    fn from(event: OnboardingEvent) -> Self {
        Self {
            time: event.timestamp.format("%H:%M:%S").to_string(),
            phase: output::phase_colored(event.status).to_string(),
            reason: event.reason.unwrap_or_default(),
            message: output::truncate(&event.message, 80),
        }
    }
}

fn encode(name: &str) -> String {
    urlencoding::encode(name).into_owned()
}

fn print_ack(ack: &OperationAck, format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return output::print_single(ack, format);
    }

    if ack.logs_endpoint.is_some() {
        output::print_success(&ack.message);
    } else {
        output::print_warning(&ack.message);
    }
    if let Some(logs) = &ack.logs_endpoint {
        output::print_info(&format!("Logs: {}", logs));
    }
    if let Some(ws) = &ack.websocket_endpoint {
        output::print_info(&format!("Live events: {}", ws));
    }
    Ok(())
}

pub async fn onboard(
    api: &ApiClient,
    name: &str,
    kubeconfig: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    let ack: OperationAck = match kubeconfig {
        Some(path) => {
            api.post_multipart("/onboard", &[("name", name)], "kubeconfig", &path)
                .await?
        }
        // The server resolves the name against its own kubeconfig
        None => {
            api.post_query(&format!("/onboard?name={}", encode(name)))
                .await?
        }
    };

    print_ack(&ack, format)?;
    if format == OutputFormat::Table && ack.logs_endpoint.is_some() {
        output::print_info(&format!("Follow progress: ocm-onboard status {} --watch", name));
    }
    Ok(())
}

pub async fn detach(
    api: &ApiClient,
    name: &str,
    force: bool,
    cleanup: bool,
    backup: bool,
    format: OutputFormat,
) -> Result<()> {
    let request = ClusterDetachRequest {
        name: name.to_string(),
        force,
        cleanup,
        backup,
    };
    let ack: OperationAck = api.post_json("/detach", &request).await?;
    print_ack(&ack, format)
}

pub async fn status(
    api: &ApiClient,
    name: &str,
    watch: bool,
    interval: Duration,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("/status/{}", encode(name));

    if !watch {
        let status: ClusterStatusResponse = api.get(&path).await?;
        return print_status(status, format);
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    loop {
        let Some(status) = api.get_optional::<ClusterStatusResponse>(&path).await? else {
            // A finished detachment forgets the cluster
            spinner.finish_and_clear();
            output::print_info(&format!("Cluster '{}' is no longer tracked", name));
            return Ok(());
        };

        let current = status.cluster.status;
        let latest = status
            .events
            .last()
            .map(|e| e.message.clone())
            .unwrap_or_default();
        spinner.set_message(format!("{}: {}", output::status_colored(current), latest));

        if !current.is_in_flight() {
            spinner.finish_and_clear();
            return print_status(status, format);
        }

        tokio::time::sleep(interval).await;
    }
}

fn print_status(status: ClusterStatusResponse, format: OutputFormat) -> Result<()> {
    if format != OutputFormat::Table {
        return output::print_single(&status, format);
    }

    let cluster = &status.cluster;
    println!("Cluster: {}", cluster.name);
    println!("  Status:    {}", output::status_colored(cluster.status));
    println!(
        "  Last seen: {} ({})",
        cluster.last_seen.to_rfc3339(),
        output::format_relative_time(cluster.last_seen)
    );
    println!();

    let rows: Vec<EventRow> = status.events.into_iter().map(EventRow::from).collect();
    output::print_table(rows);
    Ok(())
}

pub async fn list(api: &ApiClient, format: OutputFormat) -> Result<()> {
    let list: ClusterListResponse = api.get("/list").await?;

    if format != OutputFormat::Table {
        return output::print_single(&list, format);
    }

    let rows: Vec<ClusterRow> = list.clusters.into_iter().map(ClusterRow::from).collect();
    output::print_table(rows);
    println!(
        "Total: {}, connected: {}, failed: {}",
        list.total, list.connected, list.disconnected
    );
    Ok(())
}

pub async fn events(api: &ApiClient, name: &str, format: OutputFormat) -> Result<()> {
    let events: ClusterEventsResponse = api.get(&format!("/events/{}", encode(name))).await?;

    if format != OutputFormat::Table {
        return output::print_single(&events, format);
    }

    let rows: Vec<EventRow> = events.events.into_iter().map(EventRow::from).collect();
    output::print_output(rows, format)
}
