//! List command - show configured contexts and connections.

use std::path::PathBuf;

use anyhow::Result;
use kpfm_core::ClusterContext;

use super::load_config;

pub async fn run(config_path: Option<PathBuf>, json: bool) -> Result<()> {
    let config = load_config(config_path).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config.contexts)?);
        return Ok(());
    }

    if config.contexts.is_empty() {
        println!("No contexts configured.");
        return Ok(());
    }

    for context in config.contexts.contexts() {
        print_context(context);
    }

    println!("\nTotal: {} contexts", config.contexts.len());
    Ok(())
}

fn print_context(context: &ClusterContext) {
    println!("\n{} ({} connections)", context.name, context.connections.len());
    if context.connections.is_empty() {
        return;
    }

    // Table header
    println!(
        "  {:<5} {:<30} {:<20} {:<8} REMOTE",
        "KIND", "TARGET", "NAMESPACE", "LOCAL"
    );
    println!("  {}", "-".repeat(76));

    for conn in &context.connections {
        let remote = match conn.remote_pod_port {
            Some(pod_port) => format!("{} (pod {})", conn.remote_service_port, pod_port),
            None => conn.remote_service_port.to_string(),
        };

        println!(
            "  {:<5} {:<30} {:<20} {:<8} {}",
            conn.target.kind(),
            truncate(conn.target.name(), 30),
            truncate(&conn.namespace, 20),
            conn.local_port,
            remote
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max - 1).collect();
        format!("{}…", kept)
    }
}
