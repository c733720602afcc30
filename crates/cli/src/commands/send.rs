//! `embody send` — Push a single action to a running Body.

use std::path::Path;

use embody_core::action::{ActionCommand, ActionKind};
use embody_transport::send_command;

pub async fn run(
    path: Option<&Path>,
    action: &str,
    reason: Option<String>,
    endpoint: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let endpoint = endpoint.unwrap_or(config.transport.command_endpoint);

    let kind = ActionKind::parse(action);
    if !kind.is_known() {
        tracing::warn!(action = %kind, "Sending an action the Body does not know");
    }
    let mut command = ActionCommand::new(kind);
    if let Some(reason) = reason {
        command = command.with_param("reason", reason);
    }

    send_command(&endpoint, &command).await?;
    println!("{} -> {endpoint}", command.encode()?);
    Ok(())
}
