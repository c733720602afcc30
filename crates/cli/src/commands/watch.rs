//! `embody watch` — Print percepts published by a running Body.

use std::path::Path;

use embody_core::percept::BodyMessage;
use embody_transport::PerceptSubscriber;
use tracing::{info, warn};

pub async fn run(
    path: Option<&Path>,
    count: Option<usize>,
    endpoint: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;
    let endpoint = endpoint.unwrap_or(config.transport.publish_endpoint);

    let mut subscriber = PerceptSubscriber::connect(&endpoint).await?;
    info!(endpoint = %endpoint, "Watching percepts");

    let mut seen = 0usize;
    while count.is_none_or(|n| seen < n) {
        let Some(frame) = subscriber.next_frame().await? else {
            info!("Body closed the connection");
            break;
        };
        seen += 1;

        match serde_json::from_str::<BodyMessage>(&frame) {
            Ok(BodyMessage::Percept(p)) => {
                let hostiles = p.nearby_entities.iter().filter(|e| e.hostile).count();
                println!(
                    "hp {:>4.1} food {:>4.1} at ({:.1}, {:.1}, {:.1}) {:?} | {} nearby, {} hostile",
                    p.health,
                    p.food,
                    p.position.x,
                    p.position.y,
                    p.position.z,
                    p.ground,
                    p.nearby_entities.len(),
                    hostiles,
                );
            }
            Err(e) => {
                warn!(error = %e, "Unrecognized frame");
                println!("{frame}");
            }
        }
    }
    Ok(())
}
