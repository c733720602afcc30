//! `embody run` — Run the Body on the simulated environment.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use embody_agent::BodyRuntime;
use embody_config::BodyConfig;
use embody_core::sim::SimWorld;
use embody_transport::{TcpCommandSource, TcpPublisher};
use tokio::task::JoinHandle;
use tracing::info;

/// Seed a simulated world from the `[simulation]` table.
///
/// The agent is not spawned here; see [`run`].
pub fn build_world(config: &BodyConfig) -> SimWorld {
    let sim = &config.simulation;
    let world = SimWorld::new(config.environment.username.clone());
    world.set_vitals(sim.health, sim.food);
    for entity in &sim.entities {
        match (&entity.name, &entity.username) {
            (Some(name), _) => world.add_entity(name, entity.position),
            (None, Some(username)) => world.add_player(username, entity.position),
            (None, None) => world.add_entity("unknown", entity.position),
        };
    }
    for item in &sim.inventory {
        world.give_item(&item.name, item.count);
    }
    world
}

/// Advance simulated physics every `step_ms`.
fn start_physics(world: Arc<SimWorld>, step_ms: u64) -> JoinHandle<()> {
    let step_ms = step_ms.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(step_ms));
        loop {
            interval.tick().await;
            world.step(step_ms);
        }
    })
}

pub async fn run(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(path).map_err(|e| format!("Failed to load config: {e}"))?;

    println!("Embody — starting Body");
    println!("   Agent:     {}", config.environment.username);
    println!("   Percepts:  {}", config.transport.publish_endpoint);
    println!("   Commands:  {}", config.transport.command_endpoint);
    println!("   Tick:      {} ms", config.perception.tick_ms);
    println!(
        "   World:     {} entities, {} stacks",
        config.simulation.entities.len(),
        config.simulation.inventory.len()
    );

    let publisher = TcpPublisher::bind(
        &config.transport.publish_endpoint,
        config.transport.publish_capacity,
    )
    .await?;
    let source = TcpCommandSource::bind(
        &config.transport.command_endpoint,
        config.transport.command_capacity,
    )
    .await?
    .with_max_line_bytes(config.transport.max_command_bytes);

    let world = Arc::new(build_world(&config));
    let physics = start_physics(world.clone(), config.simulation.step_ms);

    let spawn = config
        .simulation
        .spawn
        .then_some(config.simulation.spawn_position);
    let runtime = BodyRuntime::new(
        config,
        world.clone(),
        Arc::new(publisher),
        Arc::new(source),
    );
    let mut handle = runtime.start().await?;

    if let Some(position) = spawn {
        world.spawn_at(position);
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
        _ = handle.disconnected() => info!("Environment gone"),
    }

    physics.abort();
    handle.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_config::{SimEntityConfig, SimItemConfig};
    use embody_core::environment::Environment;
    use embody_core::world::Vec3;

    #[test]
    fn world_is_seeded_from_config() {
        let mut config = BodyConfig::default();
        config.simulation.food = 6.0;
        config.simulation.entities = vec![
            SimEntityConfig {
                name: Some("zombie".into()),
                username: None,
                position: Vec3::new(3.0, 64.0, 0.0),
            },
            SimEntityConfig {
                name: None,
                username: Some("Alex".into()),
                position: Vec3::new(-3.0, 64.0, 0.0),
            },
        ];
        config.simulation.inventory = vec![SimItemConfig {
            name: "bread".into(),
            count: 4,
        }];

        let world = build_world(&config);
        assert!(world.agent().is_none());
        assert_eq!(world.vitals().food, 6.0);
        assert_eq!(world.entities().len(), 2);
        assert_eq!(world.inventory()[0].count, 4);
        assert_eq!(world.username(), "Prometheus");

        world.spawn_at(config.simulation.spawn_position);
        let zombie = world.nearest_entity(&|e| e.name.as_deref() == Some("zombie"));
        assert_eq!(zombie.unwrap().label(), "zombie");
    }

    #[tokio::test(start_paused = true)]
    async fn physics_walks_toward_the_look_target() {
        let world = Arc::new(SimWorld::new("Prometheus"));
        world.spawn_at(Vec3::new(0.0, 64.0, 0.0));
        world.look_at(Vec3::new(100.0, 65.6, 0.0));
        world.set_control(embody_core::world::Control::Forward, true);

        let physics = start_physics(world.clone(), 50);
        tokio::time::sleep(Duration::from_millis(1010)).await;
        physics.abort();

        let x = world.agent().unwrap().position.x;
        assert!(x > 4.0 && x < 5.0, "walked {x}");
    }
}
