//! End-to-end tests for the Embody runtime over real TCP sockets.
//!
//! A simulated world runs behind the TCP transports; the tests play the
//! Head, reading percepts and pushing commands exactly as a remote decision
//! maker would.

use std::sync::Arc;
use std::time::Duration;

use embody_agent::BodyRuntime;
use embody_config::BodyConfig;
use embody_core::action::{ActionCommand, ActionKind};
use embody_core::event::BodyEvent;
use embody_core::percept::{BodyMessage, GroundState, Percept};
use embody_core::sim::{SimCall, SimWorld};
use embody_core::world::{Control, EquipSlot, Vec3};
use embody_core::Environment;
use embody_transport::{PerceptSubscriber, TcpCommandSource, TcpPublisher, send_command};
use tokio::time::timeout;

// ── Harness ──────────────────────────────────────────────────────────────

struct Body {
    world: Arc<SimWorld>,
    percepts: String,
    commands: String,
    events: Arc<embody_core::event::EventBus>,
    handle: embody_agent::RuntimeHandle,
}

async fn start_body(world: SimWorld) -> Body {
    let mut config = BodyConfig::default();
    config.perception.tick_ms = 20;
    config.behaviors.flee_duration_ms = 300;

    let publisher = TcpPublisher::bind("127.0.0.1:0", 16).await.unwrap();
    let source = TcpCommandSource::bind("127.0.0.1:0", 16).await.unwrap();
    let percepts = publisher.local_addr().to_string();
    let commands = source.local_addr().to_string();

    let world = Arc::new(world);
    let runtime = BodyRuntime::new(
        config,
        world.clone(),
        Arc::new(publisher),
        Arc::new(source),
    );
    let events = runtime.events();
    let handle = runtime.start().await.unwrap();

    Body {
        world,
        percepts,
        commands,
        events,
        handle,
    }
}

async fn next_percept(subscriber: &mut PerceptSubscriber) -> Percept {
    let frame = timeout(Duration::from_secs(5), subscriber.next_frame())
        .await
        .expect("no percept within 5s")
        .unwrap()
        .expect("body hung up");
    let message: BodyMessage = serde_json::from_str(&frame).unwrap();
    let BodyMessage::Percept(percept) = message;
    percept
}

async fn wait_for(events: &mut tokio::sync::broadcast::Receiver<Arc<BodyEvent>>, want: &str) {
    let found = timeout(Duration::from_secs(5), async {
        loop {
            let event = events.recv().await.unwrap();
            let name = match event.as_ref() {
                BodyEvent::BehaviorFinished { .. } => "finished",
                BodyEvent::UnknownAction { .. } => "unknown",
                BodyEvent::InvalidCommand { .. } => "invalid",
                BodyEvent::MotionReleased { .. } => "released",
                _ => continue,
            };
            if name == want {
                return;
            }
        }
    })
    .await;
    assert!(found.is_ok(), "never saw {want}");
}

fn spawned_world() -> SimWorld {
    let world = SimWorld::new("Prometheus");
    world.spawn_at(Vec3::new(0.0, 64.0, 0.0));
    world
}

// ── Percepts ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_head_sees_filtered_sorted_percepts() {
    let world = spawned_world();
    world.add_entity("zombie", Vec3::new(5.05, 64.0, 0.0));
    world.add_entity("cow", Vec3::new(40.0, 64.0, 0.0));
    world.add_entity("villager", Vec3::new(0.0, 64.0, 3.2));
    world.add_entity("skeleton", Vec3::new(31.9, 64.0, 0.0));
    let body = start_body(world).await;

    let mut head = PerceptSubscriber::connect(&body.percepts).await.unwrap();
    let percept = next_percept(&mut head).await;

    let seen: Vec<(&str, f64, bool)> = percept
        .nearby_entities
        .iter()
        .map(|e| (e.name.as_str(), e.distance, e.hostile))
        .collect();
    assert_eq!(
        seen,
        vec![
            ("villager", 3.2, false),
            ("zombie", 5.1, true),
            ("skeleton", 31.9, true),
        ]
    );
    assert_eq!(percept.ground, GroundState::Safe);
    assert_eq!(percept.health, 20.0);

    body.handle.shutdown().await;
}

#[tokio::test]
async fn e2e_percepts_keep_flowing() {
    let body = start_body(spawned_world()).await;
    let mut head = PerceptSubscriber::connect(&body.percepts).await.unwrap();
    for _ in 0..5 {
        next_percept(&mut head).await;
    }
    body.handle.shutdown().await;
}

// ── Commands ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_flee_moves_then_stops() {
    let world = spawned_world();
    world.add_entity("creeper", Vec3::new(3.0, 64.0, 0.0));
    let body = start_body(world).await;
    let mut events = body.events.subscribe();

    let flee = ActionCommand::new(ActionKind::Flee).with_param("reason", "hostile_nearby");
    send_command(&body.commands, &flee).await.unwrap();
    wait_for(&mut events, "finished").await;
    assert!(body.world.is_control_active(Control::Forward));
    assert_eq!(
        body.world.look_target(),
        Some(Vec3::new(-10.0, 64.0 + 1.6, 0.0))
    );

    wait_for(&mut events, "released").await;
    assert!(!body.world.is_control_active(Control::Forward));

    body.handle.shutdown().await;
}

#[tokio::test]
async fn e2e_eat_uses_first_food_item() {
    let world = spawned_world();
    world.set_vitals(20.0, 8.0);
    world.give_item("cobblestone", 12);
    world.give_item("cooked_porkchop", 2);
    world.give_item("bread", 5);
    let body = start_body(world).await;
    let mut events = body.events.subscribe();

    send_command(&body.commands, &ActionCommand::new(ActionKind::Eat))
        .await
        .unwrap();
    wait_for(&mut events, "finished").await;

    assert!(body.world.calls().contains(&SimCall::Equip {
        item: "cooked_porkchop".into(),
        slot: EquipSlot::Hand,
    }));
    assert_eq!(body.world.vitals().food, 12.0);

    body.handle.shutdown().await;
}

#[tokio::test]
async fn e2e_receiver_survives_garbage() {
    let body = start_body(spawned_world()).await;
    let mut events = body.events.subscribe();

    let mut raw = tokio::net::TcpStream::connect(&body.commands).await.unwrap();
    tokio::io::AsyncWriteExt::write_all(&mut raw, b"{not json\n{\"action\":\"bogus\"}\n")
        .await
        .unwrap();
    wait_for(&mut events, "invalid").await;
    wait_for(&mut events, "unknown").await;

    // Still listening
    send_command(&body.commands, &ActionCommand::new(ActionKind::Idle))
        .await
        .unwrap();
    wait_for(&mut events, "finished").await;
    // Greeting only
    assert_eq!(body.world.calls().len(), 1);

    body.handle.shutdown().await;
}
