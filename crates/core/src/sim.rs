//! In-memory simulated environment.
//!
//! `SimWorld` keeps a tiny world model behind a mutex and records every
//! control call it receives, so tests can assert on side effects and the
//! `embody run` command has something to drive without a game server.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::environment::{Environment, EnvironmentEvent};
use crate::error::EnvironmentError;
use crate::world::{AgentState, Control, Entity, EntityId, EquipSlot, Item, Vec3, Vitals};

/// Blocks per second while walking forward.
pub const WALK_SPEED: f64 = 4.317;

/// Food restored by consuming one item.
const FOOD_PER_ITEM: f32 = 4.0;

const AGENT_ID: EntityId = EntityId(0);

/// A side-effecting call the world received.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    LookAt(Vec3),
    SetControl { control: Control, active: bool },
    Equip { item: String, slot: EquipSlot },
    ActivateItem,
    Chat(String),
}

#[derive(Debug, Default)]
struct SimState {
    agent: Option<AgentState>,
    vitals: Vitals,
    entities: Vec<Entity>,
    inventory: Vec<Item>,
    controls: HashSet<Control>,
    look_target: Option<Vec3>,
    held: Option<Item>,
    calls: Vec<SimCall>,
    equip_failure: Option<EnvironmentError>,
    activate_failure: Option<EnvironmentError>,
    next_id: u32,
}

/// A scriptable in-memory [`Environment`].
pub struct SimWorld {
    username: String,
    state: Mutex<SimState>,
    events: broadcast::Sender<EnvironmentEvent>,
}

impl SimWorld {
    pub fn new(username: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            username: username.into(),
            state: Mutex::new(SimState {
                next_id: 1,
                ..SimState::default()
            }),
            events,
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Scripting ───────────────────────────────────────────────────────

    /// Materialize the agent and announce the spawn.
    pub fn spawn_at(&self, position: Vec3) {
        self.state().agent = Some(AgentState {
            id: AGENT_ID,
            position,
            on_ground: true,
        });
        self.emit(EnvironmentEvent::Spawned);
    }

    pub fn move_agent(&self, position: Vec3) {
        if let Some(agent) = self.state().agent.as_mut() {
            agent.position = position;
        }
    }

    pub fn set_on_ground(&self, on_ground: bool) {
        if let Some(agent) = self.state().agent.as_mut() {
            agent.on_ground = on_ground;
        }
    }

    pub fn set_vitals(&self, health: f32, food: f32) {
        self.state().vitals = Vitals { health, food };
    }

    /// Add a typed entity (mob, animal...) at a position.
    pub fn add_entity(&self, name: &str, position: Vec3) -> EntityId {
        self.insert(Some(name.to_string()), None, Some(position))
    }

    /// Add another player at a position.
    pub fn add_player(&self, username: &str, position: Vec3) -> EntityId {
        self.insert(None, Some(username.to_string()), Some(position))
    }

    /// Add an entity the environment has not located yet.
    pub fn add_unpositioned(&self, name: &str) -> EntityId {
        self.insert(Some(name.to_string()), None, None)
    }

    fn insert(&self, name: Option<String>, username: Option<String>, position: Option<Vec3>) -> EntityId {
        let mut state = self.state();
        let id = EntityId(state.next_id);
        state.next_id += 1;
        state.entities.push(Entity {
            id,
            name,
            username,
            position,
        });
        id
    }

    pub fn move_entity(&self, id: EntityId, position: Vec3) {
        if let Some(e) = self.state().entities.iter_mut().find(|e| e.id == id) {
            e.position = Some(position);
        }
    }

    pub fn remove_entity(&self, id: EntityId) -> bool {
        let mut state = self.state();
        let before = state.entities.len();
        state.entities.retain(|e| e.id != id);
        state.entities.len() != before
    }

    /// Put a stack into the first free slot and return the slot.
    pub fn give_item(&self, name: &str, count: u32) -> u16 {
        let mut state = self.state();
        let slot = (0u16..)
            .find(|s| !state.inventory.iter().any(|i| i.slot == *s))
            .unwrap_or_default();
        state.inventory.push(Item {
            slot,
            name: name.to_string(),
            count,
        });
        slot
    }

    /// Make the next `equip` call fail.
    pub fn fail_next_equip(&self, error: EnvironmentError) {
        self.state().equip_failure = Some(error);
    }

    /// Make the next `activate_item` call fail.
    pub fn fail_next_activate(&self, error: EnvironmentError) {
        self.state().activate_failure = Some(error);
    }

    /// Deliver a lifecycle event to subscribers.
    pub fn emit(&self, event: EnvironmentEvent) {
        let _ = self.events.send(event);
    }

    /// Advance physics: walk toward the look target while forward is held.
    pub fn step(&self, elapsed_ms: u64) {
        let mut state = self.state();
        if !state.controls.contains(&Control::Forward) {
            return;
        }
        let Some(target) = state.look_target else {
            return;
        };
        let Some(agent) = state.agent.as_mut() else {
            return;
        };
        let dx = target.x - agent.position.x;
        let dz = target.z - agent.position.z;
        let len = (dx * dx + dz * dz).sqrt();
        if len == 0.0 {
            return;
        }
        let stride = WALK_SPEED * elapsed_ms as f64 / 1000.0;
        agent.position = agent.position.offset(dx / len * stride, 0.0, dz / len * stride);
    }

    // ── Inspection ──────────────────────────────────────────────────────

    /// Every side-effecting call received so far, in order.
    pub fn calls(&self) -> Vec<SimCall> {
        self.state().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn is_control_active(&self, control: Control) -> bool {
        self.state().controls.contains(&control)
    }

    pub fn look_target(&self) -> Option<Vec3> {
        self.state().look_target
    }

    pub fn held_item(&self) -> Option<Item> {
        self.state().held.clone()
    }
}

#[async_trait]
impl Environment for SimWorld {
    fn username(&self) -> &str {
        &self.username
    }

    fn agent(&self) -> Option<AgentState> {
        self.state().agent
    }

    fn vitals(&self) -> Vitals {
        self.state().vitals
    }

    fn entities(&self) -> Vec<Entity> {
        let state = self.state();
        let mut all = Vec::with_capacity(state.entities.len() + 1);
        if let Some(agent) = state.agent {
            all.push(Entity {
                id: agent.id,
                name: Some("player".into()),
                username: Some(self.username.clone()),
                position: Some(agent.position),
            });
        }
        all.extend(state.entities.iter().cloned());
        all
    }

    fn inventory(&self) -> Vec<Item> {
        self.state().inventory.clone()
    }

    fn look_at(&self, target: Vec3) {
        let mut state = self.state();
        state.look_target = Some(target);
        state.calls.push(SimCall::LookAt(target));
    }

    fn set_control(&self, control: Control, active: bool) {
        let mut state = self.state();
        if active {
            state.controls.insert(control);
        } else {
            state.controls.remove(&control);
        }
        state.calls.push(SimCall::SetControl { control, active });
    }

    fn chat(&self, message: &str) {
        self.state().calls.push(SimCall::Chat(message.to_string()));
        self.emit(EnvironmentEvent::Chat {
            username: self.username.clone(),
            message: message.to_string(),
        });
    }

    async fn equip(&self, item: &Item, slot: EquipSlot) -> Result<(), EnvironmentError> {
        let mut state = self.state();
        state.calls.push(SimCall::Equip {
            item: item.name.clone(),
            slot,
        });
        if let Some(err) = state.equip_failure.take() {
            return Err(err);
        }
        let held = state
            .inventory
            .iter()
            .find(|i| i.slot == item.slot && i.name == item.name)
            .cloned()
            .ok_or_else(|| EnvironmentError::ItemUnavailable(item.name.clone()))?;
        state.held = Some(held);
        Ok(())
    }

    async fn activate_item(&self) -> Result<(), EnvironmentError> {
        let mut state = self.state();
        state.calls.push(SimCall::ActivateItem);
        if let Some(err) = state.activate_failure.take() {
            return Err(err);
        }
        let held = state.held.take().ok_or_else(|| EnvironmentError::Rejected {
            operation: "activate_item".into(),
            reason: "nothing held".into(),
        })?;

        // Consume one from the stack
        if let Some(pos) = state.inventory.iter().position(|i| i.slot == held.slot) {
            state.inventory[pos].count = state.inventory[pos].count.saturating_sub(1);
            if state.inventory[pos].count == 0 {
                state.inventory.remove(pos);
            } else {
                state.held = Some(state.inventory[pos].clone());
            }
        }
        state.vitals.food = (state.vitals.food + FOOD_PER_ITEM).min(20.0);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<EnvironmentEvent> {
        self.events.subscribe()
    }
}
