//! World model primitives shared by the sampler, the behaviors and the
//! environment bindings.

use serde::{Deserialize, Serialize};

/// A point or offset in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Vec3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Offset this point by the given deltas.
    pub fn offset(&self, dx: f64, dy: f64, dz: f64) -> Vec3 {
        Vec3::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Copy with every component rounded to one decimal place.
    pub fn rounded(&self) -> Vec3 {
        Vec3::new(round_tenth(self.x), round_tenth(self.y), round_tenth(self.z))
    }
}

/// Round to one decimal place, ties toward positive infinity.
///
/// `5.05` rounds to `5.1` and `-2.25` rounds to `-2.2`.
pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Environment-assigned entity identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An entity the environment knows about (mob, animal, player, dropped item...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,

    /// Type identifier, e.g. `"zombie"` or `"cow"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Player name, for player entities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Last known position; unset until the environment has located it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
}

impl Entity {
    /// Name used in percepts: type name, then username, then `"unknown"`.
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("unknown")
    }
}

/// The agent's own body as seen by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgentState {
    pub id: EntityId,
    pub position: Vec3,
    /// Vertical-contact flag
    pub on_ground: bool,
}

/// Vital signs, passed through to percepts untouched.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub health: f32,
    pub food: f32,
}

impl Default for Vitals {
    fn default() -> Self {
        Self {
            health: 20.0,
            food: 20.0,
        }
    }
}

/// An inventory stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub slot: u16,
    pub name: String,
    pub count: u32,
}

/// Binary movement controls the environment exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Forward,
    Back,
    Left,
    Right,
    Jump,
    Sprint,
    Sneak,
}

/// Where an item gets equipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Hand,
    OffHand,
}
