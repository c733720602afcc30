//! Percepts — the outbound half of the Head/Body contract.
//!
//! One percept is published per sampling tick while the agent is spawned:
//!
//! ```json
//! {"type":"percept","health":20.0,"food":18.0,
//!  "position":{"x":10.5,"y":64.0,"z":-3.2},
//!  "nearby_entities":[{"name":"zombie","distance":4.1,"hostile":true}],
//!  "ground":"safe"}
//! ```

use serde::{Deserialize, Serialize};

use crate::world::Vec3;

/// Derived from the agent's vertical-contact flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroundState {
    Safe,
    Airborne,
}

impl GroundState {
    pub fn from_contact(on_ground: bool) -> Self {
        if on_ground { Self::Safe } else { Self::Airborne }
    }
}

/// One entry of [`Percept::nearby_entities`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyEntity {
    pub name: String,
    /// Rounded to one decimal place
    pub distance: f64,
    pub hostile: bool,
}

/// A stateless snapshot of the agent and its surroundings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percept {
    pub health: f32,
    pub food: f32,
    /// Rounded to one decimal place per axis
    pub position: Vec3,
    /// At most the configured cap (10 by default), nearest first
    pub nearby_entities: Vec<NearbyEntity>,
    pub ground: GroundState,
}

/// Every message the Body publishes, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BodyMessage {
    Percept(Percept),
}

impl BodyMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Percept {
        Percept {
            health: 20.0,
            food: 17.0,
            position: Vec3::new(10.5, 64.0, -3.2),
            nearby_entities: vec![NearbyEntity {
                name: "zombie".into(),
                distance: 4.1,
                hostile: true,
            }],
            ground: GroundState::Safe,
        }
    }

    #[test]
    fn wire_shape_matches_contract() {
        let json = BodyMessage::Percept(sample()).to_json().unwrap();
        assert!(json.starts_with(r#"{"type":"percept""#));

        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["health"], 20.0);
        assert_eq!(v["food"], 17.0);
        assert_eq!(v["position"]["x"], 10.5);
        assert_eq!(v["position"]["z"], -3.2);
        assert_eq!(v["nearby_entities"][0]["name"], "zombie");
        assert_eq!(v["nearby_entities"][0]["distance"], 4.1);
        assert_eq!(v["nearby_entities"][0]["hostile"], true);
        assert_eq!(v["ground"], "safe");
    }

    #[test]
    fn ground_from_contact() {
        assert_eq!(GroundState::from_contact(true), GroundState::Safe);
        assert_eq!(GroundState::from_contact(false), GroundState::Airborne);
        assert_eq!(
            serde_json::to_string(&GroundState::Airborne).unwrap(),
            "\"airborne\""
        );
    }

    #[test]
    fn head_side_can_read_it_back() {
        let json = BodyMessage::Percept(sample()).to_json().unwrap();
        let msg: BodyMessage = serde_json::from_str(&json).unwrap();
        let BodyMessage::Percept(p) = msg;
        assert_eq!(p, sample());
    }
}
