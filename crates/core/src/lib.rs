//! # Embody Core
//!
//! Domain types, traits, and error definitions for the Embody runtime, the
//! "Body" half of a split agent: it samples an environment into percepts for
//! a remote decision maker (the "Head") and executes the actions it sends back.
//!
//! ## Design Philosophy
//!
//! Every collaborator is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the environment binding or the transport without touching the loop
//! - Deterministic testing with the in-memory [`sim::SimWorld`] and [`clock::ManualClock`]
//! - Clean dependency graph (all crates depend inward on core)

pub mod action;
pub mod behavior;
pub mod clock;
pub mod environment;
pub mod error;
pub mod event;
pub mod hostility;
pub mod motion;
pub mod percept;
pub mod sim;
pub mod transport;
pub mod world;

// Re-export key types at crate root for ergonomics
pub use action::{ActionCommand, ActionKind};
pub use behavior::{Behavior, BehaviorContext, BehaviorOutcome, BehaviorRegistry};
pub use clock::{Clock, ManualClock, TokioClock};
pub use environment::{Environment, EnvironmentEvent};
pub use error::{BehaviorError, EnvironmentError, Error, Result, TransportError};
pub use event::{BodyEvent, EventBus};
pub use hostility::is_hostile;
pub use motion::{MotionPlan, MotionScheduler};
pub use percept::{BodyMessage, GroundState, NearbyEntity, Percept};
pub use transport::{CommandSource, InboundFrame, PerceptPublisher};
pub use world::{AgentState, Control, Entity, EntityId, EquipSlot, Item, Vec3, Vitals};
