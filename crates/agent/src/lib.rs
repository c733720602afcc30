//! The perception-action loop — the heart of Embody.
//!
//! The Body runs two independent cycles against one environment:
//!
//! 1. **Perceive**: every tick, snapshot vitals, position and nearby
//!    entities and publish the percept to the Head
//! 2. **Act**: for each command from the Head, in arrival order, decode it,
//!    look up its behavior and run it
//!
//! Neither cycle waits on the other. Malformed commands, unknown actions,
//! failed environment calls and dropped percepts are logged and skipped;
//! nothing short of the command source closing stops the loop.

pub mod dispatcher;
pub mod receiver;
pub mod runtime;
pub mod sampler;

pub use dispatcher::ActionDispatcher;
pub use receiver::{CommandReceiver, ReceiverStats};
pub use runtime::{BodyRuntime, RuntimeHandle};
pub use sampler::{PerceptSampler, nearby_entities, sample};
