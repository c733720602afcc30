//! Explore — walk toward a random nearby point.

use std::f64::consts::TAU;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use embody_config::BehaviorConfig;
use embody_core::action::{ActionCommand, ActionKind};
use embody_core::behavior::{Behavior, BehaviorContext, BehaviorOutcome};
use embody_core::error::BehaviorError;
use embody_core::world::{Vec3, round_tenth};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

pub struct ExploreBehavior {
    rng: Mutex<StdRng>,
    min_distance: f64,
    max_distance: f64,
    duration_ms: u64,
    eye_height: f64,
}

impl ExploreBehavior {
    pub fn new(config: &BehaviorConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    /// Deterministic headings, for tests and replays.
    pub fn seeded(config: &BehaviorConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &BehaviorConfig, rng: StdRng) -> Self {
        Self {
            rng: Mutex::new(rng),
            min_distance: config.explore_min_distance,
            max_distance: config.explore_max_distance,
            duration_ms: config.explore_duration_ms,
            eye_height: config.eye_height,
        }
    }

    /// Heading in [0, 2π) and distance in [min, max).
    ///
    /// An empty distance range always walks `min`.
    fn pick(&self) -> (f64, f64) {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let heading = rng.random_range(0.0..TAU);
        let distance = if self.min_distance < self.max_distance {
            rng.random_range(self.min_distance..self.max_distance)
        } else {
            self.min_distance
        };
        (heading, distance)
    }
}

#[async_trait]
impl Behavior for ExploreBehavior {
    fn kind(&self) -> ActionKind {
        ActionKind::Explore
    }

    fn description(&self) -> &str {
        "Walk toward a random point nearby"
    }

    async fn run(
        &self,
        ctx: &BehaviorContext,
        command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        let Some(agent) = ctx.env.agent() else {
            info!("Explore: agent not spawned");
            return Ok(BehaviorOutcome::skipped("not spawned"));
        };

        let (heading, distance) = self.pick();
        let target = agent
            .position
            .offset(heading.cos() * distance, 0.0, heading.sin() * distance);
        ctx.env
            .look_at(Vec3::new(target.x, agent.position.y + self.eye_height, target.z));
        let plan = ctx.begin_motion(ActionKind::Explore, target, self.duration_ms);

        info!(
            reason = command.reason().unwrap_or("-"),
            distance = round_tenth(distance),
            target = ?target.rounded(),
            "Exploring"
        );
        Ok(BehaviorOutcome::Moving {
            target,
            deadline_ms: plan.deadline_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embody_core::clock::ManualClock;
    use embody_core::sim::{SimCall, SimWorld};
    use embody_core::world::Control;
    use std::sync::Arc;

    fn setup() -> (Arc<SimWorld>, Arc<ManualClock>, BehaviorContext) {
        let world = Arc::new(SimWorld::new("Prometheus"));
        world.spawn_at(Vec3::new(100.0, 70.0, -50.0));
        let clock = Arc::new(ManualClock::new());
        let ctx = BehaviorContext::new(world.clone(), clock.clone());
        (world, clock, ctx)
    }

    #[test]
    fn picks_stay_in_range() {
        let explore = ExploreBehavior::seeded(&BehaviorConfig::default(), 7);
        for _ in 0..500 {
            let (heading, distance) = explore.pick();
            assert!((0.0..TAU).contains(&heading));
            assert!((10.0..30.0).contains(&distance));
        }
    }

    #[test]
    fn empty_distance_range_walks_the_minimum() {
        let config = BehaviorConfig {
            explore_min_distance: 20.0,
            explore_max_distance: 20.0,
            ..BehaviorConfig::default()
        };
        let explore = ExploreBehavior::seeded(&config, 3);
        for _ in 0..10 {
            assert_eq!(explore.pick().1, 20.0);
        }

        let inverted = BehaviorConfig {
            explore_min_distance: 30.0,
            explore_max_distance: 10.0,
            ..BehaviorConfig::default()
        };
        assert_eq!(ExploreBehavior::seeded(&inverted, 3).pick().1, 30.0);
    }

    #[test]
    fn same_seed_same_walk() {
        let a = ExploreBehavior::seeded(&BehaviorConfig::default(), 42);
        let b = ExploreBehavior::seeded(&BehaviorConfig::default(), 42);
        assert_eq!(a.pick(), b.pick());
    }

    #[tokio::test]
    async fn walks_within_the_distance_band() {
        let (world, _, ctx) = setup();
        let explore = ExploreBehavior::seeded(&BehaviorConfig::default(), 1);

        let outcome = explore
            .run(&ctx, &ActionCommand::new(ActionKind::Explore))
            .await
            .unwrap();
        let BehaviorOutcome::Moving {
            target,
            deadline_ms,
        } = outcome
        else {
            panic!("expected movement");
        };

        assert_eq!(deadline_ms, 3000);
        assert_eq!(target.y, 70.0);
        let horizontal = ((target.x - 100.0).powi(2) + (target.z + 50.0).powi(2)).sqrt();
        assert!((10.0 - 1e-9..30.0).contains(&horizontal));

        let calls = world.calls();
        assert_eq!(
            calls[0],
            SimCall::LookAt(Vec3::new(target.x, 70.0 + 1.6, target.z))
        );
        assert_eq!(
            calls[1],
            SimCall::SetControl {
                control: Control::Forward,
                active: true
            }
        );
    }

    #[tokio::test]
    async fn not_spawned_means_no_movement() {
        let world = Arc::new(SimWorld::new("Prometheus"));
        let ctx = BehaviorContext::new(world.clone(), Arc::new(ManualClock::new()));
        let outcome = ExploreBehavior::seeded(&BehaviorConfig::default(), 1)
            .run(&ctx, &ActionCommand::new(ActionKind::Explore))
            .await
            .unwrap();
        assert_eq!(outcome, BehaviorOutcome::skipped("not spawned"));
        assert!(world.calls().is_empty());
    }
}
