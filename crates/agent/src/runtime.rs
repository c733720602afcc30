//! Body runtime — wires the environment, the transports and the behaviors
//! together and runs the perception-action loop.
//!
//! Four tasks share one [`BehaviorContext`]:
//! - **lifecycle**: follows environment events; on the first spawn it says
//!   the greeting and starts the sampler
//! - **sampler**: publishes a percept every tick
//! - **receiver**: consumes commands one at a time, in arrival order
//! - **motion**: sleeps until the earliest motion deadline and releases
//!   forward motion

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use embody_behaviors::default_registry;
use embody_config::BodyConfig;
use embody_core::behavior::{BehaviorContext, BehaviorRegistry};
use embody_core::clock::TokioClock;
use embody_core::environment::{Environment, EnvironmentEvent};
use embody_core::error::TransportError;
use embody_core::event::{BodyEvent, EventBus};
use embody_core::transport::{CommandSource, PerceptPublisher};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::dispatcher::ActionDispatcher;
use crate::receiver::CommandReceiver;
use crate::sampler::PerceptSampler;

type SharedHandle = Arc<Mutex<Option<JoinHandle<()>>>>;

pub struct BodyRuntime {
    config: BodyConfig,
    env: Arc<dyn Environment>,
    publisher: Arc<dyn PerceptPublisher>,
    source: Arc<dyn CommandSource>,
    registry: Option<BehaviorRegistry>,
    events: Arc<EventBus>,
}

impl BodyRuntime {
    pub fn new(
        config: BodyConfig,
        env: Arc<dyn Environment>,
        publisher: Arc<dyn PerceptPublisher>,
        source: Arc<dyn CommandSource>,
    ) -> Self {
        Self {
            config,
            env,
            publisher,
            source,
            registry: None,
            events: Arc::new(EventBus::default()),
        }
    }

    /// Use a custom behavior registry instead of the built-in one.
    pub fn with_registry(mut self, registry: BehaviorRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// The bus domain events are published on.
    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    /// Start every task. Fails only if the command source cannot start.
    pub async fn start(self) -> Result<RuntimeHandle, TransportError> {
        let clock = Arc::new(TokioClock::new());
        let ctx = BehaviorContext::new(self.env.clone(), clock.clone())
            .with_events(self.events.clone());
        let registry = self
            .registry
            .unwrap_or_else(|| default_registry(&self.config.behaviors));
        info!(
            behaviors = ?registry.names(),
            publisher = self.publisher.name(),
            source = self.source.name(),
            "Body runtime starting"
        );

        // Subscribe before anything can spawn so the event is not missed
        let env_events = self.env.subscribe();

        let rx = self.source.start().await?;
        let dispatcher = Arc::new(ActionDispatcher::new(registry, ctx.clone()));
        let receiver_task = tokio::spawn(async move {
            CommandReceiver::new(dispatcher).run(rx).await;
        });

        let motion_task = tokio::spawn(run_motion(ctx, clock));

        let sampler = Arc::new(PerceptSampler::new(
            self.env.clone(),
            self.publisher.clone(),
            self.config.perception.clone(),
        ));
        let sampler_task: SharedHandle = Arc::new(Mutex::new(None));
        let lifecycle = Lifecycle {
            env: self.env.clone(),
            events: self.events.clone(),
            greeting: self.config.environment.greeting.clone(),
            sampler,
            sampler_task: sampler_task.clone(),
        };
        let lifecycle_task = tokio::spawn(lifecycle.run(env_events));

        Ok(RuntimeHandle {
            source: self.source,
            lifecycle: lifecycle_task,
            receiver: receiver_task,
            motion: motion_task,
            sampler: sampler_task,
        })
    }
}

/// Fire motion releases as their deadlines pass.
async fn run_motion(ctx: BehaviorContext, clock: Arc<TokioClock>) {
    loop {
        match ctx.motion.next_deadline() {
            Some(deadline) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(clock.instant_at(deadline)) => {
                        ctx.release_due();
                    }
                    _ = ctx.motion.changed() => {}
                }
            }
            None => ctx.motion.changed().await,
        }
    }
}

struct Lifecycle {
    env: Arc<dyn Environment>,
    events: Arc<EventBus>,
    greeting: String,
    sampler: Arc<PerceptSampler>,
    sampler_task: SharedHandle,
}

impl Lifecycle {
    async fn run(self, mut rx: broadcast::Receiver<EnvironmentEvent>) {
        if self.env.agent().is_some() {
            self.on_spawn();
        }

        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Environment events lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                EnvironmentEvent::Spawned => self.on_spawn(),
                EnvironmentEvent::Chat { username, message } => {
                    if username != self.env.username() {
                        info!("[{username}]: {message}");
                    }
                }
                EnvironmentEvent::Kicked { reason } => {
                    warn!(reason = %reason, "Kicked from environment");
                    self.events.publish(BodyEvent::Kicked {
                        reason,
                        timestamp: Utc::now(),
                    });
                }
                EnvironmentEvent::Error { message } => {
                    warn!(error = %message, "Environment error");
                }
                EnvironmentEvent::Disconnected => {
                    warn!("Environment disconnected");
                    self.events.publish(BodyEvent::Disconnected {
                        timestamp: Utc::now(),
                    });
                    break;
                }
            }
        }
    }

    /// Start the sampler once; later spawns (respawns) only log.
    fn on_spawn(&self) {
        let mut task = self
            .sampler_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            info!("Agent respawned");
            return;
        }

        info!(username = self.env.username(), "Agent spawned");
        if !self.greeting.is_empty() {
            self.env.chat(&self.greeting);
        }
        *task = Some(self.sampler.clone().start());
        self.events.publish(BodyEvent::Spawned {
            timestamp: Utc::now(),
        });
    }
}

/// Handles to a running Body.
pub struct RuntimeHandle {
    source: Arc<dyn CommandSource>,
    lifecycle: JoinHandle<()>,
    receiver: JoinHandle<()>,
    motion: JoinHandle<()>,
    sampler: SharedHandle,
}

impl RuntimeHandle {
    /// Whether the sampler has been started.
    pub fn is_sampling(&self) -> bool {
        self.sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Resolves when the environment disconnects.
    pub async fn disconnected(&mut self) {
        let _ = (&mut self.lifecycle).await;
    }

    /// Resolves when the command source closes and the receiver drains.
    pub async fn receiver_finished(&mut self) {
        let _ = (&mut self.receiver).await;
    }

    /// Stop accepting commands and abort every task.
    pub async fn shutdown(self) {
        if let Err(e) = self.source.stop().await {
            warn!(error = %e, "Command source did not stop cleanly");
        }
        self.lifecycle.abort();
        self.receiver.abort();
        self.motion.abort();
        if let Some(task) = self
            .sampler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        info!("Body runtime stopped");
    }
}
