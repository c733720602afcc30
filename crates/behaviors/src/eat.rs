//! Eat — equip the first food item and consume it.

use async_trait::async_trait;
use embody_config::BehaviorConfig;
use embody_core::action::{ActionCommand, ActionKind};
use embody_core::behavior::{Behavior, BehaviorContext, BehaviorOutcome};
use embody_core::error::BehaviorError;
use embody_core::world::{EquipSlot, Item};
use tracing::info;

pub struct EatBehavior {
    keywords: Vec<String>,
}

impl EatBehavior {
    pub fn new(config: &BehaviorConfig) -> Self {
        Self {
            keywords: config.food_keywords.clone(),
        }
    }

    /// First item, in inventory order, whose name contains a food keyword.
    pub fn find_food<'a>(&self, inventory: &'a [Item]) -> Option<&'a Item> {
        inventory
            .iter()
            .find(|item| self.keywords.iter().any(|k| item.name.contains(k.as_str())))
    }
}

fn failed(source: embody_core::error::EnvironmentError) -> BehaviorError {
    BehaviorError::Environment {
        behavior: "eat".into(),
        source,
    }
}

#[async_trait]
impl Behavior for EatBehavior {
    fn kind(&self) -> ActionKind {
        ActionKind::Eat
    }

    fn description(&self) -> &str {
        "Eat the first food item in the inventory"
    }

    async fn run(
        &self,
        ctx: &BehaviorContext,
        _command: &ActionCommand,
    ) -> Result<BehaviorOutcome, BehaviorError> {
        let inventory = ctx.env.inventory();
        let Some(food) = self.find_food(&inventory) else {
            info!("Eat: no food");
            return Ok(BehaviorOutcome::skipped("no food"));
        };

        ctx.env.equip(food, EquipSlot::Hand).await.map_err(failed)?;
        ctx.env.activate_item().await.map_err(failed)?;

        info!(item = %food.name, "Ate");
        Ok(BehaviorOutcome::Consumed {
            item: food.name.clone(),
        })
    }
}
