//! Animation guard: plays the previous action's effects before the next one starts.
//!
//! Each finished action maps to a small batch of animations tagged with the
//! board resources they draw on. The batch runs through a [`Planner`], so
//! animations on different hexes overlap while those on the same hex play in
//! order.

use std::time::Duration;

use async_trait::async_trait;
use task_planner::Planner;
use tracing::{debug, trace, warn};
use turn_scheduler::{ActionRecord, Guard, Lifecycle};

use crate::world::{GameAction, Resource};

pub struct AnimationDirector {
    frame: Duration,
}

impl AnimationDirector {
    pub fn new(frame: Duration) -> Self {
        Self { frame }
    }

    /// Animations for a finished action as `(label, resources)`.
    fn effects(action: GameAction, hex: u32) -> Vec<(&'static str, Vec<Resource>)> {
        match action {
            GameAction::BuyUnit => vec![("coin drop", vec![Resource::Treasury])],
            GameAction::PlaceUnit => vec![
                ("unit spawn", vec![Resource::Hex(hex), Resource::Roster]),
                ("roster slide", vec![Resource::Roster]),
            ],
            GameAction::ConquerHex => vec![
                ("flag raise", vec![Resource::Hex(hex)]),
                (
                    "border redraw",
                    vec![Resource::Hex(hex), Resource::Hex(hex.saturating_add(1))],
                ),
                ("score tick", vec![Resource::Treasury]),
            ],
            GameAction::StartTurn | GameAction::EndTurn => Vec::new(),
        }
    }
}

#[async_trait]
impl Guard<GameAction, u32> for AnimationDirector {
    fn name(&self) -> &'static str {
        "animation"
    }

    async fn check(
        &self,
        previous: Option<&ActionRecord<GameAction, u32>>,
        next: &ActionRecord<GameAction, u32>,
    ) {
        // Rejected actions changed nothing on the board
        let Some(previous) = previous.filter(|record| record.lifecycle() == Lifecycle::Resolved)
        else {
            return;
        };

        let hex = previous.args().first().copied().unwrap_or_default();
        let effects = Self::effects(previous.name(), hex);
        if effects.is_empty() {
            return;
        }

        let mut planner = Planner::new();
        for (label, resources) in effects {
            let frame = self.frame;
            planner.add_task(resources, move || async move {
                tokio::time::sleep(frame).await;
                trace!(target: "sandbox::animation", animation = label, "animation finished");
                Ok(())
            });
        }

        debug!(
            target: "sandbox::animation",
            after = %previous,
            before = %next,
            plan = %planner.execution_plan(),
            "playing animations"
        );
        if let Err(error) = planner.execute().await {
            warn!(target: "sandbox::animation", error = %error, "animation batch failed");
        }
    }
}
