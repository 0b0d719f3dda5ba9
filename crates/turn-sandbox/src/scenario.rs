//! Scripted single turn: start, buy units, place and conquer, optionally undo, end.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};
use turn_scheduler::{ActionBus, ActionQueue, QueueConfig, Vocabulary};

use crate::animation::AnimationDirector;
use crate::world::{GameAction, SharedWorld, Signal, UNIT_COST, World};

/// First hex units are placed on; each further unit goes one hex further.
const FIRST_HEX: u32 = 10;

const MISSING_HEX: &str = "missing hex";

/// Scenario inputs, usually taken from the command line.
#[derive(Clone, Debug)]
pub struct ScenarioOptions {
    pub treasury: u32,
    pub units: u32,
    pub undo: bool,
    pub dump: bool,
    pub frame: Duration,
}

/// World state after the turn, plus the final debug dump when requested.
#[derive(Debug)]
pub struct TurnReport {
    pub gold: u32,
    pub units: Vec<u32>,
    pub owned: Vec<u32>,
    pub score: u32,
    pub dump: Option<String>,
}

/// Listeners reacting to every player action and to the end of the turn.
fn build_bus(world: &SharedWorld) -> ActionBus<Signal, u32> {
    let mut bus = ActionBus::new(Vocabulary::all());

    let score = world.clone();
    bus.add_handler(Signal::PlayerAct, "score panel", move |call, ticket| {
        score.with(|world| world.score += 1);
        let undo = score.clone();
        call.push_undo(move || async move { undo.with(|world| world.score -= 1) });
        ticket.done();
    });

    let fog = world.clone();
    bus.add_handler(Signal::PlayerAct, "fog of war", move |call, ticket| {
        let fog = fog.clone();
        let hex: u32 = call.args().first().copied().unwrap_or_default();
        tokio::spawn(async move {
            // Line-of-sight recompute happens off the queue
            tokio::task::yield_now().await;
            let sight = hex.saturating_sub(1)..=hex.saturating_add(1);
            fog.with(|world| world.revealed.extend(sight));
            ticket.done();
        });
    });

    let income = world.clone();
    bus.add_handler(Signal::TurnEnded, "income", move |_, ticket| {
        income.with(|world| world.gold += world.owned.len() as u32);
        ticket.done();
    });

    bus
}

fn build_queue(
    world: &SharedWorld,
    bus: &Arc<ActionBus<Signal, u32>>,
    options: &ScenarioOptions,
    config: QueueConfig,
) -> ActionQueue<GameAction, u32> {
    let units = options.units;
    let buy = world.clone();
    let place = world.clone();
    let conquer = world.clone();
    let refund = world.clone();
    let unplace = world.clone();
    let release = world.clone();
    let start = world.clone();
    let conquer_bus = Arc::clone(bus);
    let end_bus = Arc::clone(bus);

    ActionQueue::<GameAction, u32>::builder(Vocabulary::all())
        .config(config)
        .handler(GameAction::StartTurn, "start the turn and plan purchases", move |action| {
            let turn = action.args().first().copied().unwrap_or(1);
            start.with(|world| world.turn = turn);
            for slot in 0..units {
                action.schedule(GameAction::BuyUnit, [FIRST_HEX + slot]);
            }
            action.resolve();
        })
        .handler(GameAction::BuyUnit, "buy a unit for a hex", move |action| {
            let Some(hex) = action.args().first().copied() else {
                action.reject(MISSING_HEX);
                return;
            };
            // Scheduled before the affordability check; a rejection discards them
            action.schedule(GameAction::PlaceUnit, [hex]);
            action.schedule(GameAction::ConquerHex, [hex]);

            if buy.with(|world| world.spend(UNIT_COST)) {
                action.resolve();
            } else {
                action.reject("cannot afford purchase");
            }
        })
        .handler(GameAction::PlaceUnit, "place a unit on a hex", move |action| {
            let Some(hex) = action.args().first().copied() else {
                action.reject(MISSING_HEX);
                return;
            };
            place.with(|world| world.units.push(hex));
            action.resolve();
        })
        .handler(GameAction::ConquerHex, "conquer a hex and notify listeners", move |action| {
            let Some(hex) = action.args().first().copied() else {
                action.reject(MISSING_HEX);
                return;
            };
            conquer.with(|world| world.owned.insert(hex));

            let bus = Arc::clone(&conquer_bus);
            tokio::spawn(async move {
                match bus.execute(Signal::PlayerAct, [hex]).await {
                    Ok(()) => action.resolve(),
                    Err(error) => action.reject(error.to_string()),
                }
            });
        })
        .handler(GameAction::EndTurn, "end the turn", move |action| {
            let bus = Arc::clone(&end_bus);
            tokio::spawn(async move {
                match bus.execute(Signal::TurnEnded, []).await {
                    Ok(()) => action.resolve(),
                    Err(error) => action.reject(error.to_string()),
                }
            });
        })
        .undo(GameAction::BuyUnit, move |_| {
            let world = refund.clone();
            async move { world.with(|world| world.gold += UNIT_COST) }
        })
        .undo(GameAction::PlaceUnit, move |record| {
            let world = unplace.clone();
            async move {
                if let Some(&hex) = record.args().first() {
                    world.with(|world| world.remove_unit(hex));
                }
            }
        })
        .undo(GameAction::ConquerHex, move |record| {
            let world = release.clone();
            async move {
                if let Some(hex) = record.args().first() {
                    world.with(|world| world.owned.remove(hex));
                }
            }
        })
        .guard(AnimationDirector::new(options.frame))
        .build()
}

/// Plays one turn and returns the resulting world.
pub async fn run(options: ScenarioOptions, config: QueueConfig) -> Result<TurnReport> {
    let world = SharedWorld::new(World::new(options.treasury));
    let bus = Arc::new(build_bus(&world));
    bus.check_handlers();
    let queue = build_queue(&world, &bus, &options, config);

    queue.schedule(GameAction::StartTurn, [1]);
    queue.wait_idle().await;
    world.with(|world| info!(target: "sandbox", %world, "purchases settled"));

    if options.undo {
        match queue.undo_until(GameAction::BuyUnit).await {
            Ok(undone) => {
                // The purchase itself is still on top
                let purchase = queue.undo_last_action().await?;
                bus.undo_last_action().await;
                info!(
                    target: "sandbox",
                    purchase = %purchase,
                    children = undone.len(),
                    "last purchase undone"
                );
            }
            Err(error) => warn!(target: "sandbox", error = %error, "nothing to undo"),
        }
        world.with(|world| info!(target: "sandbox", %world, "after undo"));
    }

    queue.schedule(GameAction::EndTurn, []);
    queue.wait_idle().await;

    let dump = options.dump.then(|| queue.debug_dump());
    queue.shutdown().await?;

    let report = world.with(|world| TurnReport {
        gold: world.gold,
        units: world.units.clone(),
        owned: world.owned.iter().copied().collect(),
        score: world.score,
        dump,
    });
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(treasury: u32, units: u32, undo: bool) -> ScenarioOptions {
        ScenarioOptions {
            treasury,
            units,
            undo,
            dump: true,
            frame: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn unaffordable_purchase_is_skipped() {
        let report = run(options(25, 3, false), QueueConfig::default())
            .await
            .unwrap();

        // Two units bought, the third rejected; income is one gold per hex
        assert_eq!(report.units, vec![10, 11]);
        assert_eq!(report.owned, vec![10, 11]);
        assert_eq!(report.score, 2);
        assert_eq!(report.gold, 5 + 2);
    }

    #[tokio::test]
    async fn undo_rolls_back_last_purchase() {
        let report = run(options(30, 2, true), QueueConfig::default())
            .await
            .unwrap();

        assert_eq!(report.units, vec![10]);
        assert_eq!(report.owned, vec![10]);
        assert_eq!(report.score, 1);
        assert_eq!(report.gold, 20 + 1);
    }

    #[tokio::test]
    async fn hex_actions_without_argument_are_rejected() {
        let world = SharedWorld::new(World::new(30));
        let bus = Arc::new(build_bus(&world));
        let queue = build_queue(&world, &bus, &options(30, 0, false), QueueConfig::default());

        queue.schedule(GameAction::BuyUnit, []);
        queue.schedule(GameAction::PlaceUnit, []);
        queue.schedule(GameAction::ConquerHex, []);
        tokio::time::timeout(Duration::from_secs(1), queue.wait_idle())
            .await
            .expect("queue should settle");

        assert!(queue.history().is_empty());
        world.with(|world| {
            assert_eq!(world.gold, 30);
            assert!(world.units.is_empty());
            assert!(world.owned.is_empty());
        });
    }

    #[tokio::test]
    async fn dump_shows_every_handler() {
        let report = run(options(10, 1, false), QueueConfig::default())
            .await
            .unwrap();

        let dump = report.dump.expect("dump requested");
        assert!(dump.starts_with("status: idle\n"), "{dump}");
        assert!(dump.contains("handlers (5):"), "{dump}");
        assert!(dump.contains("buy a unit for a hex [undo]"), "{dump}");
        // END_TURN is not undoable, so the turn ends with an empty history
        assert!(dump.contains("history (0):"), "{dump}");
    }
}
