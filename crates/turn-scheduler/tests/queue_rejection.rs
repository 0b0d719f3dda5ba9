mod common;

use std::sync::{Arc, Mutex};

use common::{Act, Journal, Slot, settle, wait_active};
use turn_scheduler::{
    ActionHandle, ActionQueue, ActionRecord, Lifecycle, QueueEvent, Rejection, Vocabulary,
};

const UNIT_COST: u32 = 10;

/// BUY_UNIT schedules the conquest it pays for, then checks the treasury.
fn purchase_queue(
    gold: u32,
    journal: &Journal,
    conquest: &Slot<ActionRecord<Act, u32>>,
) -> ActionQueue<Act, u32> {
    let treasury = Arc::new(Mutex::new(gold));
    let buy = journal.clone();
    let conquer = journal.clone();
    let end = journal.clone();
    let conquest = conquest.clone();

    ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::BuyUnit, "buy a unit", move |action| {
            buy.push(format!("buy {}", action.args()[0]));
            conquest.put(action.schedule(Act::ConquerHex, [action.args()[0]]));

            let mut gold = treasury.lock().unwrap();
            if *gold < UNIT_COST {
                action.reject("cannot afford purchase");
            } else {
                *gold -= UNIT_COST;
                action.resolve();
            }
        })
        .handler(Act::ConquerHex, "conquer a hex", move |action| {
            conquer.push(format!("conquer {}", action.args()[0]));
            action.resolve();
        })
        .handler(Act::EndTurn, "end the turn", move |action| {
            end.push("end turn");
            action.resolve();
        })
        .undo(Act::BuyUnit, |_| async {})
        .undo(Act::ConquerHex, |_| async {})
        .build()
}

#[tokio::test]
async fn rejected_purchase_never_runs_its_conquest() {
    let journal = Journal::default();
    let conquest = Slot::new();
    let queue = purchase_queue(5, &journal, &conquest);
    let mut events = queue.subscribe();

    let purchase = queue.schedule(Act::BuyUnit, [42]);
    queue.schedule(Act::EndTurn, []);
    settle(&queue).await;

    assert_eq!(journal.entries(), vec!["buy 42", "end turn"]);
    assert_eq!(
        purchase.lifecycle(),
        Lifecycle::Rejected(Rejection::new("cannot afford purchase"))
    );
    let conquest = conquest.take().expect("purchase scheduled a conquest");
    assert_eq!(conquest.lifecycle(), Lifecycle::Discarded);

    let mut discarded = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let QueueEvent::Discarded { action } = event {
            discarded.push(action.id());
        }
    }
    assert_eq!(discarded, vec![conquest.id()]);
}

#[tokio::test]
async fn affordable_purchase_runs_its_conquest() {
    let journal = Journal::default();
    let conquest = Slot::new();
    let queue = purchase_queue(25, &journal, &conquest);

    queue.schedule(Act::BuyUnit, [7]);
    queue.schedule(Act::EndTurn, []);
    settle(&queue).await;

    assert_eq!(journal.entries(), vec!["buy 7", "conquer 7", "end turn"]);
    let conquest = conquest.take().expect("purchase scheduled a conquest");
    assert_eq!(conquest.lifecycle(), Lifecycle::Resolved);
}

#[tokio::test]
async fn rejection_leaves_history_untouched() {
    let journal = Journal::default();
    let conquest = Slot::new();
    let queue = purchase_queue(15, &journal, &conquest);

    // Only the first purchase is affordable
    queue.schedule(Act::BuyUnit, [1]);
    queue.schedule(Act::BuyUnit, [2]);
    settle(&queue).await;

    assert_eq!(journal.entries(), vec!["buy 1", "conquer 1", "buy 2"]);
    let history: Vec<_> = queue.history().iter().map(|record| record.name()).collect();
    assert_eq!(history, vec![Act::BuyUnit, Act::ConquerHex]);
}

fn parked_queue(parked: &Slot<ActionHandle<Act, u32>>) -> ActionQueue<Act, u32> {
    let slot = parked.clone();
    ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "parked move", move |action| slot.put(action))
        .build()
}

#[tokio::test]
#[should_panic(expected = "resolved twice")]
async fn resolving_twice_panics() {
    let parked = Slot::new();
    let queue = parked_queue(&parked);

    queue.schedule(Act::MoveUnit, []);
    wait_active(&queue).await;
    let action = parked.take().expect("move handler ran");

    action.resolve();
    action.resolve();
}

#[tokio::test]
#[should_panic(expected = "resolved twice")]
async fn rejecting_a_resolved_action_panics() {
    let parked = Slot::new();
    let queue = parked_queue(&parked);

    queue.schedule(Act::MoveUnit, []);
    wait_active(&queue).await;
    let action = parked.take().expect("move handler ran");

    action.resolve();
    action.reject("too late");
}

#[tokio::test]
#[should_panic(expected = "cannot schedule unknown action `END_TURN`")]
async fn scheduling_unknown_action_panics() {
    let queue = ActionQueue::<Act, u32>::builder(Vocabulary::new([Act::MoveUnit]))
        .handler(Act::MoveUnit, "move", |action| action.resolve())
        .build();

    queue.schedule(Act::EndTurn, []);
}

#[tokio::test]
#[should_panic(expected = "no handler bound")]
async fn scheduling_unbound_action_panics() {
    let queue = ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "move", |action| action.resolve())
        .build();

    queue.schedule(Act::CaptureCapital, []);
}
