mod common;

use std::time::Duration;

use common::{Act, Journal, Slot, describe, settle, wait_active};
use turn_scheduler::{ActionHandle, ActionQueue, QueueEvent, QueueStatus, Vocabulary};

/// Queue where every handler journals itself; MOVE_UNIT and CONQUER_HEX fan out.
fn branching_queue(journal: &Journal) -> ActionQueue<Act, u32> {
    let log = |journal: &Journal| {
        let journal = journal.clone();
        move |action: &ActionHandle<Act, u32>| journal.push(describe(action.record()))
    };

    let move_log = log(journal);
    let conquer_log = log(journal);
    let capture_log = log(journal);
    let end_log = log(journal);

    ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "move a unit", move |action| {
            move_log(&action);
            let target = action.args()[0];
            action.schedule(Act::ConquerHex, [target * 10]);
            action.schedule(Act::ConquerHex, [target * 10 + 1]);
            action.resolve();
        })
        .handler(Act::ConquerHex, "conquer a hex", move |action| {
            conquer_log(&action);
            if action.args()[0] % 10 == 0 {
                action.schedule(Act::CaptureCapital, [action.args()[0]]);
            }
            action.resolve();
        })
        .handler(Act::CaptureCapital, "capture a capital", move |action| {
            capture_log(&action);
            action.resolve();
        })
        .handler(Act::EndTurn, "end the turn", move |action| {
            end_log(&action);
            action.resolve();
        })
        .handler(Act::BuyUnit, "buy a unit", |action| action.resolve())
        .build()
}

#[tokio::test]
async fn siblings_run_in_scheduling_order() {
    let journal = Journal::default();
    let queue = branching_queue(&journal);

    queue.schedule(Act::EndTurn, [1]);
    queue.schedule(Act::EndTurn, [2]);
    queue.schedule(Act::EndTurn, [3]);
    settle(&queue).await;

    assert_eq!(
        journal.entries(),
        vec!["END_TURN(1)", "END_TURN(2)", "END_TURN(3)"]
    );
}

#[tokio::test]
async fn children_unwind_depth_first_before_siblings() {
    let journal = Journal::default();
    let queue = branching_queue(&journal);

    queue.schedule(Act::MoveUnit, [1]);
    queue.schedule(Act::EndTurn, [0]);
    settle(&queue).await;

    assert_eq!(
        journal.entries(),
        vec![
            "MOVE_UNIT(1)",
            "CONQUER_HEX(10)",
            "CAPTURE_CAPITAL(10)",
            "CONQUER_HEX(11)",
            "END_TURN(0)",
        ]
    );
}

#[tokio::test]
async fn children_carry_their_issuer() {
    let journal = Journal::default();
    let queue = branching_queue(&journal);
    let mut events = queue.subscribe();

    queue.schedule(Act::MoveUnit, [2]);
    settle(&queue).await;

    let mut issuers = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let QueueEvent::Scheduled { action, .. } = event {
            issuers.push((action.name(), action.issuer()));
        }
    }
    assert_eq!(
        issuers,
        vec![
            (Act::MoveUnit, None),
            (Act::ConquerHex, Some(Act::MoveUnit)),
            (Act::ConquerHex, Some(Act::MoveUnit)),
            (Act::CaptureCapital, Some(Act::ConquerHex)),
        ]
    );
}

#[tokio::test]
async fn pending_handler_holds_the_queue() {
    let journal = Journal::default();
    let handler_journal = journal.clone();
    let end_journal = journal.clone();

    let queue = ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "animated move", move |action| {
            let journal = handler_journal.clone();
            journal.push("move started");
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                journal.push("move finished");
                action.resolve();
            });
        })
        .handler(Act::EndTurn, "end the turn", move |action| {
            end_journal.push("end turn");
            action.resolve();
        })
        .build();

    queue.schedule(Act::MoveUnit, [1]);
    queue.schedule(Act::EndTurn, []);

    let active = wait_active(&queue).await;
    assert_eq!(active.name(), Act::MoveUnit);
    assert_eq!(queue.status(), QueueStatus::Busy);

    settle(&queue).await;
    assert_eq!(
        journal.entries(),
        vec!["move started", "move finished", "end turn"]
    );
}

#[tokio::test]
async fn external_schedule_during_active_action_runs_next() {
    let journal = Journal::default();
    let parked: Slot<ActionHandle<Act, u32>> = Slot::new();

    let move_journal = journal.clone();
    let move_slot = parked.clone();
    let buy_journal = journal.clone();
    let end_journal = journal.clone();

    let queue = ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "parked move", move |action| {
            move_journal.push("MOVE_UNIT");
            move_slot.put(action);
        })
        .handler(Act::BuyUnit, "buy a unit", move |action| {
            buy_journal.push("BUY_UNIT");
            action.resolve();
        })
        .handler(Act::EndTurn, "end the turn", move |action| {
            end_journal.push("END_TURN");
            action.resolve();
        })
        .build();

    queue.schedule(Act::MoveUnit, []);
    queue.schedule(Act::BuyUnit, []);
    wait_active(&queue).await;

    queue.schedule(Act::EndTurn, []);
    let snapshot = queue.snapshot();
    assert_eq!(snapshot.children.len(), 1);
    assert_eq!(snapshot.children[0].name, "END_TURN");
    assert_eq!(snapshot.plan.len(), 1);
    assert_eq!(snapshot.plan[0].name, "BUY_UNIT");

    parked.take().expect("move handler ran").resolve();
    settle(&queue).await;

    assert_eq!(journal.entries(), vec!["MOVE_UNIT", "END_TURN", "BUY_UNIT"]);
}

#[tokio::test]
async fn lifecycle_events_follow_each_action() {
    let journal = Journal::default();
    let queue = branching_queue(&journal);
    let mut events = queue.subscribe();

    queue.schedule(Act::EndTurn, [4]);
    settle(&queue).await;

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            QueueEvent::Scheduled { buffered, .. } => format!("scheduled buffered={buffered}"),
            QueueEvent::Started { action } => format!("started {action}"),
            QueueEvent::Resolved { action, undoable } => {
                format!("resolved {action} undoable={undoable}")
            }
            QueueEvent::Idle => "idle".to_owned(),
            other => format!("unexpected {other:?}"),
        });
    }

    assert_eq!(
        kinds,
        vec![
            "scheduled buffered=false",
            "started END_TURN#1",
            "resolved END_TURN#1 undoable=false",
            "idle",
        ]
    );
}

#[tokio::test]
async fn debug_dump_reflects_live_state() {
    let parked: Slot<ActionHandle<Act, u32>> = Slot::new();
    let slot = parked.clone();

    let queue = ActionQueue::<Act, u32>::builder(Vocabulary::all())
        .handler(Act::MoveUnit, "parked move", move |action| {
            action.schedule(Act::EndTurn, []);
            slot.put(action);
        })
        .handler(Act::EndTurn, "end the turn", |action| action.resolve())
        .undo(Act::MoveUnit, |_| async {})
        .build();

    queue.schedule(Act::MoveUnit, [7]);
    wait_active(&queue).await;
    queue.schedule(Act::EndTurn, []);

    let dump = queue.debug_dump();
    assert!(dump.starts_with("status: busy\n"), "{dump}");
    assert!(dump.contains("active: MOVE_UNIT#1(7)\n"), "{dump}");
    assert!(
        dump.contains("children (2):\n  END_TURN#2() <- MOVE_UNIT\n  END_TURN#3()\n"),
        "{dump}"
    );
    assert!(dump.contains("parked move [undo]"), "{dump}");

    parked.take().expect("move handler ran").resolve();
    settle(&queue).await;
    assert_eq!(queue.snapshot().status, QueueStatus::Idle);
}
