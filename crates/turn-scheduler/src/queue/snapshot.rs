//! Point-in-time view of a queue, rendered as the debug dump.

use std::fmt;

use super::{QueueStatus, Shared};
use crate::action::{ActionArg, ActionId, ActionName, ActionRecord};
use crate::sync::lock;

/// Owned, type-erased description of one action.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionSummary {
    pub id: ActionId,
    pub name: String,
    pub issuer: Option<String>,
    pub args: Vec<String>,
}

impl<K: ActionName, A: ActionArg> From<&ActionRecord<K, A>> for ActionSummary {
    fn from(record: &ActionRecord<K, A>) -> Self {
        Self {
            id: record.id(),
            name: record.name().to_string(),
            issuer: record.issuer().map(|issuer| issuer.to_string()),
            args: record.args().iter().map(|arg| format!("{arg:?}")).collect(),
        }
    }
}

impl fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}({})", self.name, self.id, self.args.join(", "))?;
        if let Some(issuer) = &self.issuer {
            write!(f, " <- {issuer}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HandlerSummary {
    pub name: String,
    pub description: String,
    pub undoable: bool,
}

/// History, active action, buffered children, plan and handler table.
///
/// Meant for live inspection panels; never feed it back into control flow.
#[derive(Clone, Debug)]
pub struct QueueSnapshot {
    pub status: QueueStatus,
    /// Oldest first.
    pub history: Vec<ActionSummary>,
    pub active: Option<ActionSummary>,
    /// Scheduled by the active action, in scheduling order.
    pub children: Vec<ActionSummary>,
    /// Head first.
    pub plan: Vec<ActionSummary>,
    pub handlers: Vec<HandlerSummary>,
}

impl QueueSnapshot {
    pub(super) fn capture<K: ActionName, A: ActionArg>(shared: &Shared<K, A>) -> Self {
        let handlers = shared
            .registry
            .handlers()
            .map(|(name, description, undoable)| HandlerSummary {
                name: name.to_string(),
                description: description.to_owned(),
                undoable,
            })
            .collect();

        let state = lock(&shared.state);
        Self {
            status: *shared.status.borrow(),
            history: state.history.iter().map(ActionSummary::from).collect(),
            active: state.active_record().map(ActionSummary::from),
            children: state.children.iter().map(ActionSummary::from).collect(),
            plan: state.plan.iter().map(ActionSummary::from).collect(),
            handlers,
        }
    }
}

fn write_section(f: &mut fmt::Formatter<'_>, title: &str, actions: &[ActionSummary]) -> fmt::Result {
    writeln!(f, "{title} ({}):", actions.len())?;
    for action in actions {
        writeln!(f, "  {action}")?;
    }
    Ok(())
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "status: {}", self.status)?;
        write_section(f, "history", &self.history)?;
        match &self.active {
            Some(active) => writeln!(f, "active: {active}")?,
            None => writeln!(f, "active: -")?,
        }
        write_section(f, "children", &self.children)?;
        write_section(f, "plan", &self.plan)?;

        writeln!(f, "handlers ({}):", self.handlers.len())?;
        for handler in &self.handlers {
            let undo = if handler.undoable { " [undo]" } else { "" };
            writeln!(f, "  {:<16} {}{undo}", handler.name, handler.description)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: u64, name: &str, issuer: Option<&str>, args: &[&str]) -> ActionSummary {
        ActionSummary {
            id: ActionId(id),
            name: name.to_owned(),
            issuer: issuer.map(str::to_owned),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
        }
    }

    #[test]
    fn dump_lists_every_section() {
        let snapshot = QueueSnapshot {
            status: QueueStatus::Busy,
            history: vec![summary(1, "BUY_UNIT", None, &["3", "4"])],
            active: Some(summary(2, "CONQUER_HEX", None, &["5"])),
            children: vec![summary(3, "END_TURN", Some("CONQUER_HEX"), &[])],
            plan: Vec::new(),
            handlers: vec![HandlerSummary {
                name: "BUY_UNIT".to_owned(),
                description: "buy a unit".to_owned(),
                undoable: true,
            }],
        };

        let dump = snapshot.to_string();
        assert_eq!(
            dump,
            "status: busy\n\
             history (1):\n  BUY_UNIT#1(3, 4)\n\
             active: CONQUER_HEX#2(5)\n\
             children (1):\n  END_TURN#3() <- CONQUER_HEX\n\
             plan (0):\n\
             handlers (1):\n  BUY_UNIT         buy a unit [undo]\n"
        );
    }
}
