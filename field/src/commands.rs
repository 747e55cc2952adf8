//! Command source for UI buttons and recognised voice keywords.
//!
//! Recognition itself happens elsewhere; this only turns an already-recognised keyword into
//! a [`Command`] on the bus.

use std::rc::Rc;

use crate::bus::{Command, CommandBus};

/// Map a recognised keyword to a command. Case and extra whitespace are ignored.
pub fn parse_keyword(keyword: &str) -> Option<Command> {
    let normalized = keyword
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ");

    let command = match normalized.as_str() {
        "create new grid" | "new grid" | "create grid" => Command::CreateGrid,
        "drop" => Command::Drop { all: false },
        "drop all" => Command::Drop { all: true },
        "revert" | "go back" => Command::Revert { all: false },
        "revert all" | "all go back" | "total recall" => Command::Revert { all: true },
        _ => return None,
    };
    Some(command)
}

/// Publishes commands on behalf of a UI or voice front end.
#[derive(Clone)]
pub struct SpeechCommands {
    bus: Rc<CommandBus>,
}

impl SpeechCommands {
    pub fn new(bus: Rc<CommandBus>) -> Self {
        Self { bus }
    }

    pub fn create_new_grid(&self) {
        self.bus.publish(&Command::CreateGrid);
    }

    pub fn drop_cubes(&self, all: bool) {
        self.bus.publish(&Command::Drop { all });
    }

    pub fn revert_cubes(&self, all: bool) {
        self.bus.publish(&Command::Revert { all });
    }

    /// Publish the command for `keyword`. Unknown keywords are ignored and return `None`.
    pub fn publish_keyword(&self, keyword: &str) -> Option<Command> {
        let Some(command) = parse_keyword(keyword) else {
            log::debug!("unrecognised keyword {keyword:?}");
            return None;
        };
        self.bus.publish(&command);
        Some(command)
    }
}
