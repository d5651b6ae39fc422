// event.rs - Events reported by the control loop to its consumers

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::grid::Cell;

/// Execution state announced through [`Event::StateChange`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum State {
    Paused,
    Executing,
    Quitting,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Paused => write!(f, "Paused"),
            State::Executing => write!(f, "Executing"),
            State::Quitting => write!(f, "Quitting"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A cell changed state; turn 0 reports every live cell of the initial image.
    CellFlipped { completed_turns: u64, cell: Cell },
    TurnComplete { completed_turns: u64 },
    AliveCellsCount { completed_turns: u64, cells_count: usize },
    /// The last per-turn event of a run that reached its end normally or via quit.
    FinalTurnComplete { completed_turns: u64, alive: Vec<Cell> },
    StateChange { completed_turns: u64, new_state: State },
}

impl Event {
    pub fn completed_turns(&self) -> u64 {
        match self {
            Event::CellFlipped { completed_turns, .. }
            | Event::TurnComplete { completed_turns }
            | Event::AliveCellsCount { completed_turns, .. }
            | Event::FinalTurnComplete { completed_turns, .. }
            | Event::StateChange { completed_turns, .. } => *completed_turns,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::CellFlipped { cell, .. } => write!(f, "Cell flipped at ({}, {})", cell.x, cell.y),
            Event::TurnComplete { completed_turns } => write!(f, "Turn {completed_turns} complete"),
            Event::AliveCellsCount { completed_turns, cells_count } => {
                write!(f, "Alive cells: {cells_count} after {completed_turns} turns")
            }
            Event::FinalTurnComplete { completed_turns, alive } => {
                write!(f, "Final turn {completed_turns} complete with {} alive cells", alive.len())
            }
            Event::StateChange { new_state, .. } => write!(f, "{new_state}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_event_carries_its_turn() {
        let events = [
            Event::CellFlipped { completed_turns: 1, cell: Cell { x: 0, y: 0 } },
            Event::TurnComplete { completed_turns: 2 },
            Event::AliveCellsCount { completed_turns: 3, cells_count: 9 },
            Event::FinalTurnComplete { completed_turns: 4, alive: vec![] },
            Event::StateChange { completed_turns: 5, new_state: State::Quitting },
        ];
        let turns: Vec<u64> = events.iter().map(Event::completed_turns).collect();
        assert_eq!(turns, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn display_is_human_readable() {
        let event = Event::AliveCellsCount { completed_turns: 10, cells_count: 42 };
        assert_eq!(event.to_string(), "Alive cells: 42 after 10 turns");
        let event = Event::StateChange { completed_turns: 1, new_state: State::Paused };
        assert_eq!(event.to_string(), "Paused");
    }
}
