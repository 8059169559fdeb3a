// ================================
// src/commander/search.rs - fixed sonar with widening zigzag search
// ================================
use std::iter;

use tracing::debug;

use super::{Command, Commander};
use crate::config::SearchParams;
use crate::sonar::RangeFinder;

/// Turn sequence whose runs grow 1, 1, 2, 2, 3, 3, ... up to `max_run`,
/// alternating right and left, so the search widens instead of rocking in
/// place. A `max_run` of 0 is treated as 1 so the table is never empty.
pub fn widening_zigzag(max_run: u32) -> Vec<Command> {
    (1..=2 * max_run.max(1))
        .flat_map(|step| {
            let dir = if step % 2 == 1 {
                Command::Right
            } else {
                Command::Left
            };
            iter::repeat(dir).take(step.div_ceil(2) as usize)
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Walk,
    Lookup,
}

/// Obstacle avoidance with a single forward-facing sonar and no steering.
///
/// Walks while the reading stays at or above `safe_distance_low`. Once it
/// drops below, the rover replays the zigzag table from the start until the
/// reading climbs to `safe_distance_high`. A timed-out reading counts as 0 m.
pub struct SonarCommander<R> {
    sonar: R,
    safe_distance_low: f64,
    safe_distance_high: f64,
    lookup_cursor: usize,
    lookup_algo: Vec<Command>,
    state: SearchState,
}

impl<R: RangeFinder> SonarCommander<R> {
    pub fn new(sonar: R, params: &SearchParams) -> Self {
        Self {
            sonar,
            safe_distance_low: params.safe_distance_low,
            safe_distance_high: params.safe_distance_high,
            lookup_cursor: 0,
            lookup_algo: widening_zigzag(params.max_run),
            state: SearchState::Lookup,
        }
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn lookup_cursor(&self) -> usize {
        self.lookup_cursor
    }

    fn next_turn(&mut self) -> Command {
        let cmd = self.lookup_algo[self.lookup_cursor % self.lookup_algo.len()];
        self.lookup_cursor += 1;
        cmd
    }
}

impl<R: RangeFinder> Commander for SonarCommander<R> {
    fn scan_cmd(&mut self) -> Command {
        let cur_distance = self.sonar.get_distance().unwrap_or(0.0);
        match self.state {
            SearchState::Walk => {
                if cur_distance >= self.safe_distance_low {
                    return Command::Forward;
                }
                debug!("search: obstacle at {:.2} m, start lookup", cur_distance);
                self.state = SearchState::Lookup;
                self.lookup_cursor = 0;
                self.next_turn()
            }
            SearchState::Lookup => {
                if cur_distance >= self.safe_distance_high {
                    debug!("search: clear at {:.2} m, walk", cur_distance);
                    self.state = SearchState::Walk;
                    return Command::Forward;
                }
                self.next_turn()
            }
        }
    }
}
