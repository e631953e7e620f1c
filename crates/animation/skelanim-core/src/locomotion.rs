//! Locomotion state machine driven by discrete gameplay signals.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Highest speed reachable through [`LocomotionStateMachine::move_fast`].
pub const MAX_MOVE_SPEED: i32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocomotionState {
    #[default]
    Idle,
    SlowRun,
    NarutoRun,
    FastRun,
    Dance,
}

impl LocomotionState {
    pub const ALL: [LocomotionState; 5] = [
        LocomotionState::Idle,
        LocomotionState::SlowRun,
        LocomotionState::NarutoRun,
        LocomotionState::FastRun,
        LocomotionState::Dance,
    ];

    /// Transition table. Dancing overrides any speed-based transition.
    ///
    /// `FastRun` is entered at speed 3, which the clamped speed signals never
    /// produce.
    pub fn next(self, speed: i32, dancing: bool) -> LocomotionState {
        use LocomotionState::*;
        if dancing {
            return Dance;
        }
        match self {
            Idle if speed > 0 => SlowRun,
            SlowRun if speed == 0 => Idle,
            SlowRun if speed == 2 => NarutoRun,
            NarutoRun if speed == 1 => SlowRun,
            NarutoRun if speed == 3 => FastRun,
            FastRun if speed == 2 => NarutoRun,
            Dance => Idle,
            other => other,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Per-instance locomotion state.
///
/// Speed guards read the speed latched at the previous [`update`](Self::update)
/// (the live speed on the first update), so a speed change shows up in the
/// state one update later. The dance flag is read live.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocomotionStateMachine {
    state: LocomotionState,
    move_speed: i32,
    is_dancing: bool,
    latched_speed: Option<i32>,
}

impl LocomotionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn state(&self) -> LocomotionState {
        self.state
    }

    #[inline]
    pub fn move_speed(&self) -> i32 {
        self.move_speed
    }

    #[inline]
    pub fn is_dancing(&self) -> bool {
        self.is_dancing
    }

    pub fn move_fast(&mut self) {
        self.move_speed = (self.move_speed + 1).clamp(0, MAX_MOVE_SPEED);
    }

    pub fn move_slow(&mut self) {
        self.move_speed = (self.move_speed - 1).clamp(0, MAX_MOVE_SPEED);
    }

    pub fn set_dancing(&mut self, dancing: bool) {
        self.is_dancing = dancing;
    }

    pub fn toggle_dance(&mut self) {
        self.is_dancing = !self.is_dancing;
    }

    /// Evaluate one transition and return the resulting state.
    pub fn update(&mut self) -> LocomotionState {
        let guard_speed = self.latched_speed.unwrap_or(self.move_speed);
        let next = self.state.next(guard_speed, self.is_dancing);
        self.latched_speed = Some(self.move_speed);
        if next != self.state {
            debug!(from = ?self.state, to = ?next, speed = guard_speed, "locomotion transition");
            self.state = next;
        }
        next
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LocomotionState::*;

    #[test]
    fn speed_scenario_follows_latched_guards() {
        let mut fsm = LocomotionStateMachine::new();
        let mut states = vec![fsm.state()];
        for up in [true, true, true, false, false] {
            if up {
                fsm.move_fast();
            } else {
                fsm.move_slow();
            }
            states.push(fsm.update());
        }
        assert_eq!(states, vec![Idle, SlowRun, SlowRun, NarutoRun, NarutoRun, SlowRun]);
        assert_eq!(fsm.move_speed(), 0);
    }

    #[test]
    fn speed_is_clamped() {
        let mut fsm = LocomotionStateMachine::new();
        fsm.move_slow();
        assert_eq!(fsm.move_speed(), 0);
        for _ in 0..5 {
            fsm.move_fast();
        }
        assert_eq!(fsm.move_speed(), MAX_MOVE_SPEED);
    }

    #[test]
    fn fast_run_is_unreachable_through_signals() {
        let mut fsm = LocomotionStateMachine::new();
        for _ in 0..10 {
            fsm.move_fast();
            assert_ne!(fsm.update(), FastRun);
        }
        assert_eq!(fsm.state(), NarutoRun);
    }

    #[test]
    fn fast_run_transitions_exist_in_the_table() {
        assert_eq!(NarutoRun.next(3, false), FastRun);
        assert_eq!(FastRun.next(2, false), NarutoRun);
        assert_eq!(FastRun.next(3, false), FastRun);
    }

    #[test]
    fn dance_overrides_speed_and_exits_to_idle() {
        let mut fsm = LocomotionStateMachine::new();
        fsm.move_fast();
        fsm.set_dancing(true);
        assert_eq!(fsm.update(), Dance);
        fsm.toggle_dance();
        assert_eq!(fsm.update(), Idle);
        assert_eq!(fsm.update(), SlowRun);
        for state in LocomotionState::ALL {
            assert_eq!(state.next(1, true), Dance);
        }
    }
}
