//! Pointer events replayed onto the UI thread.

use crate::clock::Clock;

/// Pointer action. Raw codes follow the common touch convention
/// (0 down, 1 up, 2 move, 3 cancel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    Down,
    Up,
    Move,
    Cancel,
}

impl InputAction {
    pub fn from_raw(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Down),
            1 => Some(Self::Up),
            2 => Some(Self::Move),
            3 => Some(Self::Cancel),
            _ => None,
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::Down => 0,
            Self::Up => 1,
            Self::Move => 2,
            Self::Cancel => 3,
        }
    }
}

/// A pointer event ready to be delivered to a widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInput {
    pub action: InputAction,
    pub x: i32,
    pub y: i32,
    /// Time of the press that started the gesture, in uptime milliseconds.
    pub press_time: u64,
    /// Time of this event, in uptime milliseconds.
    pub event_time: u64,
}

/// Tracks the press time of the current gesture.
#[derive(Debug, Default)]
pub struct GestureTracker {
    press_time: Option<u64>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp an event. A press (or the first event ever seen) starts a new
    /// gesture; everything else reuses the current press time.
    pub fn stamp(&mut self, action: InputAction, x: i32, y: i32, clock: &dyn Clock) -> PendingInput {
        let now = clock.uptime_millis();
        let press_time = match (action, self.press_time) {
            (InputAction::Down, _) | (_, None) => {
                self.press_time = Some(now);
                now
            }
            (_, Some(press_time)) => press_time,
        };
        PendingInput {
            action,
            x,
            y,
            press_time,
            event_time: now,
        }
    }

    pub fn press_time(&self) -> Option<u64> {
        self.press_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn move_reuses_press_time() {
        let clock = ManualClock::new(0);
        let mut tracker = GestureTracker::new();

        let a = tracker.stamp(InputAction::Down, 10, 10, &clock);
        clock.set(5);
        let b = tracker.stamp(InputAction::Move, 12, 11, &clock);

        assert_eq!((a.press_time, a.event_time), (0, 0));
        assert_eq!((b.press_time, b.event_time), (0, 5));
        assert_eq!((b.x, b.y), (12, 11));
    }

    #[test]
    fn first_event_without_press_starts_gesture() {
        let clock = ManualClock::new(40);
        let mut tracker = GestureTracker::new();
        let event = tracker.stamp(InputAction::Move, 1, 1, &clock);
        assert_eq!(event.press_time, 40);
        assert_eq!(tracker.press_time(), Some(40));
    }

    #[test]
    fn new_press_resets_gesture() {
        let clock = ManualClock::new(0);
        let mut tracker = GestureTracker::new();
        tracker.stamp(InputAction::Down, 0, 0, &clock);
        clock.set(100);
        tracker.stamp(InputAction::Up, 0, 0, &clock);
        clock.set(200);
        let press = tracker.stamp(InputAction::Down, 0, 0, &clock);
        assert_eq!(press.press_time, 200);
    }

    #[test]
    fn raw_codes_round_trip() {
        assert_eq!(InputAction::from_raw(2), Some(InputAction::Move));
        assert_eq!(InputAction::Cancel.raw(), 3);
        assert_eq!(InputAction::from_raw(9), None);
    }
}
