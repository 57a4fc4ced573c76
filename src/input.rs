use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

// ---------------------------------------------
// CONTROL KEYS
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKey {
    Forward,
    Backward,
    Left,
    Right,
    Brake,
    Handbrake,
}

impl ControlKey {
    pub const ALL: [ControlKey; 6] = [
        ControlKey::Forward,
        ControlKey::Backward,
        ControlKey::Left,
        ControlKey::Right,
        ControlKey::Brake,
        ControlKey::Handbrake,
    ];

    /// Maps a browser key identifier; untracked keys give None.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "ArrowUp" => Some(ControlKey::Forward),
            "ArrowDown" => Some(ControlKey::Backward),
            "ArrowLeft" => Some(ControlKey::Left),
            "ArrowRight" => Some(ControlKey::Right),
            "b" => Some(ControlKey::Brake),
            " " => Some(ControlKey::Handbrake),
            _ => None,
        }
    }

    pub fn key_name(self) -> &'static str {
        match self {
            ControlKey::Forward => "ArrowUp",
            ControlKey::Backward => "ArrowDown",
            ControlKey::Left => "ArrowLeft",
            ControlKey::Right => "ArrowRight",
            ControlKey::Brake => "b",
            ControlKey::Handbrake => " ",
        }
    }
}

// ---------------------------------------------
// EVENTS
// ---------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTransition {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PointerEvent {
    ButtonDown,
    ButtonUp,
    Move { dx: f32, dy: f32 },
    Click,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputEvent {
    Key { key: String, transition: KeyTransition },
    Pointer(PointerEvent),
}

impl InputEvent {
    pub fn key_down(key: &str) -> Self {
        InputEvent::Key { key: key.to_string(), transition: KeyTransition::Pressed }
    }

    pub fn key_up(key: &str) -> Self {
        InputEvent::Key { key: key.to_string(), transition: KeyTransition::Released }
    }
}

/// Outcome of a tracked key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyChange {
    Pressed(ControlKey),
    /// The caller runs the immediate release action for this key.
    Released(ControlKey),
}

// ---------------------------------------------
// HELD-KEYS SET
// ---------------------------------------------
#[derive(Debug, Default)]
pub struct InputTracker {
    held: BTreeSet<ControlKey>,
}

impl InputTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: &str, transition: KeyTransition) -> Option<KeyChange> {
        let control = ControlKey::from_key(key)?;

        match transition {
            KeyTransition::Pressed => self.held.insert(control).then_some(KeyChange::Pressed(control)),
            KeyTransition::Released => {
                self.held.remove(&control);
                Some(KeyChange::Released(control))
            }
        }
    }

    pub fn held(&self) -> &BTreeSet<ControlKey> {
        &self.held
    }

    pub fn is_held(&self, key: ControlKey) -> bool {
        self.held.contains(&key)
    }
}

// ---------------------------------------------
// EVENT SOURCE
// ---------------------------------------------

/// Producer side, handed to whatever owns the real event stream.
#[derive(Debug, Clone)]
pub struct InputSender {
    tx: UnboundedSender<InputEvent>,
}

impl InputSender {
    /// False once the simulation side is gone.
    pub fn send(&self, event: InputEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn key_down(&self, key: &str) -> bool {
        self.send(InputEvent::key_down(key))
    }

    pub fn key_up(&self, key: &str) -> bool {
        self.send(InputEvent::key_up(key))
    }

    pub fn pointer(&self, event: PointerEvent) -> bool {
        self.send(InputEvent::Pointer(event))
    }
}

#[derive(Debug)]
pub struct InputSource {
    rx: UnboundedReceiver<InputEvent>,
}

impl InputSource {
    /// Everything queued so far, in arrival order. Never blocks.
    pub fn drain(&mut self) -> Vec<InputEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }
}

pub fn channel() -> (InputSender, InputSource) {
    let (tx, rx) = mpsc::unbounded_channel();
    (InputSender { tx }, InputSource { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn untracked_keys_are_ignored() {
        let mut tracker = InputTracker::new();
        assert_eq!(tracker.handle_key("w", KeyTransition::Pressed), None);
        assert_eq!(tracker.handle_key("Shift", KeyTransition::Released), None);
        assert!(tracker.held().is_empty());
    }

    #[test]
    fn repeated_key_down_is_inserted_once() {
        let mut tracker = InputTracker::new();
        assert_eq!(tracker.handle_key("ArrowUp", KeyTransition::Pressed), Some(KeyChange::Pressed(ControlKey::Forward)));
        assert_eq!(tracker.handle_key("ArrowUp", KeyTransition::Pressed), None);
        assert_eq!(tracker.held().len(), 1);
    }

    #[test]
    fn release_always_reports_the_release_action() {
        let mut tracker = InputTracker::new();
        assert_eq!(
            tracker.handle_key(" ", KeyTransition::Released),
            Some(KeyChange::Released(ControlKey::Handbrake))
        );
    }

    #[test]
    fn released_keys_never_stay_held() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut tracker = InputTracker::new();

        for _ in 0..2_000 {
            let key = ControlKey::ALL[rng.gen_range(0..ControlKey::ALL.len())];
            let transition = if rng.gen_bool(0.5) { KeyTransition::Pressed } else { KeyTransition::Released };

            tracker.handle_key(key.key_name(), transition);

            match transition {
                KeyTransition::Pressed => assert!(tracker.is_held(key)),
                KeyTransition::Released => assert!(!tracker.is_held(key)),
            }
        }
    }

    #[test]
    fn key_names_round_trip() {
        for key in ControlKey::ALL {
            assert_eq!(ControlKey::from_key(key.key_name()), Some(key));
        }
    }

    #[test]
    fn drain_returns_events_in_order() {
        let (tx, mut source) = channel();
        tx.key_down("ArrowLeft");
        tx.pointer(PointerEvent::Move { dx: 3.0, dy: -1.0 });
        tx.key_up("ArrowLeft");

        let events = source.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0], InputEvent::key_down("ArrowLeft"));
        assert_eq!(events[2], InputEvent::key_up("ArrowLeft"));
        assert!(source.drain().is_empty());
    }

    #[test]
    fn sender_notices_a_dropped_source() {
        let (tx, source) = channel();
        drop(source);
        assert!(!tx.key_down("b"));
    }
}
