use crate::dpad::Direction;
use chrono::{DateTime, Local};
use gilrs::{Button, Event, EventType, GamepadId, Gilrs};
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

// Raw controller event with chrono timestamps
#[derive(Debug, Clone, PartialEq)]
pub enum RawControllerEvent {
    /// Held hat buttons of one gamepad changed
    Direction {
        dpad: usize,
        direction: Direction,
        timestamp: DateTime<Local>,
    },
    /// Every change of the current poll has been reported
    FrameEnd { timestamp: DateTime<Local> },
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct CollectorSettings {
    /// Pause between polls of the gamepad queue
    pub poll_interval_ms: u64,
    /// Gamepads beyond this count are ignored
    pub max_dpads: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 4,
            max_dpads: 4,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    #[error("Failed to initialize collector: {0}")]
    InitializationError(String),

    #[error("Failed to send event: {0}")]
    EventSendError(String),

    #[error("Collector task failed: {0}")]
    ThreadError(String),
}

/// Hat buttons currently held on one gamepad
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HatState {
    held: Direction,
}

impl HatState {
    /// Records a press or release. Returns true if the direction changed.
    pub fn apply(&mut self, button: Button, pressed: bool) -> bool {
        let Some(bit) = hat_bit(button) else {
            return false;
        };

        let before = self.held;
        self.held.set(bit, pressed);
        before != self.held
    }

    /// Drops everything, e.g. after a disconnect. Returns true if anything was held.
    pub fn clear(&mut self) -> bool {
        let was_held = !self.held.is_centered();
        self.held = Direction::CENTERED;
        was_held
    }

    pub fn direction(&self) -> Direction {
        self.held
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum CollectionState {
    Initializing,
    Collecting,
}

#[machine]
#[derive(Debug)]
pub struct EventCollector<S: CollectionState> {
    gilrs: Gilrs,

    settings: CollectorSettings,

    event_sender: mpsc::Sender<RawControllerEvent>,

    // Gamepad to pad index, in connection order
    assignments: HashMap<GamepadId, usize>,

    hats: Vec<HatState>,
}

impl<S: CollectionState> EventCollector<S> {
    pub fn settings(&self) -> &CollectorSettings {
        &self.settings
    }
}

impl EventCollector<Initializing> {
    pub fn create(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<RawControllerEvent>,
    ) -> Result<Self, CollectorError> {
        let settings = settings.unwrap_or_default();
        debug!("Creating Event Collector with settings: {:?}", settings);

        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(CollectorError::InitializationError(e.to_string()));
            }
        };

        let hats = vec![HatState::default(); settings.max_dpads];
        Ok(Self::new(gilrs, settings, event_sender, HashMap::new(), hats))
    }

    /// Assigns pads to the gamepads already connected and starts collecting
    pub fn initialize(mut self) -> EventCollector<Collecting> {
        let connected: Vec<_> = self
            .gilrs
            .gamepads()
            .map(|(id, gamepad)| (id, gamepad.name().to_string()))
            .collect();

        if connected.is_empty() {
            warn!("No gamepad connected, waiting for one");
        } else {
            info!("Found {} gamepads:", connected.len());
            for (id, name) in connected {
                if let Some(dpad) = self.assign(id) {
                    info!("  ID: {}, Name: {} -> dpad {}", id, name, dpad + 1);
                }
            }
        }

        info!("Event Collector initialized, transitioning to Collecting state");
        self.transition()
    }
}

impl<S: CollectionState> EventCollector<S> {
    fn assign(&mut self, id: GamepadId) -> Option<usize> {
        if let Some(dpad) = self.assignments.get(&id) {
            return Some(*dpad);
        }

        let taken: Vec<usize> = self.assignments.values().copied().collect();
        let free = (0..self.settings.max_dpads).find(|dpad| !taken.contains(dpad));
        match free {
            Some(dpad) => {
                self.assignments.insert(id, dpad);
                Some(dpad)
            }
            None => {
                warn!("No free dpad for gamepad {}, ignoring it", id);
                None
            }
        }
    }
}

impl EventCollector<Collecting> {
    /// Drains the gilrs queue and reports every changed pad, then a frame end.
    ///
    /// Returns the number of direction changes reported.
    pub fn poll_frame(&mut self) -> Result<usize, CollectorError> {
        let mut changed: Vec<usize> = Vec::new();

        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            let Some(dpad) = self.handle_gilrs_event(id, event) else {
                continue;
            };
            if !changed.contains(&dpad) {
                changed.push(dpad);
            }
        }

        if changed.is_empty() {
            return Ok(0);
        }

        changed.sort_unstable();
        let timestamp = Local::now();
        for dpad in &changed {
            let direction = self.hats[*dpad].direction();
            debug!(
                "DPad {} direction {} at {}",
                dpad + 1,
                direction,
                timestamp.format("%H:%M:%S.%3f")
            );
            self.send(RawControllerEvent::Direction {
                dpad: *dpad,
                direction,
                timestamp,
            })?;
        }
        self.send(RawControllerEvent::FrameEnd { timestamp })?;

        Ok(changed.len())
    }

    /// Polls until the receiving side goes away
    pub fn run_collection_loop(&mut self) -> Result<(), CollectorError> {
        info!("Starting Event Collector loop");

        let interval = std::time::Duration::from_millis(self.settings.poll_interval_ms);
        let mut change_count = 0;
        let mut last_log_time = Local::now();
        let log_interval = chrono::Duration::seconds(10);

        while !self.event_sender.is_closed() {
            match self.poll_frame() {
                Ok(changes) => change_count += changes,
                Err(CollectorError::EventSendError(e)) => {
                    info!("Event receiver gone, stopping collector: {}", e);
                    break;
                }
                Err(e) => error!("Error collecting events: {}", e),
            }

            let now = Local::now();
            if now - last_log_time > log_interval {
                debug!(
                    "Event Collector stats: {} direction changes in last {} seconds",
                    change_count,
                    log_interval.num_seconds()
                );
                change_count = 0;
                last_log_time = now;
            }

            std::thread::sleep(interval);
        }

        Ok(())
    }

    // Returns the pad whose direction changed
    fn handle_gilrs_event(&mut self, id: GamepadId, event: EventType) -> Option<usize> {
        match event {
            EventType::Connected => {
                if let Some(dpad) = self.assign(id) {
                    info!("Gamepad {} connected as dpad {}", id, dpad + 1);
                }
                None
            }
            EventType::Disconnected => {
                let dpad = self.assignments.remove(&id)?;
                warn!("Gamepad {} disconnected, centering dpad {}", id, dpad + 1);
                self.hats[dpad].clear().then_some(dpad)
            }
            EventType::ButtonPressed(button, _) => self.update_hat(id, button, true),
            EventType::ButtonReleased(button, _) => self.update_hat(id, button, false),
            _ => None,
        }
    }

    fn update_hat(&mut self, id: GamepadId, button: Button, pressed: bool) -> Option<usize> {
        hat_bit(button)?;
        let dpad = self.assign(id)?;
        self.hats[dpad].apply(button, pressed).then_some(dpad)
    }

    fn send(&self, event: RawControllerEvent) -> Result<(), CollectorError> {
        self.event_sender
            .blocking_send(event)
            .map_err(|e| CollectorError::EventSendError(e.to_string()))
    }
}

/// Handle for the collector running on a blocking thread
pub struct CollectorHandle {
    task_handle: tokio::task::JoinHandle<Result<(), CollectorError>>,
}

impl CollectorHandle {
    /// Spawns the collector. gilrs is created on the blocking thread itself.
    pub fn spawn(
        settings: Option<CollectorSettings>,
        event_sender: mpsc::Sender<RawControllerEvent>,
    ) -> Self {
        info!("Spawning Event Collector with settings: {:?}", settings);

        let task_handle = tokio::task::spawn_blocking(move || {
            let collector = EventCollector::create(settings, event_sender)?;
            let mut collecting = collector.initialize();
            let result = collecting.run_collection_loop();
            match &result {
                Ok(()) => info!("Event Collector task finished"),
                Err(e) => error!("Collector task terminated with error: {}", e),
            }
            result
        });

        Self { task_handle }
    }

    /// Waits for the collector to stop. It stops once the receiver is dropped.
    pub async fn join(self) -> Result<(), CollectorError> {
        self.task_handle
            .await
            .map_err(|e| CollectorError::ThreadError(e.to_string()))?
    }
}

fn hat_bit(button: Button) -> Option<Direction> {
    match button {
        Button::DPadUp => Some(Direction::UP),
        Button::DPadRight => Some(Direction::RIGHT),
        Button::DPadDown => Some(Direction::DOWN),
        Button::DPadLeft => Some(Direction::LEFT),
        _ => None,
    }
}
