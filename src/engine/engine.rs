//! Pad engine with a statum lifecycle
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Configured ──► Active ──► Deactivating ──► Deactivated
//!                                   │            ▲
//!                                   └────────────┘
//!                          (shutdown signal / command channel closed)
//! ```
//!
//! Leaving `Active` always releases every held button so the output side
//! never keeps a key pressed after the engine is gone.

use crate::dpad::{DPad, Direction, DpadError, DpadSet, PadTransitions, VirtualButton};
use crate::engine::{EngineCommand, EngineOutput};
use crate::persistence::ProfileConfig;
use serde::{Deserialize, Serialize};
use statum::{machine, state};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Shape of the engine: how many sets and how many pads per set
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct EngineSettings {
    pub set_count: usize,
    pub dpad_count: usize,
    pub channel_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            set_count: 8,
            dpad_count: 4,
            channel_capacity: 256,
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum DpadEngineState {
    Initializing, // Sets allocated, nothing loaded
    Configured,   // Profile applied
    Active,       // Main loop running
    Deactivating, // Releasing held buttons
    Deactivated,  // Stopped
}

#[machine]
pub struct DpadEngine<S: DpadEngineState> {
    command_receiver: mpsc::Receiver<EngineCommand>,
    output_sender: mpsc::Sender<EngineOutput>,
    name: String,
    profile_name: Option<String>,
    sets: Vec<DpadSet>,
    active_set: usize,
}

impl<S: DpadEngineState> DpadEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn active_set(&self) -> usize {
        self.active_set
    }

    pub fn sets(&self) -> &[DpadSet] {
        &self.sets
    }

    pub fn snapshot(&self) -> ProfileConfig {
        ProfileConfig::from_sets(self.profile_name.clone(), &self.sets)
    }
}

impl DpadEngine<Initializing> {
    pub fn create(
        command_receiver: mpsc::Receiver<EngineCommand>,
        output_sender: mpsc::Sender<EngineOutput>,
        name: String,
        settings: EngineSettings,
    ) -> Result<Self, DpadError> {
        info!("Initializing new dpad engine: {}", name);

        if settings.set_count == 0 || settings.dpad_count == 0 {
            return Err(DpadError::InitializationError(format!(
                "Engine needs at least one set and one dpad, got {} sets with {} dpads",
                settings.set_count, settings.dpad_count
            )));
        }

        let sets = (0..settings.set_count)
            .map(|set| DpadSet::new(set, settings.dpad_count))
            .collect();

        Ok(Self::new(
            command_receiver,
            output_sender,
            name,
            None, // profile_name
            sets,
            0, // active_set
        ))
    }

    /// Applies a profile and transitions to Configured
    pub fn configure(mut self, profile: &ProfileConfig) -> DpadEngine<Configured> {
        info!(
            "Configuring dpad engine {} with profile {:?} ({} configured sets)",
            self.name,
            profile.name,
            profile.sets.len()
        );

        profile.apply_to(&mut self.sets);
        self.profile_name = profile.name.clone();

        // Notifications from loading are not interesting to consumers
        for set in &mut self.sets {
            let dropped = set.take_events().len();
            if dropped > 0 {
                debug!("Set {}: discarded {} load notifications", set.index() + 1, dropped);
            }
        }

        self.transition()
    }
}

impl DpadEngine<Configured> {
    pub fn activate(self) -> DpadEngine<Active> {
        info!("Activating dpad engine: {}", self.name);
        self.transition()
    }
}

impl DpadEngine<Active> {
    /// Handles a single command at `now`
    pub async fn handle_command(
        &mut self,
        command: EngineCommand,
        now: Instant,
    ) -> Result<(), DpadError> {
        debug!("Engine {} handling {:?}", self.name, command);
        let active = self.active_set;

        match command {
            EngineCommand::Direction {
                dpad,
                direction,
                bypass_delay,
            } => {
                let transitions = self
                    .active_dpad(dpad)?
                    .inject_direction(direction, bypass_delay, now);
                let pads = vec![PadTransitions { dpad, transitions }];
                self.publish_transitions(active, pads).await?;
            }
            EngineCommand::QueueDirection {
                dpad,
                direction,
                bypass_delay,
            } => {
                self.active_dpad(dpad)?
                    .queue_direction(direction, bypass_delay);
            }
            EngineCommand::FlushQueued => {
                let pads = self.sets[active].flush_queued(now);
                self.publish_transitions(active, pads).await?;
            }
            EngineCommand::SetMode { dpad, mode } => {
                self.active_dpad(dpad)?.set_mode(mode);
            }
            EngineCommand::SetDelay { dpad, delay_ms } => {
                if !self.active_dpad(dpad)?.set_delay(delay_ms) {
                    warn!("Rejected delay of {}ms for dpad {}", delay_ms, dpad + 1);
                }
            }
            EngineCommand::SetName { dpad, name } => {
                if !self.active_dpad(dpad)?.set_name(&name) {
                    debug!("Name '{}' not applied to dpad {}", name, dpad + 1);
                }
            }
            EngineCommand::SwitchSet(target) => self.switch_set(target, now).await?,
            EngineCommand::CopySet { from, to } => self.copy_set(from, to, now).await?,
            EngineCommand::ReleaseAll => {
                let pads = self.sets[active].release_all();
                self.publish_transitions(active, pads).await?;
            }
            EngineCommand::Snapshot { response_tx } => {
                if response_tx.send(self.snapshot()).is_err() {
                    warn!("Snapshot requester went away before the reply");
                }
            }
        }

        self.publish_notifications().await
    }

    /// Runs deferred commits whose deadline has passed
    pub async fn fire_timers(&mut self, now: Instant) -> Result<(), DpadError> {
        let active = self.active_set;
        let pads = self.sets[active].poll_timers(now);
        self.publish_transitions(active, pads).await?;
        self.publish_notifications().await
    }

    /// Earliest debounce deadline of the active set
    pub fn next_deadline(&self) -> Option<Instant> {
        self.sets[self.active_set].next_deadline()
    }

    /// Main loop, interleaving commands with debounce deadlines
    ///
    /// Ends on the shutdown signal or once every command sender is gone.
    /// Command errors are logged and do not stop the loop.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<DpadEngine<Deactivating>, DpadError> {
        info!("Starting event loop for: {}", self.name);

        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                command = self.command_receiver.recv() => {
                    match command {
                        Some(command) => {
                            if let Err(e) = self.handle_command(command, Instant::now()).await {
                                warn!("Command failed on {}: {}", self.name, e);
                            }
                        }
                        None => {
                            info!("Command channel closed for: {}", self.name);
                            break;
                        }
                    }
                }

                _ = sleep_until_deadline(deadline) => {
                    if let Err(e) = self.fire_timers(Instant::now()).await {
                        warn!("Deferred commit failed on {}: {}", self.name, e);
                    }
                }
            }
        }

        info!("Transitioning to Deactivating state: {}", self.name);
        Ok(self.transition())
    }

    fn active_dpad(&mut self, dpad: usize) -> Result<&mut DPad, DpadError> {
        self.sets[self.active_set]
            .dpad_mut(dpad)
            .ok_or(DpadError::UnknownDpad(dpad))
    }

    fn check_set(&self, set: usize) -> Result<(), DpadError> {
        if set < self.sets.len() {
            Ok(())
        } else {
            Err(DpadError::UnknownSet(set))
        }
    }

    /// Hands held directions over to `target`: the target set starts from
    /// centered, physics are copied while the old buttons are still pressed,
    /// the old set is released, then the held directions are re-applied on
    /// the new set without debounce.
    async fn switch_set(&mut self, target: usize, now: Instant) -> Result<(), DpadError> {
        self.check_set(target)?;
        let previous = self.active_set;
        if target == previous {
            debug!("Set {} is already active", target + 1);
            return Ok(());
        }

        info!("Switching from set {} to set {}", previous + 1, target + 1);

        let held = self.held_directions(previous);
        let (old, new) = pair_mut(&mut self.sets, previous, target);
        // A copied committed direction has no pressed button behind it
        let stale = new.release_all();
        new.copy_transient_physics(old);
        let released = old.release_all();
        self.publish_transitions(target, stale).await?;
        self.publish_transitions(previous, released).await?;

        self.active_set = target;
        self.reapply_held(target, held, now).await
    }

    /// Copies the configuration of one set onto another.
    ///
    /// Copying onto the live set releases its buttons first and re-applies
    /// whatever is held afterwards, so no button is left pressed behind a
    /// committed direction that no longer matches it.
    async fn copy_set(&mut self, from: usize, to: usize, now: Instant) -> Result<(), DpadError> {
        self.check_set(from)?;
        self.check_set(to)?;
        if from == to {
            return Err(DpadError::ConfigError(format!(
                "Cannot copy set {} onto itself",
                from + 1
            )));
        }

        info!("Copying configuration of set {} to set {}", from + 1, to + 1);

        let live = to == self.active_set;
        let held = if live {
            let held = self.held_directions(to);
            let released = self.sets[to].release_all();
            self.publish_transitions(to, released).await?;
            held
        } else {
            Vec::new()
        };

        let (source, dest) = pair_mut(&mut self.sets, from, to);
        source.copy_configuration(dest);

        if live {
            // Nothing is pressed now, this only drops the copied direction state
            self.sets[to].release_all();
            self.reapply_held(to, held, now).await?;
        }
        Ok(())
    }

    /// Non-centered raw directions of a set's pads, pending ones included
    fn held_directions(&self, set: usize) -> Vec<(usize, Direction)> {
        self.sets[set]
            .dpads()
            .map(|dpad| (dpad.index(), dpad.pending_direction()))
            .filter(|(_, direction)| !direction.is_centered())
            .collect()
    }

    async fn reapply_held(
        &mut self,
        set: usize,
        held: Vec<(usize, Direction)>,
        now: Instant,
    ) -> Result<(), DpadError> {
        let mut pads = Vec::with_capacity(held.len());
        for (dpad, direction) in held {
            if let Some(pad) = self.sets[set].dpad_mut(dpad) {
                let transitions = pad.inject_direction(direction, true, now);
                pads.push(PadTransitions { dpad, transitions });
            }
        }
        self.publish_transitions(set, pads).await
    }

    async fn publish_transitions(
        &mut self,
        set: usize,
        pads: Vec<PadTransitions>,
    ) -> Result<(), DpadError> {
        for PadTransitions { dpad, transitions } in pads {
            for transition in transitions {
                let slots = self.sets[set]
                    .dpad(dpad)
                    .map(|pad| pad.button(transition.button).slots().to_vec())
                    .unwrap_or_default();

                let output = EngineOutput::Button {
                    set,
                    dpad,
                    transition,
                    slots,
                };
                send_output(&self.output_sender, output).await?;
            }
        }
        Ok(())
    }

    async fn publish_notifications(&mut self) -> Result<(), DpadError> {
        for set in &mut self.sets {
            let index = set.index();
            for (dpad, event) in set.take_events() {
                let output = EngineOutput::Notification {
                    set: index,
                    dpad,
                    event,
                };
                send_output(&self.output_sender, output).await?;
            }
        }
        Ok(())
    }
}

impl DpadEngine<Deactivating> {
    /// Releases every held button and transitions to Deactivated
    pub async fn shutdown(mut self) -> DpadEngine<Deactivated> {
        info!("Shutting down dpad engine: {}", self.name);

        for set in &mut self.sets {
            let index = set.index();
            for PadTransitions { dpad, transitions } in set.release_all() {
                for transition in transitions {
                    let output = EngineOutput::Button {
                        set: index,
                        dpad,
                        transition,
                        slots: set
                            .dpad(dpad)
                            .map(|pad| pad.button(transition.button).slots().to_vec())
                            .unwrap_or_default(),
                    };
                    // Receiver may already be gone during shutdown
                    if let Err(e) = self.output_sender.try_send(output) {
                        debug!("Dropped release during shutdown: {}", e);
                    }
                }
            }
            set.take_events();
        }

        info!("Engine shut down successfully: {}", self.name);
        self.transition()
    }
}

impl DpadEngine<Deactivated> {}

async fn send_output(
    sender: &mpsc::Sender<EngineOutput>,
    output: EngineOutput,
) -> Result<(), DpadError> {
    sender
        .send(output)
        .await
        .map_err(|e| DpadError::ChannelError(format!("Failed to send engine output: {}", e)))
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Mutable access to two distinct sets
fn pair_mut<B: VirtualButton>(
    sets: &mut [DpadSet<B>],
    first: usize,
    second: usize,
) -> (&mut DpadSet<B>, &mut DpadSet<B>) {
    if first < second {
        let (head, tail) = sets.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = sets.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}

/// Handle for managing a dpad engine in a tokio task
#[derive(Debug)]
pub struct DpadEngineHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), DpadError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl DpadEngineHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Starts the engine in a tokio task
    ///
    /// # Returns
    ///
    /// * Output receiver for button transitions and notifications
    /// * Command sender
    pub fn start(
        &mut self,
        profile: &ProfileConfig,
        settings: EngineSettings,
    ) -> Result<(mpsc::Receiver<EngineOutput>, mpsc::Sender<EngineCommand>), DpadError> {
        let (command_sender, command_receiver) = mpsc::channel(settings.channel_capacity);
        let (output_sender, output_receiver) = mpsc::channel(settings.channel_capacity);
        let engine_name = self.name.clone();

        let engine = DpadEngine::create(
            command_receiver,
            output_sender,
            engine_name.clone(),
            settings,
        )?
        .configure(profile);

        let active_engine = engine.activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            match active_engine.run_until_shutdown(shutdown_rx).await {
                Ok(deactivating_engine) => {
                    let _ = deactivating_engine.shutdown().await;
                    Ok(())
                }
                Err(e) => {
                    error!("Error running engine: {} - {}", engine_name, e);
                    Err(e)
                }
            }
        });

        self.task_handle = Some(task_handle);

        info!(
            "Dpad engine activated: {} ({} sets x {} dpads)",
            self.name, settings.set_count, settings.dpad_count
        );
        Ok((output_receiver, command_sender))
    }

    /// Gracefully shuts down the engine and waits for the task
    pub async fn shutdown(&mut self) -> Result<(), DpadError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(DpadError::ThreadError(format!("Engine task panicked: {}", e)))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}
