//! Controller subsystem for gamepad hat input
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► EventCollector ──► RawControllerEvent ──► forward_to_engine ──► EngineCommand
//!             (blocking thread)   (Direction / FrameEnd)                      (QueueDirection / FlushQueued)
//! ```
//!
//! Each poll stages the direction of every changed pad and ends with a
//! frame marker, so all pads of one poll are committed together.

pub mod event_collector;

pub use event_collector::{
    CollectorError, CollectorHandle, CollectorSettings, HatState, RawControllerEvent,
};

use crate::engine::EngineCommand;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Translates collector events into engine commands until either side closes.
///
/// Returns the number of frames forwarded.
pub async fn forward_to_engine(
    mut events: mpsc::Receiver<RawControllerEvent>,
    commands: mpsc::Sender<EngineCommand>,
) -> usize {
    let mut frames = 0;

    while let Some(event) = events.recv().await {
        let command = match event {
            RawControllerEvent::Direction {
                dpad, direction, ..
            } => EngineCommand::QueueDirection {
                dpad,
                direction,
                bypass_delay: false,
            },
            RawControllerEvent::FrameEnd { .. } => {
                frames += 1;
                EngineCommand::FlushQueued
            }
        };

        if commands.send(command).await.is_err() {
            info!("Engine command channel closed, stopping forwarder");
            break;
        }
    }

    debug!("Forwarded {} frames", frames);
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dpad::Direction;
    use chrono::Local;

    #[tokio::test]
    async fn frames_become_queue_then_flush() {
        let (event_tx, event_rx) = mpsc::channel(8);
        let (command_tx, mut command_rx) = mpsc::channel(8);

        let timestamp = Local::now();
        event_tx
            .send(RawControllerEvent::Direction {
                dpad: 1,
                direction: Direction::UP_LEFT,
                timestamp,
            })
            .await
            .unwrap();
        event_tx
            .send(RawControllerEvent::FrameEnd { timestamp })
            .await
            .unwrap();
        drop(event_tx);

        assert_eq!(forward_to_engine(event_rx, command_tx).await, 1);

        assert!(matches!(
            command_rx.recv().await,
            Some(EngineCommand::QueueDirection {
                dpad: 1,
                direction,
                bypass_delay: false,
            }) if direction == Direction::UP_LEFT
        ));
        assert!(matches!(command_rx.recv().await, Some(EngineCommand::FlushQueued)));
        assert!(command_rx.recv().await.is_none());
    }
}
