use opendpad::dpad::{ButtonSlot, ButtonTransition, Direction, DpadButtonId, DpadEvent, DpadMode};
use opendpad::engine::{DpadEngineHandle, EngineCommand, EngineOutput, EngineSettings};
use opendpad::persistence::{ButtonConfig, DpadConfig, ProfileConfig, SetConfig};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

const SETTINGS: EngineSettings = EngineSettings {
    set_count: 3,
    dpad_count: 2,
    channel_capacity: 64,
};

fn start(
    profile: &ProfileConfig,
) -> (
    DpadEngineHandle,
    mpsc::Receiver<EngineOutput>,
    mpsc::Sender<EngineCommand>,
) {
    let mut handle = DpadEngineHandle::new("test".to_string());
    let (outputs, commands) = handle.start(profile, SETTINGS).unwrap();
    (handle, outputs, commands)
}

async fn next_button(outputs: &mut mpsc::Receiver<EngineOutput>) -> (usize, usize, ButtonTransition) {
    loop {
        match outputs.recv().await.expect("engine output closed") {
            EngineOutput::Button {
                set,
                dpad,
                transition,
                ..
            } => return (set, dpad, transition),
            EngineOutput::Notification { .. } => continue,
        }
    }
}

/// Round-trips a snapshot so every earlier command has been handled.
async fn barrier(commands: &mpsc::Sender<EngineCommand>) -> ProfileConfig {
    let (response_tx, response_rx) = oneshot::channel();
    commands
        .send(EngineCommand::Snapshot { response_tx })
        .await
        .unwrap();
    response_rx.await.unwrap()
}

fn drain(outputs: &mut mpsc::Receiver<EngineOutput>) -> Vec<EngineOutput> {
    let mut drained = Vec::new();
    while let Ok(output) = outputs.try_recv() {
        drained.push(output);
    }
    drained
}

fn direction(dpad: usize, direction: Direction) -> EngineCommand {
    EngineCommand::Direction {
        dpad,
        direction,
        bypass_delay: false,
    }
}

#[tokio::test(start_paused = true)]
async fn deferred_commit_fires_from_the_loop() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());
    let started = Instant::now();

    commands
        .send(EngineCommand::SetDelay {
            dpad: 0,
            delay_ms: 50,
        })
        .await
        .unwrap();
    for sample in [Direction::UP, Direction::DOWN, Direction::UP] {
        commands.send(direction(0, sample)).await.unwrap();
    }

    let (set, dpad, transition) = next_button(&mut outputs).await;
    assert_eq!((set, dpad), (0, 0));
    assert_eq!(transition, ButtonTransition::activate(DpadButtonId::Up));
    assert!(started.elapsed() >= Duration::from_millis(50));

    barrier(&commands).await;
    assert!(drain(&mut outputs)
        .iter()
        .all(|output| matches!(output, EngineOutput::Notification { .. })));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn nothing_commits_before_the_deadline() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands
        .send(EngineCommand::SetDelay {
            dpad: 1,
            delay_ms: 100,
        })
        .await
        .unwrap();
    commands.send(direction(1, Direction::LEFT)).await.unwrap();

    let early = tokio::time::timeout(Duration::from_millis(60), next_button(&mut outputs)).await;
    assert!(early.is_err());

    let (_, dpad, transition) = next_button(&mut outputs).await;
    assert_eq!(dpad, 1);
    assert_eq!(transition, ButtonTransition::activate(DpadButtonId::Left));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn configuration_changes_are_notified() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands
        .send(EngineCommand::SetMode {
            dpad: 0,
            mode: DpadMode::EightWay,
        })
        .await
        .unwrap();
    commands
        .send(EngineCommand::SetDelay {
            dpad: 0,
            delay_ms: 5,
        })
        .await
        .unwrap();
    barrier(&commands).await;

    assert_eq!(
        drain(&mut outputs),
        vec![
            EngineOutput::Notification {
                set: 0,
                dpad: 0,
                event: DpadEvent::ModeChanged(DpadMode::EightWay),
            },
            EngineOutput::Notification {
                set: 0,
                dpad: 0,
                event: DpadEvent::ConfigChanged,
            },
        ]
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn switching_sets_hands_over_held_directions() {
    let profile = ProfileConfig {
        name: None,
        sets: vec![SetConfig {
            index: 2,
            dpads: vec![DpadConfig {
                index: 1,
                buttons: vec![ButtonConfig {
                    index: DpadButtonId::Up.value(),
                    slots: vec![ButtonSlot::key(103)],
                    mouse: None,
                }],
                ..Default::default()
            }],
        }],
    };
    let (mut handle, mut outputs, commands) = start(&profile);

    commands
        .send(EngineCommand::Direction {
            dpad: 0,
            direction: Direction::UP,
            bypass_delay: true,
        })
        .await
        .unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::activate(DpadButtonId::Up))
    );

    commands.send(EngineCommand::SwitchSet(1)).await.unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::release(DpadButtonId::Up))
    );

    let handed_over = loop {
        if let EngineOutput::Button {
            set,
            transition,
            slots,
            ..
        } = outputs.recv().await.unwrap()
        {
            break (set, transition, slots);
        }
    };
    assert_eq!(
        handed_over,
        (
            1,
            ButtonTransition::activate(DpadButtonId::Up),
            vec![ButtonSlot::key(103)]
        )
    );

    handle.shutdown().await.unwrap();
}

fn held(dpad: usize, direction: Direction) -> EngineCommand {
    EngineCommand::Direction {
        dpad,
        direction,
        bypass_delay: true,
    }
}

#[tokio::test(start_paused = true)]
async fn copying_onto_the_live_set_keeps_buttons_releasable() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands.send(held(0, Direction::UP)).await.unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::activate(DpadButtonId::Up))
    );

    commands
        .send(EngineCommand::CopySet { from: 1, to: 0 })
        .await
        .unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::release(DpadButtonId::Up))
    );
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::activate(DpadButtonId::Up))
    );

    commands.send(held(0, Direction::CENTERED)).await.unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::release(DpadButtonId::Up))
    );

    barrier(&commands).await;
    assert!(drain(&mut outputs)
        .iter()
        .all(|output| matches!(output, EngineOutput::Notification { .. })));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn switching_into_a_copied_set_presses_the_held_direction() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands.send(held(0, Direction::UP)).await.unwrap();
    commands
        .send(EngineCommand::CopySet { from: 0, to: 1 })
        .await
        .unwrap();
    commands.send(EngineCommand::SwitchSet(1)).await.unwrap();

    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::activate(DpadButtonId::Up))
    );
    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::release(DpadButtonId::Up))
    );
    assert_eq!(
        next_button(&mut outputs).await,
        (1, 0, ButtonTransition::activate(DpadButtonId::Up))
    );

    commands.send(held(0, Direction::CENTERED)).await.unwrap();
    assert_eq!(
        next_button(&mut outputs).await,
        (1, 0, ButtonTransition::release(DpadButtonId::Up))
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn switching_sets_commits_a_pending_direction_at_once() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());
    let started = Instant::now();

    commands
        .send(EngineCommand::SetDelay {
            dpad: 0,
            delay_ms: 100,
        })
        .await
        .unwrap();
    commands.send(direction(0, Direction::LEFT)).await.unwrap();
    commands.send(EngineCommand::SwitchSet(1)).await.unwrap();

    assert_eq!(
        next_button(&mut outputs).await,
        (1, 0, ButtonTransition::activate(DpadButtonId::Left))
    );
    assert!(started.elapsed() < Duration::from_millis(100));

    // The cancelled countdown on the old set never fires
    tokio::time::sleep(Duration::from_millis(200)).await;
    barrier(&commands).await;
    assert!(drain(&mut outputs)
        .iter()
        .all(|output| matches!(output, EngineOutput::Notification { .. })));

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn copied_sets_show_up_in_the_snapshot() {
    let (mut handle, _outputs, commands) = start(&ProfileConfig::default());

    commands
        .send(EngineCommand::SetMode {
            dpad: 1,
            mode: DpadMode::FourWayCardinal,
        })
        .await
        .unwrap();
    commands
        .send(EngineCommand::SetDelay {
            dpad: 1,
            delay_ms: 100,
        })
        .await
        .unwrap();
    commands
        .send(EngineCommand::CopySet { from: 0, to: 2 })
        .await
        .unwrap();

    let snapshot = barrier(&commands).await;
    let indices: Vec<_> = snapshot.sets.iter().map(|set| set.index).collect();
    assert_eq!(indices, vec![1, 3]);

    for set in &snapshot.sets {
        assert_eq!(set.dpads.len(), 1);
        assert_eq!(set.dpads[0].index, 2);
        assert_eq!(set.dpads[0].mode.as_deref(), Some("four-way"));
        assert_eq!(set.dpads[0].delay_ms(), Some(100));
    }

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn bad_indices_do_not_stop_the_engine() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands.send(direction(9, Direction::UP)).await.unwrap();
    commands.send(EngineCommand::SwitchSet(7)).await.unwrap();
    commands
        .send(EngineCommand::CopySet { from: 1, to: 1 })
        .await
        .unwrap();
    commands.send(direction(0, Direction::DOWN)).await.unwrap();

    assert_eq!(
        next_button(&mut outputs).await,
        (0, 0, ButtonTransition::activate(DpadButtonId::Down))
    );

    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_held_buttons() {
    let (mut handle, mut outputs, commands) = start(&ProfileConfig::default());

    commands.send(direction(1, Direction::DOWN_RIGHT)).await.unwrap();
    next_button(&mut outputs).await;
    next_button(&mut outputs).await;

    handle.shutdown().await.unwrap();

    let mut released: Vec<_> = drain(&mut outputs)
        .into_iter()
        .filter_map(|output| match output {
            EngineOutput::Button { transition, .. } => Some(transition),
            EngineOutput::Notification { .. } => None,
        })
        .collect();
    released.sort_by_key(|transition| transition.button);

    assert_eq!(
        released,
        vec![
            ButtonTransition::release(DpadButtonId::Down),
            ButtonTransition::release(DpadButtonId::Right),
        ]
    );
}
