use opendpad::dpad::{
    plan_transitions, DPad, Direction, DpadButtonId, DpadMode, VirtualButton,
};
use proptest::prelude::*;
use tokio::time::Instant;

fn any_direction() -> impl Strategy<Value = Direction> {
    (0u8..16).prop_map(Direction::from_raw)
}

fn any_mode() -> impl Strategy<Value = DpadMode> {
    prop::sample::select(DpadMode::ALL.to_vec())
}

fn active_buttons(pad: &DPad) -> Vec<DpadButtonId> {
    DpadButtonId::ALL
        .into_iter()
        .filter(|id| pad.button(*id).is_active())
        .collect()
}

proptest! {
    #[test]
    fn same_direction_never_moves_a_button(
        mode in any_mode(),
        direction in any_direction(),
        lock in prop::option::of(prop::sample::select(DpadButtonId::DIAGONALS.to_vec())),
    ) {
        let plan = plan_transitions(mode, direction, direction, lock);
        prop_assert!(plan.is_empty());
        prop_assert_eq!(plan.diagonal_lock, lock);
    }

    #[test]
    fn lock_follows_committed_diagonal(
        mode in any_mode(),
        samples in prop::collection::vec(any_direction(), 1..40),
    ) {
        let mut pad: DPad = DPad::new(0, 0);
        pad.set_mode(mode);
        let now = Instant::now();

        for sample in samples {
            pad.inject_direction(sample, false, now);

            let committed = pad.committed_direction();
            prop_assert_eq!(committed, sample);
            prop_assert_eq!(
                pad.active_diagonal().is_some(),
                committed.is_diagonal() && mode.uses_diagonal_lock()
            );

            let active = active_buttons(&pad);
            if mode == DpadMode::Standard {
                prop_assert_eq!(active, committed.cardinals().collect::<Vec<_>>());
            } else {
                prop_assert!(active.len() <= 1, "{:?} left {:?} active", mode, active);
                prop_assert!(active.iter().all(|id| mode.applicable_buttons().contains(id)));
            }
        }
    }

    #[test]
    fn every_commit_releases_before_it_activates(
        mode in any_mode(),
        from in any_direction(),
        to in any_direction(),
    ) {
        let transitions = plan_transitions(mode, from, to, None).transitions();
        let first_activation = transitions.iter().position(|t| t.active);
        let last_release = transitions.iter().rposition(|t| !t.active);

        if let (Some(activation), Some(release)) = (first_activation, last_release) {
            prop_assert!(release < activation);
        }
    }
}

#[test]
fn unknown_bits_own_no_button_outside_standard() {
    let up_down = Direction::UP | Direction::DOWN;

    for mode in [DpadMode::EightWay, DpadMode::FourWayCardinal, DpadMode::FourWayDiagonal] {
        let plan = plan_transitions(mode, Direction::CENTERED, up_down, None);
        assert!(plan.is_empty(), "{} produced {:?}", mode, plan);
    }

    let plan = plan_transitions(DpadMode::Standard, Direction::CENTERED, up_down, None);
    assert_eq!(plan.activations, vec![DpadButtonId::Up, DpadButtonId::Down]);
}

#[test]
fn lock_from_previous_mode_is_released_first() {
    let plan = plan_transitions(
        DpadMode::Standard,
        Direction::UP_LEFT,
        Direction::DOWN,
        Some(DpadButtonId::UpLeft),
    );

    assert_eq!(plan.releases, vec![DpadButtonId::UpLeft]);
    assert_eq!(plan.activations, vec![DpadButtonId::Down]);
    assert_eq!(plan.diagonal_lock, None);
}
