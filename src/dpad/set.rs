//! A configuration set: the pads of one device that are active together.

use crate::dpad::button::{DPadButton, VirtualButton};
use crate::dpad::dpad::DPad;
use crate::dpad::transition::ButtonTransition;
use crate::dpad::DpadEvent;
use crate::persistence::SetConfig;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Transitions applied to one pad of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PadTransitions {
    pub dpad: usize,
    pub transitions: Vec<ButtonTransition>,
}

#[derive(Debug, Clone)]
pub struct DpadSet<B: VirtualButton = DPadButton> {
    index: usize,
    dpads: Vec<DPad<B>>,
}

impl<B: VirtualButton> DpadSet<B> {
    pub fn new(index: usize, dpad_count: usize) -> Self {
        Self {
            index,
            dpads: (0..dpad_count).map(|dpad| DPad::new(dpad, index)).collect(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.dpads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dpads.is_empty()
    }

    pub fn dpad(&self, index: usize) -> Option<&DPad<B>> {
        self.dpads.get(index)
    }

    pub fn dpad_mut(&mut self, index: usize) -> Option<&mut DPad<B>> {
        self.dpads.get_mut(index)
    }

    pub fn dpads(&self) -> impl Iterator<Item = &DPad<B>> {
        self.dpads.iter()
    }

    pub fn is_default(&self) -> bool {
        self.dpads.iter().all(DPad::is_default)
    }

    fn gather(
        &mut self,
        mut step: impl FnMut(&mut DPad<B>) -> Vec<ButtonTransition>,
    ) -> Vec<PadTransitions> {
        self.dpads
            .iter_mut()
            .filter_map(|dpad| {
                let transitions = step(dpad);
                (!transitions.is_empty()).then(|| PadTransitions {
                    dpad: dpad.index(),
                    transitions,
                })
            })
            .collect()
    }

    /// Applies every staged sample, pads in index order.
    pub fn flush_queued(&mut self, now: Instant) -> Vec<PadTransitions> {
        self.gather(|dpad| dpad.flush_queued(now))
    }

    pub fn clear_queued(&mut self) {
        for dpad in &mut self.dpads {
            dpad.clear_queued();
        }
    }

    pub fn poll_timers(&mut self, now: Instant) -> Vec<PadTransitions> {
        self.gather(|dpad| dpad.poll_timer(now))
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.dpads.iter().filter_map(DPad::next_deadline).min()
    }

    pub fn release_all(&mut self) -> Vec<PadTransitions> {
        debug!("Releasing all pads of set {}", self.index);
        self.gather(DPad::force_release_all)
    }

    pub fn take_events(&mut self) -> Vec<(usize, DpadEvent)> {
        self.dpads
            .iter_mut()
            .flat_map(|dpad| {
                let index = dpad.index();
                dpad.take_events().into_iter().map(move |event| (index, event))
            })
            .collect()
    }

    /// Duplicates this set's configuration into `dest` pad by pad.
    pub fn copy_configuration(&self, dest: &mut DpadSet<B>) {
        for (source, target) in self.dpads.iter().zip(dest.dpads.iter_mut()) {
            source.copy_configuration(target);
        }
    }

    pub fn copy_transient_physics(&mut self, source: &DpadSet<B>) {
        for (target, held) in self.dpads.iter_mut().zip(source.dpads.iter()) {
            target.copy_transient_physics(held);
        }
    }

    pub fn read_config(&mut self, config: &SetConfig) {
        for dpad_config in &config.dpads {
            let slot = dpad_config.index.checked_sub(1);
            match slot.and_then(|slot| self.dpads.get_mut(slot)) {
                Some(dpad) => dpad.read_config(dpad_config),
                None => warn!(
                    "Set {}: skipping dpad block with unknown index {}",
                    self.index + 1,
                    dpad_config.index
                ),
            }
        }
    }

    /// `None` when every pad is default.
    pub fn write_config(&self) -> Option<SetConfig> {
        let dpads: Vec<_> = self.dpads.iter().filter_map(DPad::write_config).collect();
        (!dpads.is_empty()).then(|| SetConfig {
            index: self.index + 1,
            dpads,
        })
    }
}
