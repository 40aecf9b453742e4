//! Periodic status polling with input-edge reporting.
//!
//! The controller polls every pool member and reacts to button presses on
//! the endpoints. [`StatusPoller`] does the polling and turns each snapshot
//! into [`InputEvent`]s; what to do about them is up to an [`InputHandler`],
//! which gets the same link back so it can answer with further commands.

#![allow(async_fn_in_trait)]

use std::future::Future;
use std::time::Duration;

use parklink_core::constants::{BARRIER_CLOSED_ANGLE, BARRIER_OPEN_ANGLE};
use parklink_protocol::StatusSnapshot;
use tracing::{debug, trace, warn};

use crate::link::DeviceLink;
use crate::pool::LinkPool;

/// A pressed input seen in a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// Input 1 (`btn1`) reads high.
    EntryPressed,
    /// Input 2 (`btn2`) reads high.
    ExitPressed,
}

impl InputEvent {
    /// Events present in a snapshot, entry first.
    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Vec<Self> {
        let mut events = Vec::new();
        if snapshot.entry_pressed() {
            events.push(Self::EntryPressed);
        }
        if snapshot.exit_pressed() {
            events.push(Self::ExitPressed);
        }
        events
    }
}

/// One member's poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceReport {
    pub index: usize,
    pub snapshot: StatusSnapshot,
    pub events: Vec<InputEvent>,
}

/// Reacts to input events on a device.
pub trait InputHandler {
    async fn on_input(&mut self, link: &mut DeviceLink, index: usize, event: InputEvent);
}

/// Default reaction: an entry press occupies space 0 and opens the barrier,
/// an exit press releases space 0 and closes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BarrierReaction;

impl InputHandler for BarrierReaction {
    async fn on_input(&mut self, link: &mut DeviceLink, index: usize, event: InputEvent) {
        let (indicated, moved) = match event {
            InputEvent::EntryPressed => (
                link.occupy_space(0).await,
                link.move_actuator(BARRIER_OPEN_ANGLE).await,
            ),
            InputEvent::ExitPressed => (
                link.release_space(0).await,
                link.move_actuator(BARRIER_CLOSED_ANGLE).await,
            ),
        };
        if !(indicated && moved) {
            warn!(index, ?event, state = %link.connection_state_text(), "Reaction not applied");
        }
    }
}

/// Shortest accepted polling interval.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polls a pool at a fixed interval.
#[derive(Debug, Clone)]
pub struct StatusPoller {
    interval: Duration,
}

impl StatusPoller {
    /// Intervals below [`MIN_POLL_INTERVAL`] (zero included) are raised to it.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Fetch every member's status once. Members that returned nothing are
    /// left out.
    pub async fn poll_once(&self, pool: &mut LinkPool) -> Vec<DeviceReport> {
        let mut reports = Vec::new();
        for (index, link) in pool.iter_mut().enumerate() {
            let Some(snapshot) = link.fetch_status().await else {
                continue;
            };
            let events = InputEvent::from_snapshot(&snapshot);
            trace!(index, ?snapshot, "Polled status");
            reports.push(DeviceReport {
                index,
                snapshot,
                events,
            });
        }
        reports
    }

    /// Poll once and hand every event to `handler`, on the link it came
    /// from. Returns the reports.
    pub async fn poll_and_dispatch<H: InputHandler>(
        &self,
        pool: &mut LinkPool,
        handler: &mut H,
    ) -> Vec<DeviceReport> {
        let reports = self.poll_once(pool).await;
        for report in &reports {
            let Some(link) = pool.get_mut(report.index) else {
                continue;
            };
            for &event in &report.events {
                debug!(index = report.index, ?event, "Input event");
                handler.on_input(link, report.index, event).await;
            }
        }
        reports
    }

    /// Poll until `shutdown` resolves.
    pub async fn run<H: InputHandler>(
        &self,
        pool: &mut LinkPool,
        handler: &mut H,
        shutdown: impl Future<Output = ()>,
    ) {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => return,
                _ = ticker.tick() => {
                    self.poll_and_dispatch(pool, handler).await;
                }
            }
        }
    }
}
