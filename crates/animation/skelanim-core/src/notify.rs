//! Animation notifies: pulse events and duration-bearing state events fired as
//! playback time sweeps across them.
//!
//! Each event carries two flags:
//! - `triggered`: set when the event fired during the most recent tick.
//! - `state_active`: for state notifies, whether playback is inside the
//!   `[time, time + duration)` window.
//!
//! Callbacks go to a [`NotifyTarget`]; the engine only decides when.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::ids::MeshComponentId;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimNotifyTrack {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimNotifyEvent {
    pub name: String,
    /// Seconds from the start of the animation.
    pub time: f32,
    /// Zero for pulse notifies.
    pub duration: f32,
    pub track_index: usize,
    #[serde(skip)]
    pub(crate) triggered: bool,
    #[serde(skip)]
    pub(crate) state_active: bool,
}

impl AnimNotifyEvent {
    pub fn pulse(name: impl Into<String>, time: f32, track_index: usize) -> Self {
        Self::state(name, time, 0.0, track_index)
    }

    pub fn state(name: impl Into<String>, time: f32, duration: f32, track_index: usize) -> Self {
        Self {
            name: name.into(),
            time,
            duration: duration.max(0.0),
            track_index,
            triggered: false,
            state_active: false,
        }
    }

    #[inline]
    pub fn is_state(&self) -> bool {
        self.duration > 0.0
    }

    #[inline]
    pub fn end_time(&self) -> f32 {
        self.time + self.duration
    }

    /// Whether the event fired on the last tick.
    #[inline]
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    #[inline]
    pub fn is_state_active(&self) -> bool {
        self.state_active
    }

    #[inline]
    fn window_contains(&self, t: f32) -> bool {
        t >= self.time && t < self.end_time()
    }
}

/// Who is being notified, and at what playback time.
#[derive(Clone, Copy, Debug)]
pub struct NotifyContext<'a> {
    pub mesh_component: MeshComponentId,
    pub animation: &'a str,
    pub time: f32,
}

/// Side-effecting notify hooks. All methods default to no-ops.
pub trait NotifyTarget {
    fn notify(&mut self, _ctx: &NotifyContext<'_>, _event: &AnimNotifyEvent) {}

    fn notify_begin(
        &mut self,
        _ctx: &NotifyContext<'_>,
        _event: &AnimNotifyEvent,
        _total_duration: f32,
    ) {
    }

    fn notify_tick(
        &mut self,
        _ctx: &NotifyContext<'_>,
        _event: &AnimNotifyEvent,
        _delta_time: f32,
    ) {
    }

    fn notify_end(&mut self, _ctx: &NotifyContext<'_>, _event: &AnimNotifyEvent) {}
}

/// A recorded callback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyCall {
    Notify {
        mesh_component: u32,
        animation: String,
        name: String,
        time: f32,
    },
    Begin {
        mesh_component: u32,
        animation: String,
        name: String,
        time: f32,
        total_duration: f32,
    },
    Tick {
        mesh_component: u32,
        animation: String,
        name: String,
        time: f32,
        delta_time: f32,
    },
    End {
        mesh_component: u32,
        animation: String,
        name: String,
        time: f32,
    },
}

impl NotifyCall {
    pub fn name(&self) -> &str {
        match self {
            Self::Notify { name, .. }
            | Self::Begin { name, .. }
            | Self::Tick { name, .. }
            | Self::End { name, .. } => name,
        }
    }

    pub fn time(&self) -> f32 {
        match self {
            Self::Notify { time, .. }
            | Self::Begin { time, .. }
            | Self::Tick { time, .. }
            | Self::End { time, .. } => *time,
        }
    }
}

/// Target that records every callback in order.
#[derive(Clone, Debug, Default)]
pub struct NotifyLog {
    calls: Vec<NotifyCall>,
}

impl NotifyLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[NotifyCall] {
        &self.calls
    }

    pub fn take(&mut self) -> Vec<NotifyCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl NotifyTarget for NotifyLog {
    fn notify(&mut self, ctx: &NotifyContext<'_>, event: &AnimNotifyEvent) {
        self.calls.push(NotifyCall::Notify {
            mesh_component: ctx.mesh_component.0,
            animation: ctx.animation.to_string(),
            name: event.name.clone(),
            time: ctx.time,
        });
    }

    fn notify_begin(
        &mut self,
        ctx: &NotifyContext<'_>,
        event: &AnimNotifyEvent,
        total_duration: f32,
    ) {
        self.calls.push(NotifyCall::Begin {
            mesh_component: ctx.mesh_component.0,
            animation: ctx.animation.to_string(),
            name: event.name.clone(),
            time: ctx.time,
            total_duration,
        });
    }

    fn notify_tick(&mut self, ctx: &NotifyContext<'_>, event: &AnimNotifyEvent, delta_time: f32) {
        self.calls.push(NotifyCall::Tick {
            mesh_component: ctx.mesh_component.0,
            animation: ctx.animation.to_string(),
            name: event.name.clone(),
            time: ctx.time,
            delta_time,
        });
    }

    fn notify_end(&mut self, ctx: &NotifyContext<'_>, event: &AnimNotifyEvent) {
        self.calls.push(NotifyCall::End {
            mesh_component: ctx.mesh_component.0,
            animation: ctx.animation.to_string(),
            name: event.name.clone(),
            time: ctx.time,
        });
    }
}

/// One tick's worth of playback movement, in seconds.
///
/// `wrapped` and `full_loop` are decided by the caller from the unwrapped
/// clock, since the wrapped endpoints alone cannot tell a full loop from a
/// short step.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NotifySweep {
    pub current_time: f32,
    pub previous_time: f32,
    pub delta_time: f32,
    /// The clock crossed the loop boundary this tick.
    pub wrapped: bool,
    /// The tick covered at least one whole loop.
    pub full_loop: bool,
}

impl NotifySweep {
    /// A sweep that does not cross a loop boundary.
    pub fn linear(previous_time: f32, current_time: f32) -> Self {
        Self {
            current_time,
            previous_time,
            delta_time: current_time - previous_time,
            wrapped: false,
            full_loop: false,
        }
    }

    #[inline]
    fn reverse(&self) -> bool {
        self.delta_time < 0.0
    }

    /// Pulse crossing test. Forward sweeps cover `(previous, current]`,
    /// reverse sweeps `[current, previous)`. A forward wrap covers
    /// `(previous, end]` and `[0, current)`; a reverse wrap mirrors it.
    /// A full loop crosses everything.
    fn crosses(&self, t: f32) -> bool {
        if self.full_loop {
            return true;
        }
        let (prev, cur) = (self.previous_time, self.current_time);
        match (self.reverse(), self.wrapped) {
            (false, false) => prev < t && t <= cur,
            (true, false) => cur <= t && t < prev,
            (false, true) => t > prev || (t >= 0.0 && t < cur),
            (true, true) => (t >= 0.0 && t < prev) || t >= cur,
        }
    }

    /// Whether the swept range touches the half-open window `[start, end)`.
    fn overlaps(&self, start: f32, end: f32) -> bool {
        if self.full_loop {
            return true;
        }
        let (prev, cur) = (self.previous_time, self.current_time);
        match (self.reverse(), self.wrapped) {
            (_, false) => prev.min(cur) < end && prev.max(cur) >= start,
            (false, true) => end > prev || start <= cur,
            (true, true) => start < prev || end > cur,
        }
    }
}

/// Notify tracks and time-sorted events for one animation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimSequenceBase {
    pub name: String,
    /// Seconds; notify times are clamped into `[0, play_length]`.
    pub play_length: f32,
    notify_tracks: Vec<AnimNotifyTrack>,
    notifies: Vec<AnimNotifyEvent>,
}

impl AnimSequenceBase {
    pub fn new(name: impl Into<String>, play_length: f32) -> Self {
        Self {
            name: name.into(),
            play_length: play_length.max(0.0),
            notify_tracks: Vec::new(),
            notifies: Vec::new(),
        }
    }

    pub fn notify_tracks(&self) -> &[AnimNotifyTrack] {
        &self.notify_tracks
    }

    pub fn notifies(&self) -> &[AnimNotifyEvent] {
        &self.notifies
    }

    pub fn find_notify(&self, name: &str) -> Option<&AnimNotifyEvent> {
        self.notifies.iter().find(|n| n.name == name)
    }

    pub fn add_notify_track(&mut self, name: impl Into<String>) -> usize {
        self.notify_tracks.push(AnimNotifyTrack { name: name.into() });
        self.notify_tracks.len() - 1
    }

    /// Insert an event, keeping the list sorted by time. Rejects events that
    /// reference a missing notify track.
    pub fn add_notify(&mut self, mut event: AnimNotifyEvent) -> bool {
        if event.track_index >= self.notify_tracks.len() {
            warn!(
                name = %event.name,
                track_index = event.track_index,
                tracks = self.notify_tracks.len(),
                "notify references a missing track"
            );
            return false;
        }
        event.time = event.time.clamp(0.0, self.play_length);
        event.triggered = false;
        event.state_active = false;
        self.notifies.push(event);
        self.sort_notifies();
        true
    }

    pub fn remove_notifies_by_name(&mut self, name: &str) -> usize {
        let before = self.notifies.len();
        self.notifies.retain(|n| n.name != name);
        before - self.notifies.len()
    }

    /// Stable sort by time, then by track.
    pub fn sort_notifies(&mut self) {
        self.notifies.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then(a.track_index.cmp(&b.track_index))
        });
    }

    /// Clear both flags on every event without firing callbacks.
    pub fn reset_notify_states(&mut self) {
        for n in &mut self.notifies {
            n.triggered = false;
            n.state_active = false;
        }
    }

    /// Fire `notify_end` for every active state notify and deactivate it.
    pub fn end_active_notify_states(
        &mut self,
        mesh_component: MeshComponentId,
        time: f32,
        target: &mut dyn NotifyTarget,
    ) {
        let ctx = NotifyContext {
            mesh_component,
            animation: &self.name,
            time,
        };
        for n in self.notifies.iter_mut().filter(|n| n.state_active) {
            n.state_active = false;
            trace!(name = %n.name, time, "notify end (forced)");
            target.notify_end(&ctx, n);
        }
    }

    /// Advance every event by one sweep, firing callbacks in event order.
    pub fn tick_notifies(
        &mut self,
        mesh_component: MeshComponentId,
        sweep: NotifySweep,
        target: &mut dyn NotifyTarget,
    ) {
        let ctx = NotifyContext {
            mesh_component,
            animation: &self.name,
            time: sweep.current_time,
        };
        for n in &mut self.notifies {
            n.triggered = false;
            if !n.is_state() {
                if sweep.crosses(n.time) {
                    n.triggered = true;
                    trace!(name = %n.name, time = sweep.current_time, "notify");
                    target.notify(&ctx, n);
                }
                continue;
            }

            let inside = n.window_contains(sweep.current_time);
            if !n.state_active {
                if inside || sweep.overlaps(n.time, n.end_time()) {
                    n.state_active = true;
                    n.triggered = true;
                    trace!(name = %n.name, time = sweep.current_time, "notify begin");
                    target.notify_begin(&ctx, n, n.duration);
                }
            } else if inside {
                trace!(name = %n.name, time = sweep.current_time, "notify tick");
                target.notify_tick(&ctx, n, sweep.delta_time);
            } else {
                n.state_active = false;
                trace!(name = %n.name, time = sweep.current_time, "notify end");
                target.notify_end(&ctx, n);
            }
        }
    }
}
