use crate::game::color::HslColor;
use crate::game::lane::Lane;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Start time of the synthetic baseline event appended to every lane,
/// comfortably before any authored chart content so the first lookup of a
/// track always resolves to a real color.
pub const BASELINE_START_TIME: f32 = -10.0;

/// One scripted color instruction for a single lane. `duration == 0` is an
/// instantaneous set: the lane holds `end_color` from `start_time` onward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerEvent {
    pub start_time: f32,
    pub duration: f32,
    pub start_color: HslColor,
    pub end_color: HslColor,
}

impl TriggerEvent {
    pub const fn new(
        start_time: f32,
        duration: f32,
        start_color: HslColor,
        end_color: HslColor,
    ) -> Self {
        Self {
            start_time,
            duration,
            start_color,
            end_color,
        }
    }

    pub const fn instant(start_time: f32, color: HslColor) -> Self {
        Self::new(start_time, 0.0, color, color)
    }

    /// The color this event produces at `now`. The progress ratio is fed to
    /// `lerp` unclamped; lerp's endpoint saturation turns any out-of-range
    /// ratio into a hold at the nearer endpoint, which is the intended
    /// steady state for events whose window has passed.
    pub fn color_at(&self, now: f32) -> HslColor {
        if self.duration == 0.0 {
            return self.end_color;
        }
        let progress = (now - self.start_time) / self.duration;
        HslColor::lerp(self.start_color, self.end_color, progress)
    }

    /// Hue 0 is indistinguishable from "no tint" when an endpoint carries no
    /// chroma (grey, or pure white). Interpolating from such an endpoint
    /// would sweep through red for no authored reason, so the degenerate
    /// endpoint inherits the other side's hue.
    pub fn smooth_hue_transition(&mut self) {
        let tintless = |c: &HslColor| c.hue == 0.0 && (c.saturation == 0.0 || c.lightness == 1.0);
        if self.end_color.hue != 0.0 && tintless(&self.start_color) {
            self.start_color.hue = self.end_color.hue;
        } else if self.start_color.hue != 0.0 && tintless(&self.end_color) {
            self.end_color.hue = self.start_color.hue;
        }
    }
}

/// One lane's sorted event sequence. Lookup contract: the active event at
/// time `t` is the one with the greatest `start_time <= t`; `None` only if
/// `t` precedes every event (unreachable in practice thanks to the
/// baseline event).
#[derive(Debug, Clone)]
pub struct TriggerTimeline {
    events: Vec<TriggerEvent>,
}

impl TriggerTimeline {
    fn build(mut events: Vec<TriggerEvent>, baseline_color: HslColor) -> Self {
        events.push(TriggerEvent::instant(BASELINE_START_TIME, baseline_color));
        // Stable: equal start times keep script encounter order.
        events.sort_by(|a, b| {
            a.start_time
                .partial_cmp(&b.start_time)
                .unwrap_or(Ordering::Less)
        });
        Self { events }
    }

    pub fn active_at(&self, now: f32) -> Option<&TriggerEvent> {
        let idx = self.events.partition_point(|event| event.start_time <= now);
        if idx == 0 { None } else { Some(&self.events[idx - 1]) }
    }

    pub fn events(&self) -> &[TriggerEvent] {
        &self.events
    }

    /// Authored events only (everything but the synthetic baseline).
    pub fn authored_len(&self) -> usize {
        self.events.len() - 1
    }
}

/// The full per-chart trigger state: one timeline per lane, every lane
/// present. Built wholesale at chart load and replaced wholesale by the
/// next load, so the evaluator never observes a partial bank.
#[derive(Debug, Clone)]
pub struct TriggerBank {
    timelines: HashMap<Lane, TriggerTimeline>,
}

impl TriggerBank {
    /// Assembles per-lane timelines from parser (or embedded-data) output.
    /// Lanes the script never mentions still get a timeline holding just
    /// the baseline event, pinning them to their engine default.
    pub fn build(mut per_lane: HashMap<Lane, Vec<TriggerEvent>>) -> Self {
        let mut timelines = HashMap::with_capacity(Lane::ALL.len());
        for lane in Lane::ALL {
            let events = per_lane.remove(&lane).unwrap_or_default();
            timelines.insert(lane, TriggerTimeline::build(events, lane.default_color()));
        }
        Self { timelines }
    }

    pub fn timeline(&self, lane: Lane) -> &TriggerTimeline {
        // Every lane is populated by `build`; index directly.
        &self.timelines[&lane]
    }

    pub fn authored_event_count(&self) -> usize {
        self.timelines.values().map(TriggerTimeline::authored_len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{BASELINE_START_TIME, TriggerBank, TriggerEvent, TriggerTimeline};
    use crate::game::color::HslColor;
    use crate::game::lane::Lane;
    use std::collections::HashMap;

    const RED: HslColor = HslColor::new(0.0, 1.0, 0.5);
    const GREEN: HslColor = HslColor::new(1.0 / 3.0, 1.0, 0.5);

    #[test]
    fn events_are_sorted_after_build() {
        let shuffled = vec![
            TriggerEvent::instant(12.0, RED),
            TriggerEvent::instant(3.0, GREEN),
            TriggerEvent::instant(7.5, RED),
        ];
        let timeline = TriggerTimeline::build(shuffled, Lane::NoteA.default_color());
        let times: Vec<f32> = timeline.events().iter().map(|e| e.start_time).collect();
        assert_eq!(times, vec![BASELINE_START_TIME, 3.0, 7.5, 12.0]);
    }

    #[test]
    fn lookup_returns_most_recently_started_event() {
        let timeline = TriggerTimeline::build(
            vec![
                TriggerEvent::instant(0.0, RED),
                TriggerEvent::instant(5.0, GREEN),
            ],
            Lane::NoteA.default_color(),
        );
        assert_eq!(timeline.active_at(-20.0).map(|e| e.start_time), None);
        assert_eq!(
            timeline.active_at(-1.0).map(|e| e.start_time),
            Some(BASELINE_START_TIME)
        );
        assert_eq!(timeline.active_at(0.0).map(|e| e.start_time), Some(0.0));
        assert_eq!(timeline.active_at(4.999).map(|e| e.start_time), Some(0.0));
        assert_eq!(timeline.active_at(5.0).map(|e| e.start_time), Some(5.0));
        assert_eq!(timeline.active_at(900.0).map(|e| e.start_time), Some(5.0));
    }

    #[test]
    fn transition_event_interpolates_and_holds() {
        let event = TriggerEvent::new(0.0, 5.0, RED, GREEN);
        assert_eq!(event.color_at(0.0), RED);
        let mid = event.color_at(2.5);
        assert!((mid.hue - 1.0 / 6.0).abs() < 1e-6);
        assert_eq!(mid.saturation, 1.0);
        assert_eq!(mid.lightness, 0.5);
        // Past the window the event degenerately holds its end color.
        assert_eq!(event.color_at(6.0), GREEN);
        assert_eq!(event.color_at(1e6), GREEN);
    }

    #[test]
    fn instant_event_ignores_progress() {
        let event = TriggerEvent::instant(2.0, GREEN);
        assert_eq!(event.color_at(2.0), GREEN);
        assert_eq!(event.color_at(100.0), GREEN);
    }

    #[test]
    fn smooth_transition_rewrites_tintless_zero_hue() {
        let mut from_grey = TriggerEvent::new(
            0.0,
            1.0,
            HslColor::new(0.0, 0.0, 0.5),
            HslColor::new(0.5, 1.0, 0.5),
        );
        from_grey.smooth_hue_transition();
        assert_eq!(from_grey.start_color.hue, 0.5);

        let mut to_white = TriggerEvent::new(
            0.0,
            1.0,
            HslColor::new(0.25, 1.0, 0.5),
            HslColor::new(0.0, 1.0, 1.0),
        );
        to_white.smooth_hue_transition();
        assert_eq!(to_white.end_color.hue, 0.25);

        // A genuinely red endpoint keeps its hue.
        let mut red_to_green = TriggerEvent::new(0.0, 1.0, RED, GREEN);
        red_to_green.smooth_hue_transition();
        assert_eq!(red_to_green.start_color.hue, 0.0);
    }

    #[test]
    fn bank_gives_every_lane_a_baseline() {
        let mut per_lane = HashMap::new();
        per_lane.insert(Lane::NoteA, vec![TriggerEvent::instant(1.0, RED)]);
        let bank = TriggerBank::build(per_lane);

        assert_eq!(bank.timeline(Lane::NoteA).authored_len(), 1);
        for lane in Lane::ALL {
            let baseline = bank
                .timeline(lane)
                .active_at(-5.0)
                .expect("baseline must be active before chart content");
            assert_eq!(baseline.start_time, BASELINE_START_TIME);
            assert_eq!(baseline.end_color, lane.default_color());
        }
        assert_eq!(bank.authored_event_count(), 1);
    }
}
