//! The transport clock: tempo, position, and repeating events.
//!
//! The clock does not run by itself. The host loop calls [`TransportClock::advance`]
//! with a time slightly ahead of "now" (the lookahead), and every event
//! occurrence scheduled before that time fires, in time order, with its own
//! precise time. Voices then start their sound at that time, so jitter in
//! when the host loop runs does not reach the audio.

pub mod time;

pub use time::{BeatTime, TimeParseError};

use thiserror::Error;

use crate::audio::timing::{clamp_bpm, seconds_per_beat, DEFAULT_BPM};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClockError {
    #[error("repeat interval must be positive, got {0} beats")]
    Interval(f64),
    #[error("start offset must not be negative, got {0} beats")]
    Offset(f64),
}

pub type EventId = u64;

/// What a firing event receives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockEvent {
    /// When the event should sound, in context seconds.
    pub time: f64,
    /// Transport position of the event, in beats.
    pub beat: f64,
    /// Tempo at the moment of scheduling the firing.
    pub bpm: f64,
}

pub type Callback = Box<dyn FnMut(ClockEvent) + Send>;

struct RepeatEvent {
    id: EventId,
    interval: f64,
    offset: f64,
    next_beat: f64,
    callback: Callback,
}

/// Time/beat pair the running clock measures from.
#[derive(Debug, Clone, Copy)]
struct Anchor {
    time: f64,
    beat: f64,
}

pub struct TransportClock {
    bpm: f64,
    anchor: Option<Anchor>,
    events: Vec<RepeatEvent>,
    next_id: EventId,
}

impl Default for TransportClock {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}

impl TransportClock {
    pub fn new(bpm: f64) -> Self {
        Self { bpm: clamp_bpm(bpm), anchor: None, events: Vec::new(), next_id: 1 }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn is_running(&self) -> bool {
        self.anchor.is_some()
    }

    /// Number of registered events.
    pub fn pending(&self) -> usize {
        self.events.len()
    }

    /// Transport position at `time`, in beats; zero while stopped.
    pub fn position(&self, time: f64) -> f64 {
        match self.anchor {
            Some(a) => a.beat + (time - a.time) / seconds_per_beat(self.bpm),
            None => 0.0,
        }
    }

    fn time_of(&self, anchor: Anchor, beat: f64) -> f64 {
        anchor.time + (beat - anchor.beat) * seconds_per_beat(self.bpm)
    }

    /// Change tempo at `time`. The beat position at `time` is preserved.
    pub fn set_bpm(&mut self, bpm: f64, time: f64) {
        let bpm = clamp_bpm(bpm);
        if let Some(a) = self.anchor {
            let beat = self.position(time);
            self.anchor = Some(Anchor { time, beat: beat.max(a.beat) });
        }
        self.bpm = bpm;
    }

    /// Move the time base by `shift` seconds. The beat position stays put:
    /// `position(t + shift)` afterwards equals `position(t)` before.
    pub fn rebase(&mut self, shift: f64) {
        if let Some(a) = self.anchor.as_mut() {
            a.time += shift;
        }
    }

    /// Register `callback` to fire every `interval`, first at `offset`.
    pub fn schedule_repeat(
        &mut self,
        callback: Callback,
        interval: BeatTime,
        offset: BeatTime,
    ) -> Result<EventId, ClockError> {
        let interval = interval.beats();
        let offset = offset.beats();
        if !(interval > 0.0) || !interval.is_finite() {
            return Err(ClockError::Interval(interval));
        }
        if !(offset >= 0.0) || !offset.is_finite() {
            return Err(ClockError::Offset(offset));
        }
        let id = self.next_id;
        self.next_id += 1;
        let next_beat = match self.anchor {
            // Joining a running transport: first occurrence not in the past
            // relative to the last anchor.
            Some(a) if a.beat > offset => {
                let k = ((a.beat - offset) / interval).ceil();
                offset + k * interval
            }
            _ => offset,
        };
        self.events.push(RepeatEvent { id, interval, offset, next_beat, callback });
        Ok(id)
    }

    pub fn clear(&mut self, id: EventId) -> bool {
        let before = self.events.len();
        self.events.retain(|e| e.id != id);
        self.events.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.events.clear();
    }

    /// Start counting from beat zero at `time`.
    pub fn start(&mut self, time: f64) {
        for e in &mut self.events {
            e.next_beat = e.offset;
        }
        self.anchor = Some(Anchor { time, beat: 0.0 });
    }

    /// Stop and rewind. Events stay registered until cancelled.
    pub fn stop(&mut self) {
        self.anchor = None;
        for e in &mut self.events {
            e.next_beat = e.offset;
        }
    }

    /// Fire every occurrence scheduled before `until`. Returns how many fired.
    pub fn advance(&mut self, until: f64) -> usize {
        let Some(anchor) = self.anchor else {
            return 0;
        };
        let until_beat = self.position(until);

        let mut due: Vec<(f64, usize)> = Vec::new();
        for (idx, e) in self.events.iter_mut().enumerate() {
            while e.next_beat < until_beat {
                due.push((e.next_beat, idx));
                e.next_beat += e.interval;
            }
        }
        // Stable: same-beat events keep registration order.
        due.sort_by(|a, b| a.0.total_cmp(&b.0));

        let bpm = self.bpm;
        for (beat, idx) in &due {
            let event = ClockEvent { time: self.time_of(anchor, *beat), beat: *beat, bpm };
            (self.events[*idx].callback)(event);
        }
        due.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(&'static str, ClockEvent)>>>;

    fn recorder(log: &Log, tag: &'static str) -> Callback {
        let log = log.clone();
        Box::new(move |ev| log.lock().unwrap().push((tag, ev)))
    }

    fn bt(s: &str) -> BeatTime {
        s.parse().unwrap()
    }

    #[test]
    fn fires_in_time_order_with_precise_times() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(120.0);
        clock.schedule_repeat(recorder(&log, "b"), bt("1m"), bt("0:0:2")).unwrap();
        clock.schedule_repeat(recorder(&log, "a"), bt("1m"), bt("0:0:0")).unwrap();
        clock.start(10.0);
        // 120 bpm: one bar = 2s
        assert_eq!(clock.advance(14.0), 4);
        let log = log.lock().unwrap();
        let seen: Vec<(&str, f64)> = log.iter().map(|(t, e)| (*t, e.time)).collect();
        assert_eq!(seen, vec![("a", 10.0), ("b", 10.25), ("a", 12.0), ("b", 12.25)]);
    }

    #[test]
    fn advance_is_incremental() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(60.0);
        clock.schedule_repeat(recorder(&log, "q"), bt("4n"), BeatTime(0.0)).unwrap();
        clock.start(0.0);
        assert_eq!(clock.advance(0.5), 1);
        assert_eq!(clock.advance(0.5), 0);
        assert_eq!(clock.advance(2.5), 2);
        let beats: Vec<f64> = log.lock().unwrap().iter().map(|(_, e)| e.beat).collect();
        assert_eq!(beats, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn stopped_clock_fires_nothing() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(120.0);
        clock.schedule_repeat(recorder(&log, "x"), bt("4n"), BeatTime(0.0)).unwrap();
        assert_eq!(clock.advance(100.0), 0);
        clock.start(0.0);
        clock.stop();
        assert_eq!(clock.advance(100.0), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn tempo_change_keeps_position() {
        let mut clock = TransportClock::new(120.0);
        clock.start(0.0);
        assert!((clock.position(1.0) - 2.0).abs() < 1e-12);
        clock.set_bpm(60.0, 1.0);
        assert!((clock.position(1.0) - 2.0).abs() < 1e-12);
        assert!((clock.position(2.0) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn rebase_keeps_position_on_new_time_base() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(120.0);
        clock.schedule_repeat(recorder(&log, "q"), bt("4n"), BeatTime(0.0)).unwrap();
        clock.start(30.0);
        assert_eq!(clock.advance(30.6), 2);
        clock.rebase(-30.0);
        assert!((clock.position(0.6) - 1.2).abs() < 1e-12);
        assert_eq!(clock.advance(1.1), 1);
        let times: Vec<f64> = log.lock().unwrap().iter().map(|(_, e)| e.time).collect();
        assert_eq!(times, vec![30.0, 30.5, 1.0]);
    }

    #[test]
    fn tempo_is_clamped() {
        let mut clock = TransportClock::new(500.0);
        assert_eq!(clock.bpm(), 300.0);
        clock.set_bpm(1.0, 0.0);
        assert_eq!(clock.bpm(), 40.0);
    }

    #[test]
    fn cancel_all_and_clear_remove_events() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(120.0);
        let a = clock.schedule_repeat(recorder(&log, "a"), bt("4n"), BeatTime(0.0)).unwrap();
        clock.schedule_repeat(recorder(&log, "b"), bt("4n"), BeatTime(0.0)).unwrap();
        assert!(clock.clear(a));
        assert!(!clock.clear(a));
        assert_eq!(clock.pending(), 1);
        clock.cancel_all();
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn rejects_non_positive_interval() {
        let mut clock = TransportClock::default();
        let err = clock.schedule_repeat(Box::new(|_| {}), BeatTime(0.0), BeatTime(0.0));
        assert_eq!(err, Err(ClockError::Interval(0.0)));
        let err = clock.schedule_repeat(Box::new(|_| {}), BeatTime(1.0), BeatTime(-1.0));
        assert_eq!(err, Err(ClockError::Offset(-1.0)));
    }

    #[test]
    fn events_carry_current_tempo() {
        let log: Log = Default::default();
        let mut clock = TransportClock::new(100.0);
        clock.schedule_repeat(recorder(&log, "x"), bt("4n"), BeatTime(0.0)).unwrap();
        clock.start(0.0);
        clock.advance(0.1);
        assert_eq!(log.lock().unwrap()[0].1.bpm, 100.0);
    }
}
