//! Telemetry ring buffer and logging helpers.
//!
//! Events reach the foreground from two places: the configuration pass
//! reports edits directly, and the control task pushes run transitions and
//! line events through [`TelemetryQueue`] with `try_send` so the periodic
//! context never waits. The foreground drains the queue, stamps each event,
//! keeps the most recent ones in a ring and mirrors them to defmt / stdout.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant};
use follower_core::telemetry::{StopReason, TelemetryEvent};
use heapless::HistoryBuf;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 32;

/// Events the control task can queue before the foreground drains them.
pub const TELEMETRY_QUEUE_DEPTH: usize = 8;

/// Queue from the control task to the foreground. Full queues drop events.
pub type TelemetryQueue = Channel<CriticalSectionRawMutex, TelemetryEvent, TELEMETRY_QUEUE_DEPTH>;

/// Monotonic sequence number assigned to each record.
pub type EventId = u32;

/// Telemetry record stored in the ring buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Instant,
    pub event: TelemetryEvent,
    /// Length of the run that just ended, on stop events.
    pub run_length: Option<Duration>,
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder {
    ring: HistoryBuf<TelemetryRecord, TELEMETRY_RING_CAPACITY>,
    run_started_at: Option<Instant>,
    next_event_id: EventId,
}

impl TelemetryRecorder {
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            run_started_at: None,
            next_event_id: 0,
        }
    }

    /// Returns the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Records `event`, tracking run length across start / stop pairs, and
    /// logs it.
    pub fn record(&mut self, event: TelemetryEvent, timestamp: Instant) -> EventId {
        let run_length = match event {
            TelemetryEvent::RunStarted => {
                self.run_started_at = Some(timestamp);
                None
            }
            TelemetryEvent::RunStopped(_) => self
                .run_started_at
                .take()
                .map(|started| timestamp.saturating_duration_since(started)),
            _ => None,
        };

        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        let record = TelemetryRecord {
            id,
            timestamp,
            event,
            run_length,
        };
        self.ring.write(record);
        log_record(&record);
        id
    }

    /// Drains every queued event from the control task.
    pub fn drain(&mut self, queue: &TelemetryQueue, timestamp: Instant) -> usize {
        let mut drained = 0;
        while let Ok(event) = queue.try_receive() {
            self.record(event, timestamp);
            drained += 1;
        }
        drained
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn log_record(record: &TelemetryRecord) {
    let timestamp_ms = record.timestamp.as_millis();
    if let TelemetryEvent::RunStopped(StopReason::SafetyCutout) = record.event {
        emit_warning(record.id, timestamp_ms);
    }
    emit_log(
        record.id,
        timestamp_ms,
        &record.event,
        record.run_length.map(|length| length.as_millis()),
    );
}

#[cfg(target_os = "none")]
fn emit_log(id: EventId, timestamp_ms: u64, event: &TelemetryEvent, run_ms: Option<u64>) {
    if let Some(run) = run_ms {
        defmt::info!(
            "telemetry #{} t={}ms {} run={}ms",
            id,
            timestamp_ms,
            defmt::Display2Format(event),
            run
        );
    } else {
        defmt::info!(
            "telemetry #{} t={}ms {}",
            id,
            timestamp_ms,
            defmt::Display2Format(event)
        );
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(id: EventId, timestamp_ms: u64, event: &TelemetryEvent, run_ms: Option<u64>) {
    if let Some(run) = run_ms {
        println!("telemetry #{id} t={timestamp_ms}ms {event} run={run}ms");
    } else {
        println!("telemetry #{id} t={timestamp_ms}ms {event}");
    }
}

#[cfg(target_os = "none")]
fn emit_warning(id: EventId, timestamp_ms: u64) {
    defmt::warn!("telemetry #{} t={}ms safety cutout, motors braked", id, timestamp_ms);
}

#[cfg(not(target_os = "none"))]
fn emit_warning(id: EventId, timestamp_ms: u64) {
    println!("telemetry #{id} t={timestamp_ms}ms safety cutout, motors braked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use follower_core::tuning::Parameter;

    fn millis(value: u64) -> Instant {
        Instant::from_millis(value)
    }

    #[test]
    fn measures_run_length_between_start_and_stop() {
        let mut recorder = TelemetryRecorder::new();

        let id = recorder.record(TelemetryEvent::RunStarted, millis(100));
        assert_eq!(id, 0);
        assert_eq!(recorder.latest().map(|record| record.run_length), Some(None));

        let id = recorder.record(TelemetryEvent::LineLost, millis(180));
        assert_eq!(id, 1);

        recorder.record(
            TelemetryEvent::RunStopped(StopReason::Operator),
            millis(1_100),
        );
        let stopped = recorder.latest().copied().expect("missing stop record");
        assert_eq!(stopped.id, 2);
        assert_eq!(stopped.run_length, Some(Duration::from_millis(1_000)));

        // A second stop without a start has nothing to measure.
        recorder.record(
            TelemetryEvent::RunStopped(StopReason::SafetyCutout),
            millis(1_200),
        );
        assert_eq!(recorder.latest().and_then(|record| record.run_length), None);
    }

    #[test]
    fn ring_keeps_only_the_newest_records() {
        let mut recorder = TelemetryRecorder::new();
        let total = u8::try_from(TELEMETRY_RING_CAPACITY + 4).expect("fits");
        for value in 0..total {
            recorder.record(
                TelemetryEvent::ParameterChanged {
                    parameter: Parameter::Proportional,
                    value,
                },
                millis(u64::from(value)),
            );
        }

        assert_eq!(recorder.len(), TELEMETRY_RING_CAPACITY);
        let first = recorder.oldest_first().next().copied().expect("empty ring");
        assert_eq!(first.id, 4);
        assert_eq!(
            recorder.latest().map(|record| record.id),
            Some(EventId::from(total) - 1)
        );
    }

    #[test]
    fn drain_empties_the_queue_and_drops_overflow() {
        let queue = TelemetryQueue::new();
        for _ in 0..TELEMETRY_QUEUE_DEPTH {
            assert!(queue.try_send(TelemetryEvent::LineLost).is_ok());
        }
        assert!(queue.try_send(TelemetryEvent::LineReacquired).is_err());

        let mut recorder = TelemetryRecorder::new();
        assert_eq!(recorder.drain(&queue, millis(5)), TELEMETRY_QUEUE_DEPTH);
        assert_eq!(recorder.drain(&queue, millis(6)), 0);
        assert!(
            recorder
                .oldest_first()
                .all(|record| record.event == TelemetryEvent::LineLost)
        );
    }
}
