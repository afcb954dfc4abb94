//! Main Loop Implementation

use crate::config::{ControllerConfig, ControllerError};
use crate::hooks::IngestHooks;
use ingest_state::{Counter, ErrorKind, IngestState, StatsSnapshot, StoreStatus, Subsystem};
use sensor_record::{MonotonicTicks, Record, RecordParser, TickSource};
use serial_link::chars::LINE_ENDING;
use serial_link::{Frame, LineAssembler, SerialLink, UartHardware};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use storage::{StoreAdapter, StoreConfig, StoreError};
use tracing::{debug, error, info, warn};

/// Record waiting for another insert attempt
struct PendingInsert {
    record: Record,
    attempts: u32,
}

/// Single-threaded ingest loop.
///
/// Each [`tick`](Self::tick) reconnects the store if needed, retries the
/// pending insert if any, then drains a bounded number of frames. A record
/// that is being retried blocks all later frames, so records reach the store
/// in arrival order.
pub struct IngestController<'a, H, S, T = MonotonicTicks>
where
    H: UartHardware,
    S: StoreAdapter,
    T: TickSource,
{
    link: &'a SerialLink<'a, H>,
    assembler: LineAssembler,
    parser: RecordParser<T>,
    store: S,
    store_config: StoreConfig,
    config: ControllerConfig,
    hooks: Option<Box<dyn IngestHooks + 'a>>,
    pending: Option<PendingInsert>,
    needs_reconnect: bool,
    iterations: u64,
    started: Instant,
}

impl<'a, H, S, T> IngestController<'a, H, S, T>
where
    H: UartHardware,
    S: StoreAdapter,
    T: TickSource,
{
    /// Create a controller over an initialized link and a connected store
    pub fn new(
        link: &'a SerialLink<'a, H>,
        store: S,
        store_config: StoreConfig,
        parser: RecordParser<T>,
        config: ControllerConfig,
    ) -> Result<Self, ControllerError> {
        config.validate()?;
        link.state().set_store_status(store.status());
        info!(
            "Ingest controller created ({} frames/tick, {} insert attempts, heartbeat every {} ticks)",
            config.max_frames_per_tick, config.max_retry_count, config.heartbeat_interval
        );

        Ok(Self {
            link,
            assembler: LineAssembler::new(),
            parser,
            store,
            store_config,
            config,
            hooks: None,
            pending: None,
            needs_reconnect: false,
            iterations: 0,
            started: Instant::now(),
        })
    }

    /// Install observer hooks
    pub fn set_hooks(&mut self, hooks: Box<dyn IngestHooks + 'a>) {
        self.hooks = Some(hooks);
    }

    /// Remove observer hooks
    pub fn clear_hooks(&mut self) {
        self.hooks = None;
    }

    fn state(&self) -> &'a IngestState {
        self.link.state()
    }

    fn notify_error(&mut self, subsystem: Subsystem, kind: ErrorKind) {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_error(subsystem, kind);
        }
    }

    fn publish_store_status(&self) {
        self.state().set_store_status(self.store.status());
    }

    /// Run one main-loop iteration. Returns the number of frames and line
    /// errors handled, so callers can idle when it is zero.
    pub fn tick(&mut self) -> usize {
        self.iterations = self.iterations.wrapping_add(1);

        if self.needs_reconnect {
            self.reconnect();
        }

        let mut handled = 0;
        let mut blocked = false;
        if let Some(pending) = self.pending.take() {
            self.pending = self.attempt_insert(pending);
            blocked = self.pending.is_some();
        }

        while !blocked && handled < self.config.max_frames_per_tick {
            let Some(polled) = self.assembler.poll(self.link) else {
                break;
            };
            handled += 1;
            match polled {
                Ok(frame) => blocked = self.process_frame(&frame),
                Err(e) => self.notify_error(Subsystem::Link, e.kind()),
            }
        }

        if self.iterations % self.config.heartbeat_interval == 0 {
            self.heartbeat();
        }

        handled
    }

    /// Parse one frame and start storing it. Returns true if the record is
    /// now waiting for a retry.
    fn process_frame(&mut self, frame: &Frame) -> bool {
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_frame(frame);
        }

        match self.parser.parse(frame.as_str()) {
            Ok(record) => {
                self.pending = self.attempt_insert(PendingInsert {
                    record,
                    attempts: 0,
                });
                self.pending.is_some()
            }
            Err(e) => {
                let state = self.state();
                state.incr(Counter::FramesTotal);
                state.incr(Counter::FramesRejected);
                state.record_error(Subsystem::Parser, e.kind());
                debug!("Rejected frame {:?}: {}", frame.as_str(), e);
                self.notify_error(Subsystem::Parser, e.kind());
                false
            }
        }
    }

    /// One insert attempt. Returns the record back if it should be retried
    /// on a later iteration.
    fn attempt_insert(&mut self, mut pending: PendingInsert) -> Option<PendingInsert> {
        pending.attempts += 1;

        let started = Instant::now();
        let result = self.store.insert(&pending.record);
        let elapsed = started.elapsed();
        self.publish_store_status();

        if elapsed > self.config.communication_timeout() {
            let state = self.state();
            state.incr(Counter::Timeouts);
            state.record_error(Subsystem::Store, ErrorKind::Timeout);
            warn!(
                "Store insert took {}ms (limit {}ms)",
                elapsed.as_millis(),
                self.config.communication_timeout_ms
            );
            self.notify_error(Subsystem::Store, ErrorKind::Timeout);
        }

        match result {
            Ok(()) => {
                self.accept(&pending.record);
                None
            }
            Err(e) => {
                self.state().record_error(Subsystem::Store, e.kind());
                self.notify_error(Subsystem::Store, e.kind());
                if matches!(e, StoreError::ConnectionLost(_)) {
                    self.needs_reconnect = true;
                }

                if e.is_retryable() && pending.attempts < self.config.max_retry_count {
                    warn!(
                        "Insert attempt {}/{} failed: {}",
                        pending.attempts, self.config.max_retry_count, e
                    );
                    Some(pending)
                } else {
                    self.drop_record(&pending.record, pending.attempts, &e);
                    None
                }
            }
        }
    }

    fn accept(&mut self, record: &Record) {
        let state = self.state();
        state.incr(Counter::FramesTotal);
        state.incr(Counter::FramesValid);
        debug!("Stored {}", record);
        if let Some(hooks) = self.hooks.as_mut() {
            hooks.on_record(record);
        }
    }

    fn drop_record(&mut self, record: &Record, attempts: u32, cause: &StoreError) {
        let state = self.state();
        state.incr(Counter::FramesTotal);
        state.incr(Counter::FramesRejected);
        state.incr(Counter::RecordsDropped);
        state.record_error(Subsystem::Store, cause.kind());
        error!(
            "Dropping record {} after {} attempt(s): {}",
            record,
            attempts,
            self.store.last_error()
        );
    }

    /// Cycle the store connection once
    fn reconnect(&mut self) {
        if let Err(e) = self.store.disconnect() {
            debug!("Disconnect before reconnect failed: {}", e);
        }

        match self.store.connect(&self.store_config) {
            Ok(()) => {
                self.needs_reconnect = false;
                self.state().incr(Counter::StoreReconnects);
                info!("Store reconnected to {}", self.store_config);
            }
            Err(e) => {
                self.state().record_error(Subsystem::Store, e.kind());
                warn!("Store reconnect failed: {}", e);
            }
        }
        self.publish_store_status();
    }

    /// Log the statistics line, and echo it to the link if configured
    pub fn heartbeat(&self) {
        let snapshot = self.link.snapshot();
        let rows = self
            .store
            .row_counts()
            .map(|counts| counts.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let line = format!(
            "Heartbeat uptime={}s {} | rows {}",
            self.uptime_secs(),
            snapshot,
            rows
        );
        info!("{}", line);

        if self.config.echo_heartbeat {
            if let Err(e) = self.link.send_str(&format!("[INFO] {}{}", line, LINE_ENDING)) {
                debug!("Heartbeat not echoed: {}", e);
            }
        }
    }

    /// Run until `shutdown` is set, then shut down
    pub fn run(&mut self, shutdown: &AtomicBool) -> StatsSnapshot {
        info!("Starting ingest loop");
        while !shutdown.load(Ordering::Acquire) {
            if self.tick() == 0 && self.pending.is_none() {
                std::thread::sleep(self.config.idle_sleep());
            }
        }
        self.shutdown()
    }

    /// Drain what has already arrived, disconnect the store and mask the
    /// UART interrupts
    pub fn shutdown(&mut self) -> StatsSnapshot {
        info!("Shutting down ingest loop");

        loop {
            while let Some(pending) = self.pending.take() {
                if self.needs_reconnect {
                    self.reconnect();
                }
                self.pending = self.attempt_insert(pending);
            }
            if self.needs_reconnect {
                self.reconnect();
            }
            match self.assembler.poll(self.link) {
                Some(Ok(frame)) => {
                    self.process_frame(&frame);
                }
                Some(Err(e)) => self.notify_error(Subsystem::Link, e.kind()),
                None => break,
            }
        }

        if let Err(e) = self.store.disconnect() {
            warn!("Store disconnect failed: {}", e);
        }
        self.publish_store_status();
        self.link.set_interrupts(false);

        let snapshot = self.link.snapshot();
        info!("Final statistics: {}", snapshot);
        snapshot
    }

    /// Best-effort seconds since construction
    pub fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Iterations run so far
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    /// Whether a record is waiting for another insert attempt
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Current statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.link.snapshot()
    }

    /// Store status as last published
    pub fn store_status(&self) -> StoreStatus {
        self.state().store_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sensor_record::{FixedTicks, ParserLimits, SensorStatus};
    use serial_link::MockUart;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;
    use storage::MemoryStore;

    type Controller<'a> = IngestController<'a, MockUart, MemoryStore, FixedTicks>;

    fn ready_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.connect(&StoreConfig::default()).unwrap();
        store.create_tables().unwrap();
        store
    }

    fn controller<'a>(
        link: &'a SerialLink<'a, MockUart>,
        config: ControllerConfig,
    ) -> Controller<'a> {
        let parser =
            RecordParser::with_limits(ParserLimits::default(), FixedTicks::new(1)).unwrap();
        IngestController::new(link, ready_store(), StoreConfig::default(), parser, config)
            .unwrap()
    }

    fn feed(link: &SerialLink<'_, MockUart>, bytes: &[u8]) {
        for byte in bytes {
            link.on_rx_byte(*byte);
        }
    }

    #[derive(Default)]
    struct Recorder {
        events: Rc<RefCell<Vec<String>>>,
    }

    impl IngestHooks for Recorder {
        fn on_frame(&mut self, frame: &Frame) {
            self.events.borrow_mut().push(format!("frame:{}", frame));
        }

        fn on_error(&mut self, subsystem: Subsystem, kind: ErrorKind) {
            self.events
                .borrow_mut()
                .push(format!("error:{}:{}", subsystem.name(), kind));
        }

        fn on_record(&mut self, record: &Record) {
            self.events
                .borrow_mut()
                .push(format!("record:{}", record.student_id));
        }
    }

    #[test]
    fn test_s1_sensor1_frame() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"2021001ZS,25.6,60.2\n");
        assert_eq!(ctl.tick(), 1);

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid, snap.frames_rejected), (1, 1, 0));

        let rows = ctl.store_mut().query_sensor1("2021001ZS", 1).unwrap();
        assert_eq!(rows[0].temperature, 25.6);
        assert_eq!(rows[0].humidity, 60.2);
        assert_eq!(rows[0].sensor_name, "TEMP_HUMIDITY");
        assert_eq!(rows[0].status, SensorStatus::Normal);
    }

    #[test]
    fn test_s2_sensor2_frame() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"2021001ZS,DOOR_SENSOR,1\r\n");
        ctl.tick();

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid), (1, 1));
        let rows = ctl.store_mut().query_sensor2("2021001ZS", 1).unwrap();
        assert_eq!(rows[0].sensor_name, "DOOR_SENSOR");
        assert_eq!(rows[0].interrupt_count, 1);
        assert_eq!(rows[0].status, SensorStatus::Warning);
    }

    #[test]
    fn test_s3_s4_rejections() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"invalid,data\n");
        ctl.tick();
        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid, snap.frames_rejected), (1, 0, 1));
        assert_eq!(snap.last_errors.parser, ErrorKind::InvalidFormat);

        feed(&link, b"2021001ZS,120.0,60.2\n");
        ctl.tick();
        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid, snap.frames_rejected), (2, 0, 2));
        assert_eq!(snap.last_errors.parser, ErrorKind::InvalidRange);
    }

    #[test]
    fn test_s5_overlong_line_resyncs() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, &[b'A'; 200]);
        feed(&link, b"\n");
        ctl.tick();
        let snap = ctl.stats();
        assert_eq!(snap.framing_errors, 1);
        assert_eq!(snap.frames_total, 0);

        feed(&link, b"A,25.6,60.2\n");
        ctl.tick();
        assert_eq!(ctl.stats().frames_valid, 1);
    }

    #[test]
    fn test_s6_two_bursts_in_order() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        ctl.set_hooks(Box::new(recorder));

        feed(&link, b"A,25.6,60.2\nB,MOT");
        ctl.tick();
        feed(&link, b"ION,2\n");
        ctl.tick();

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid), (2, 2));
        assert_eq!(
            *events.borrow(),
            vec![
                "frame:A,25.6,60.2",
                "record:A",
                "frame:B,MOTION,2",
                "record:B"
            ]
        );

        let rows = ctl.store_mut().query_sensor2("B", 1).unwrap();
        assert_eq!(rows[0].sensor_name, "MOTION");
    }

    #[test]
    fn test_retry_then_success() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        ctl.store_mut().fail_next(StoreError::QueryFailed("busy".into()));
        ctl.store_mut().fail_next(StoreError::Timeout(30));

        feed(&link, b"A,25.6,60.2\n");
        ctl.tick();
        assert!(ctl.has_pending());
        assert_eq!(ctl.stats().frames_total, 0);
        ctl.tick();
        assert!(ctl.has_pending());
        ctl.tick();
        assert!(!ctl.has_pending());

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid), (1, 1));
        assert_eq!(ctl.store().inserts_attempted(), 3);
    }

    #[test]
    fn test_retries_exhausted_drops_record() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        for _ in 0..3 {
            ctl.store_mut().fail_next(StoreError::QueryFailed("disk full".into()));
        }

        feed(&link, b"A,25.6,60.2\n");
        for _ in 0..3 {
            ctl.tick();
        }

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_valid, snap.frames_rejected), (1, 0, 1));
        assert_eq!(snap.records_dropped, 1);
        assert_eq!(snap.last_errors.store, ErrorKind::QueryFailed);
        assert_eq!(ctl.store().inserts_attempted(), 3);
        assert!(snap.is_balanced());
    }

    #[test]
    fn test_non_retryable_dropped_at_once() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"bad;id,25.6,60.2\n");
        ctl.tick();

        let snap = ctl.stats();
        assert_eq!((snap.frames_total, snap.frames_rejected), (1, 1));
        assert_eq!(snap.last_errors.store, ErrorKind::InvalidParam);
        assert_eq!(ctl.store().inserts_attempted(), 1);
    }

    #[test]
    fn test_retry_blocks_later_frames() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        ctl.store_mut().fail_next(StoreError::QueryFailed("busy".into()));

        feed(&link, b"FIRST,25.6,60.2\nSECOND,DOOR,1\n");
        ctl.tick();
        assert_eq!(ctl.store().inserts_attempted(), 1);
        assert!(link.data_available());

        ctl.tick();
        let snap = ctl.stats();
        assert_eq!(snap.frames_valid, 2);

        let first = ctl.store_mut().query_sensor1("FIRST", 1).unwrap();
        let second = ctl.store_mut().query_sensor2("SECOND", 1).unwrap();
        assert!(first[0].id < second[0].id);
    }

    #[test]
    fn test_connection_lost_reconnects() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        ctl.store_mut()
            .fail_next(StoreError::ConnectionLost("reset".into()));

        feed(&link, b"A,25.6,60.2\n");
        ctl.tick();
        assert_eq!(ctl.store_status(), StoreStatus::Error);

        ctl.tick();
        let snap = ctl.stats();
        assert_eq!(snap.store_reconnects, 1);
        assert_eq!(snap.frames_valid, 1);
        assert_eq!(snap.store_status, StoreStatus::Connected);
        assert_eq!(ctl.store().connects(), 2);
    }

    #[test]
    fn test_reconnect_retried_each_tick() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let config = ControllerConfig {
            max_retry_count: 5,
            ..Default::default()
        };
        let mut ctl = controller(&link, config);
        ctl.store_mut()
            .fail_next(StoreError::ConnectionLost("reset".into()));
        ctl.store_mut().refuse_connections(2);

        feed(&link, b"A,25.6,60.2\n");
        ctl.tick();
        ctl.tick();
        ctl.tick();
        assert_eq!(ctl.stats().store_reconnects, 0);
        ctl.tick();

        let snap = ctl.stats();
        assert_eq!(snap.store_reconnects, 1);
        assert_eq!(snap.frames_valid, 1);
    }

    #[test]
    fn test_frames_per_tick_bounded() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        for i in 0..10 {
            feed(&link, format!("S{},20,50\n", i).as_bytes());
        }
        assert_eq!(ctl.tick(), 8);
        assert_eq!(ctl.stats().frames_total, 8);
        assert_eq!(ctl.tick(), 2);
        assert_eq!(ctl.stats().frames_total, 10);
        assert_eq!(ctl.tick(), 0);
    }

    #[test]
    fn test_heartbeat_echo() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let config = ControllerConfig {
            heartbeat_interval: 2,
            echo_heartbeat: true,
            ..Default::default()
        };
        let mut ctl = controller(&link, config);

        ctl.tick();
        assert_eq!(link.tx_pending(), 0);
        ctl.tick();
        assert!(link.tx_pending() > 0);

        while link.hardware().tx_empty_enabled() {
            link.on_tx_empty();
        }
        let text = String::from_utf8(link.hardware().take_transmitted()).unwrap();
        assert!(text.starts_with("[INFO] Heartbeat uptime="));
        assert!(text.contains("rows sensor1=0 sensor2=0"));
        assert!(text.ends_with("\r\n"));
    }

    #[test]
    fn test_slow_store_counts_timeout() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let config = ControllerConfig {
            communication_timeout_ms: 1,
            ..Default::default()
        };
        let mut ctl = controller(&link, config);
        ctl.store_mut().set_latency(Duration::from_millis(10));

        feed(&link, b"A,25.6,60.2\n");
        ctl.tick();

        let snap = ctl.stats();
        assert_eq!(snap.timeout_count, 1);
        assert_eq!(snap.frames_valid, 1);
        assert_eq!(snap.last_errors.store, ErrorKind::Timeout);
    }

    #[test]
    fn test_run_drains_on_shutdown() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        link.set_interrupts(true);
        let mut ctl = controller(&link, ControllerConfig::default());

        for i in 0..12 {
            feed(&link, format!("S{},20,50\n", i).as_bytes());
        }
        let shutdown = AtomicBool::new(true);
        let snap = ctl.run(&shutdown);

        assert_eq!(snap.frames_valid, 12);
        assert_eq!(snap.store_status, StoreStatus::Disconnected);
        assert!(!link.hardware().interrupts_enabled());
    }

    #[test]
    fn test_shutdown_reconnects_before_retrying() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"A,25.6,60.2\nB,25.6,60.2\nC,25.6,60.2\n");
        ctl.tick();
        assert_eq!(ctl.stats().frames_valid, 3);

        ctl.store_mut()
            .fail_next(StoreError::ConnectionLost("reset".into()));
        feed(&link, b"D,1,2\nE,1,2\n");
        let snap = ctl.run(&AtomicBool::new(true));

        assert_eq!(snap.frames_total, 5);
        assert_eq!(snap.frames_valid, 5);
        assert_eq!(snap.records_dropped, 0);
        assert_eq!(snap.store_reconnects, 1);
        assert!(snap.is_balanced());
    }

    #[test]
    fn test_line_errors_reach_hooks() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());
        let recorder = Recorder::default();
        let events = recorder.events.clone();
        ctl.set_hooks(Box::new(recorder));

        feed(&link, &[b'x'; 130]);
        feed(&link, b"\nA,MOTION,9\n");
        ctl.tick();

        assert_eq!(
            *events.borrow(),
            vec![
                "error:link:FRAME_TOO_LONG",
                "frame:A,MOTION,9",
                "error:parser:INVALID_RANGE"
            ]
        );
    }

    #[test]
    fn test_records_reach_store_unchanged() {
        let state = IngestState::new();
        let link = SerialLink::new(MockUart::new(), &state);
        let mut ctl = controller(&link, ControllerConfig::default());

        feed(&link, b"  2021001ZS , -12.5 , 95\r\n");
        ctl.tick();

        let row = ctl.store_mut().query_sensor1("2021001ZS", 1).unwrap().remove(0);
        assert_eq!(row.temperature, -12.5);
        assert_eq!(row.humidity, 95.0);
        assert_eq!(row.status, SensorStatus::Warning);
        assert_eq!(row.timestamp, 1);
    }

    proptest! {
        #[test]
        fn prop_counters_stay_balanced(
            lines in proptest::collection::vec(
                prop_oneof![
                    Just("A,25.6,60.2".to_string()),
                    Just("B,DOOR,1".to_string()),
                    Just("invalid,data".to_string()),
                    Just("C,120,50".to_string()),
                    "[ -~]{0,30}",
                ],
                0..20,
            ),
            failures in 0usize..4,
        ) {
            let state = IngestState::new();
            let link = SerialLink::new(MockUart::new(), &state);
            let mut ctl = controller(&link, ControllerConfig::default());
            for _ in 0..failures {
                ctl.store_mut().fail_next(StoreError::QueryFailed("flaky".into()));
            }

            for line in &lines {
                feed(&link, line.as_bytes());
                feed(&link, b"\r\n");
                ctl.tick();
                prop_assert!(ctl.stats().is_balanced());
            }
            let snap = ctl.shutdown();
            prop_assert!(snap.is_balanced());
        }
    }
}
