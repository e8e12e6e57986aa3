//! One application session: start-up, cooperative polling and shutdown.

use log::{debug, info, warn};

use crate::api::{HarnessConfig, InputEvent, Renderer};
use crate::clock::{is_after, Clock, Timestamp};
use crate::cpu::CpuCore;
use crate::display::DisplaySurface;
use crate::error::{HarnessError, SessionPhase};
use crate::hal::{HalBridge, Vibrator};
use crate::scheduler::{CatchUpScheduler, TickOutcome};
use crate::snapshot::{restore_state, save_state, RestoreOutcome};
use crate::store::DurableStore;
use crate::ticker::Ticker;

/// What a single [`Session::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PollReport {
    /// Outcome of the CPU tick, when one was due.
    pub cpu: Option<TickOutcome>,
    /// Whether a frame was handed to the renderer.
    pub rendered: bool,
}

/// Owns a CPU core and its platform collaborators for one application run.
///
/// The host calls [`Session::start`] once, then [`Session::poll`] from its
/// event loop (sleeping until [`Session::next_deadline`] in between),
/// forwards button changes through [`Session::on_input`], and finally calls
/// [`Session::shutdown`].
#[derive(Debug)]
pub struct Session<K, C, V, S, R> {
    config: HarnessConfig,
    core: K,
    bridge: HalBridge<C, V>,
    scheduler: CatchUpScheduler,
    store: S,
    renderer: R,
    cpu_ticker: Ticker,
    frame_ticker: Ticker,
    phase: SessionPhase,
}

impl<K, C, V, S, R> Session<K, C, V, S, R>
where
    K: CpuCore,
    C: Clock,
    V: Vibrator,
    S: DurableStore,
    R: Renderer,
{
    /// Assembles a session. Nothing runs until [`Session::start`].
    pub fn new(config: HarnessConfig, core: K, clock: C, vibrator: V, store: S, renderer: R) -> Self {
        let now = clock.now();
        let cpu_ticker = Ticker::new(config.cpu_tick_interval_us, now);
        let frame_ticker = Ticker::from_rate_hz(config.frame_rate_hz, now);
        let scheduler = CatchUpScheduler::new(config.max_steps_per_tick);
        let bridge = HalBridge::with_pattern(clock, vibrator, config.vibe_pattern.clone());

        Self {
            config,
            core,
            bridge,
            scheduler,
            store,
            renderer,
            cpu_ticker,
            frame_ticker,
            phase: SessionPhase::Created,
        }
    }

    /// Initializes the core with `rom`, then restores the last snapshot.
    ///
    /// A snapshot that cannot be read leaves the freshly initialized state in
    /// place and is reported as [`RestoreOutcome::ColdStart`].
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Core`] when the core rejects the ROM, or
    /// [`HarnessError::Lifecycle`] when the session was already started.
    pub fn start(&mut self, rom: &[u16]) -> Result<RestoreOutcome, HarnessError> {
        self.expect_phase(SessionPhase::Created)?;

        self.core.init(rom, None, self.config.clock_rate_hz)?;
        info!(
            "cpu core initialized with {} rom words at {} Hz",
            rom.len(),
            self.config.clock_rate_hz
        );

        let outcome = match restore_state(self.core.state_mut(), &self.store) {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!("snapshot unreadable, starting cold: {error}");
                RestoreOutcome::ColdStart
            }
        };
        match outcome {
            RestoreOutcome::Restored => info!("resumed from saved snapshot"),
            RestoreOutcome::ColdStart => info!("no usable snapshot, cold start"),
            RestoreOutcome::VersionMismatch { found } => {
                warn!("ignoring snapshot with unsupported version {found}, cold start");
            }
        }

        let now = self.bridge.clock().now();
        self.cpu_ticker.rearm(now);
        self.frame_ticker.rearm(now);
        self.phase = SessionPhase::Running;
        Ok(outcome)
    }

    /// Services whichever tickers are due.
    ///
    /// The CPU ticker is re-armed before the core is stepped, so the next tick
    /// is scheduled one period after this one began. The frame ticker is
    /// re-armed after the renderer returns.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lifecycle`] unless the session is running.
    pub fn poll(&mut self) -> Result<PollReport, HarnessError> {
        self.expect_phase(SessionPhase::Running)?;
        let mut report = PollReport::default();

        if self.cpu_ticker.poll(self.bridge.clock().now()) {
            report.cpu = Some(self.scheduler.tick(&mut self.core, &mut self.bridge));
        }

        if self.frame_ticker.is_due(self.bridge.clock().now()) {
            self.renderer.render(self.bridge.surface());
            self.frame_ticker.rearm(self.bridge.clock().now());
            report.rendered = true;
        }

        Ok(report)
    }

    /// Forwards a button change to the core.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Lifecycle`] unless the session is running.
    pub fn on_input(&mut self, event: InputEvent) -> Result<(), HarnessError> {
        self.expect_phase(SessionPhase::Running)?;
        debug!("button {:?} {:?}", event.button, event.state);
        self.core.set_button(event.button, event.state);
        Ok(())
    }

    /// Earliest armed ticker deadline, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Timestamp> {
        match (self.cpu_ticker.deadline(), self.frame_ticker.deadline()) {
            (Some(cpu), Some(frame)) => Some(if is_after(cpu, frame) { frame } else { cpu }),
            (cpu, frame) => cpu.or(frame),
        }
    }

    /// Stops both tickers, writes the final snapshot and releases the core.
    ///
    /// The core is released even when the snapshot write fails.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Snapshot`] when the snapshot could not be
    /// written, or [`HarnessError::Lifecycle`] unless the session is running.
    pub fn shutdown(&mut self) -> Result<(), HarnessError> {
        self.expect_phase(SessionPhase::Running)?;

        self.cpu_ticker.cancel();
        self.frame_ticker.cancel();

        let saved = save_state(self.core.state(), &mut self.store);
        self.bridge.silence();
        self.core.release();
        self.phase = SessionPhase::Stopped;

        match saved {
            Ok(()) => {
                info!(
                    "session stopped after {} cpu steps",
                    self.scheduler.total_steps()
                );
                Ok(())
            }
            Err(error) => {
                warn!("final snapshot failed: {error}");
                Err(error.into())
            }
        }
    }

    /// Current lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Configuration the session was built with.
    #[must_use]
    pub const fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// The CPU core.
    #[must_use]
    pub const fn core(&self) -> &K {
        &self.core
    }

    /// The HAL bridge, including the clock and vibrator.
    #[must_use]
    pub const fn bridge(&self) -> &HalBridge<C, V> {
        &self.bridge
    }

    /// Display surface as last written by the core.
    #[must_use]
    pub const fn surface(&self) -> &DisplaySurface {
        self.bridge.surface()
    }

    /// The catch-up scheduler.
    #[must_use]
    pub const fn scheduler(&self) -> &CatchUpScheduler {
        &self.scheduler
    }

    /// The durable store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The renderer.
    #[must_use]
    pub const fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Tears the session down into its store and renderer.
    pub fn into_parts(self) -> (S, R) {
        (self.store, self.renderer)
    }

    fn expect_phase(&self, expected: SessionPhase) -> Result<(), HarnessError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(HarnessError::Lifecycle {
                expected,
                actual: self.phase,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{PollReport, Session};
    use crate::api::{HarnessConfig, InputEvent, NullRenderer, PlatformButton, Renderer};
    use crate::clock::{ManualClock, Timestamp};
    use crate::cpu::{Button, ButtonState, CoreError, CpuCore};
    use crate::display::DisplaySurface;
    use crate::error::{HarnessError, SessionPhase};
    use crate::hal::{Hal, NoVibrator};
    use crate::scheduler::TickOutcome;
    use crate::snapshot::{save_state, RestoreOutcome};
    use crate::state::MachineState;
    use crate::store::{DurableStore, MemoryStore, StoreError, StoreKey};

    /// Core that advances emulated time by 100us per step and lights pixel
    /// (0, 0) on its first step.
    #[derive(Debug, Default)]
    struct ScriptedCore {
        state: MachineState,
        emulated_us: Timestamp,
        events: Vec<String>,
        reject_rom: bool,
    }

    impl CpuCore for ScriptedCore {
        fn init(
            &mut self,
            rom: &[u16],
            _state: Option<&MachineState>,
            clock_rate_hz: u32,
        ) -> Result<(), CoreError> {
            if self.reject_rom {
                return Err(CoreError::InvalidRom("rejected".to_owned()));
            }
            self.state = MachineState::default();
            self.state.set_pc(0x100);
            self.events
                .push(format!("init {} words @ {clock_rate_hz}", rom.len()));
            Ok(())
        }

        fn step(&mut self, hal: &mut dyn Hal) {
            hal.set_lcd_matrix(0, 0, true);
            self.emulated_us = self.emulated_us.wrapping_add(100);
            hal.sleep_until(self.emulated_us);
        }

        fn state(&self) -> &MachineState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut MachineState {
            &mut self.state
        }

        fn set_button(&mut self, button: Button, state: ButtonState) {
            self.events.push(format!("{button:?} {state:?}"));
        }

        fn release(&mut self) {
            self.events.push("release".to_owned());
        }
    }

    #[derive(Debug, Default)]
    struct CountingRenderer {
        frames: usize,
        lit_origin: bool,
    }

    impl Renderer for CountingRenderer {
        fn render(&mut self, surface: &DisplaySurface) {
            self.frames += 1;
            self.lit_origin = surface.pixel(0, 0);
        }
    }

    /// Store whose writes fail after a number of successful ones.
    #[derive(Debug, Default)]
    struct FailingStore {
        inner: MemoryStore,
        writes_left: usize,
    }

    impl DurableStore for FailingStore {
        fn exists(&self, key: StoreKey) -> bool {
            self.inner.exists(key)
        }

        fn read_int(&self, key: StoreKey) -> Result<u32, StoreError> {
            self.inner.read_int(key)
        }

        fn write_int(&mut self, key: StoreKey, value: u32) -> Result<(), StoreError> {
            self.spend_write()?;
            self.inner.write_int(key, value)
        }

        fn read_block(&self, key: StoreKey, out: &mut [u8]) -> Result<usize, StoreError> {
            self.inner.read_block(key, out)
        }

        fn write_block(&mut self, key: StoreKey, bytes: &[u8]) -> Result<(), StoreError> {
            self.spend_write()?;
            self.inner.write_block(key, bytes)
        }

        fn delete(&mut self, key: StoreKey) -> Result<(), StoreError> {
            self.inner.delete(key)
        }
    }

    impl FailingStore {
        fn spend_write(&mut self) -> Result<(), StoreError> {
            if self.writes_left == 0 {
                return Err(StoreError::Backend("quota exceeded".to_owned()));
            }
            self.writes_left -= 1;
            Ok(())
        }
    }

    type TestSession<S, R> = Session<ScriptedCore, ManualClock, NoVibrator, S, R>;

    fn session_with<S: DurableStore, R: Renderer>(
        clock: &ManualClock,
        store: S,
        renderer: R,
    ) -> TestSession<S, R> {
        Session::new(
            HarnessConfig::default(),
            ScriptedCore::default(),
            clock.clone(),
            NoVibrator,
            store,
            renderer,
        )
    }

    #[test]
    fn empty_store_is_a_cold_start() {
        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);

        assert_eq!(session.start(&[0; 16]), Ok(RestoreOutcome::ColdStart));
        assert_eq!(session.phase(), SessionPhase::Running);
        assert_eq!(session.core().events, vec!["init 16 words @ 1000000"]);
        assert_eq!(session.core().state().pc(), 0x100);
    }

    #[test]
    fn restore_runs_after_core_init() {
        let mut saved = MachineState::default();
        saved.set_pc(0x0ABC);
        let mut store = MemoryStore::new();
        save_state(&saved, &mut store).expect("seed snapshot");

        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, store, NullRenderer);

        assert_eq!(session.start(&[]), Ok(RestoreOutcome::Restored));
        assert_eq!(session.core().state().pc(), 0x0ABC);
    }

    #[test]
    fn unreadable_snapshot_degrades_to_cold_start() {
        let mut store = MemoryStore::new();
        save_state(&MachineState::default(), &mut store).expect("seed snapshot");
        store.delete(20).expect("drop one entry");

        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, store, NullRenderer);

        assert_eq!(session.start(&[]), Ok(RestoreOutcome::ColdStart));
        assert_eq!(session.core().state().pc(), 0x100);
    }

    #[test]
    fn rejected_rom_keeps_session_unstarted() {
        let clock = ManualClock::starting_at(0);
        let mut session = Session::new(
            HarnessConfig::default(),
            ScriptedCore {
                reject_rom: true,
                ..ScriptedCore::default()
            },
            clock,
            NoVibrator,
            MemoryStore::new(),
            NullRenderer,
        );

        assert!(matches!(session.start(&[]), Err(HarnessError::Core(_))));
        assert_eq!(session.phase(), SessionPhase::Created);
    }

    #[test]
    fn poll_before_start_is_a_lifecycle_error() {
        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);

        assert_eq!(
            session.poll(),
            Err(HarnessError::Lifecycle {
                expected: SessionPhase::Running,
                actual: SessionPhase::Created,
            })
        );
    }

    #[test]
    fn cpu_ticks_every_millisecond_and_frames_at_thirty_hz() {
        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, MemoryStore::new(), CountingRenderer::default());
        session.start(&[]).expect("start");

        assert_eq!(session.poll(), Ok(PollReport::default()));

        let mut cpu_ticks = 0;
        for _ in 0..100 {
            clock.advance(1_000);
            let report = session.poll().expect("poll");
            if let Some(outcome) = report.cpu {
                assert!(matches!(outcome, TickOutcome::CaughtUp { steps: 10 | 11 }));
                cpu_ticks += 1;
            }
        }

        assert_eq!(cpu_ticks, 100);
        assert_eq!(session.scheduler().total_steps(), 1_001);
        // Frames land on the first poll past 33.3ms and 66.7ms after the last one.
        assert_eq!(session.renderer().frames, 2);
        assert!(session.renderer().lit_origin);
        assert!(session.surface().pixel(0, 0));
    }

    #[test]
    fn next_deadline_is_the_earliest_ticker() {
        let clock = ManualClock::starting_at(500);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);
        session.start(&[]).expect("start");

        assert_eq!(session.next_deadline(), Some(1_500));
    }

    #[test]
    fn next_deadline_survives_clock_wrap() {
        let clock = ManualClock::starting_at(u32::MAX - 200);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);
        session.start(&[]).expect("start");

        assert_eq!(session.next_deadline(), Some(799));
    }

    #[test]
    fn input_is_forwarded_after_mapping() {
        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);
        session.start(&[]).expect("start");

        for button in [PlatformButton::Up, PlatformButton::Back] {
            if let Some(event) = InputEvent::from_platform(button, ButtonState::Pressed) {
                session.on_input(event).expect("input");
            }
        }

        assert_eq!(&session.core().events[1..], ["Left Pressed"]);
    }

    #[test]
    fn shutdown_saves_before_release() {
        let clock = ManualClock::starting_at(0);
        let mut session = session_with(&clock, MemoryStore::new(), NullRenderer);
        session.start(&[]).expect("start");

        session.shutdown().expect("shutdown");

        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.core().events.last().map(String::as_str), Some("release"));
        assert!(matches!(session.poll(), Err(HarnessError::Lifecycle { .. })));

        let (store, _) = session.into_parts();
        let mut restored = MachineState::default();
        assert_eq!(
            crate::snapshot::restore_state(&mut restored, &store),
            Ok(RestoreOutcome::Restored)
        );
        assert_eq!(restored.pc(), 0x100);
    }

    #[test]
    fn failed_save_is_reported_and_core_still_released() {
        let clock = ManualClock::starting_at(0);
        let store = FailingStore {
            writes_left: 5,
            ..FailingStore::default()
        };
        let mut session = session_with(&clock, store, NullRenderer);
        session.start(&[]).expect("start");

        assert!(matches!(session.shutdown(), Err(HarnessError::Snapshot(_))));
        assert_eq!(session.phase(), SessionPhase::Stopped);
        assert_eq!(session.core().events.last().map(String::as_str), Some("release"));
    }
}
