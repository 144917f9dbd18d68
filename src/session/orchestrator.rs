//! Channel-driven orchestration shell around a [`Session`].
//!
//! One worker thread owns the session and consumes a single command
//! channel, so cycles are strictly sequential by construction — the
//! channel is the run-lock. A scheduler thread issues continuous-mode
//! ticks; a tick arriving while a cycle is still pending is skipped, so a
//! slow cycle delays the next one instead of overlapping it.

use crate::session::{ConfigUpdate, CycleMode, CycleResult, Session};
use crate::{HeraldError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Scheduler polling step; bounds how stale the auto/shutdown flags get.
const SCHEDULER_STEP: Duration = Duration::from_millis(50);

/// Commands consumed by the session worker.
#[derive(Debug, Clone)]
pub enum OrchestratorCommand {
    /// Run one pipeline cycle.
    RunCycle(CycleMode),

    /// Apply a runtime configuration update.
    Configure(ConfigUpdate),

    /// Stop the session: halt auto-capture and cancel in-flight speech.
    StopSession,

    /// Shut the worker down.
    Shutdown,
}

/// Events published by the session worker.
#[derive(Debug, Clone)]
pub enum OrchestratorEvent {
    CycleCompleted(CycleResult),
    ConfigurationApplied,
    SessionStopped,
    Error(String),
    Shutdown,
}

/// Control surface handed to the transport layer.
pub struct OrchestratorHandle {
    command_tx: Sender<OrchestratorCommand>,
    event_rx: Receiver<OrchestratorEvent>,
    latest: Arc<Mutex<Option<CycleResult>>>,
    auto_running: Arc<AtomicBool>,
    interval_ms: Arc<AtomicU64>,
    shutting_down: Arc<AtomicBool>,
}

impl OrchestratorHandle {
    /// Request an immediate single-shot cycle.
    ///
    /// If a cycle is in progress the request queues behind it; cycles
    /// never interleave.
    pub fn capture_now(&self) -> Result<()> {
        self.send(OrchestratorCommand::RunCycle(CycleMode::SingleShot))
    }

    /// Start timer-driven continuous capture.
    pub fn start_auto(&self) {
        if !self.auto_running.swap(true, Ordering::SeqCst) {
            info!("Auto-capture started");
        }
    }

    /// Stop continuous capture and cancel any in-flight speech.
    pub fn stop_auto(&self) -> Result<()> {
        if self.auto_running.swap(false, Ordering::SeqCst) {
            info!("Auto-capture stopped");
        }
        self.send(OrchestratorCommand::StopSession)
    }

    pub fn is_auto_running(&self) -> bool {
        self.auto_running.load(Ordering::SeqCst)
    }

    /// Apply a configuration update.
    ///
    /// Invalid options are rejected here, synchronously, before the update
    /// crosses the channel.
    pub fn configure(&self, update: ConfigUpdate) -> Result<()> {
        update.validate()?;
        if let Some(seconds) = update.capture_interval_seconds {
            self.interval_ms.store(seconds * 1000, Ordering::SeqCst);
        }
        self.send(OrchestratorCommand::Configure(update))
    }

    /// Most recent cycle result, for polling transports.
    pub fn latest_result(&self) -> Option<CycleResult> {
        self.latest.lock().clone()
    }

    pub fn try_recv_event(&self) -> Option<OrchestratorEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_event_timeout(&self, timeout: Duration) -> Option<OrchestratorEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Stop everything: scheduler, session worker, in-flight speech.
    pub fn shutdown(&self) -> Result<()> {
        self.shutting_down.store(true, Ordering::SeqCst);
        self.auto_running.store(false, Ordering::SeqCst);
        self.send(OrchestratorCommand::Shutdown)
    }

    fn send(&self, command: OrchestratorCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|e| HeraldError::Channel(format!("Orchestrator is gone: {}", e)))
    }
}

/// Owns the session until `start` moves it onto the worker thread.
pub struct Orchestrator {
    session: Session,
    command_tx: Sender<OrchestratorCommand>,
    command_rx: Receiver<OrchestratorCommand>,
    event_tx: Sender<OrchestratorEvent>,
    latest: Arc<Mutex<Option<CycleResult>>>,
    auto_running: Arc<AtomicBool>,
    interval_ms: Arc<AtomicU64>,
    shutting_down: Arc<AtomicBool>,
    cycle_pending: Arc<AtomicBool>,
}

impl Orchestrator {
    pub fn new(session: Session) -> (Self, OrchestratorHandle) {
        let (command_tx, command_rx) = bounded(64);
        let (event_tx, event_rx) = bounded(64);

        let latest = Arc::new(Mutex::new(None));
        let auto_running = Arc::new(AtomicBool::new(false));
        let interval_ms = Arc::new(AtomicU64::new(
            session.config().capture_interval_seconds * 1000,
        ));
        let shutting_down = Arc::new(AtomicBool::new(false));

        let handle = OrchestratorHandle {
            command_tx: command_tx.clone(),
            event_rx,
            latest: Arc::clone(&latest),
            auto_running: Arc::clone(&auto_running),
            interval_ms: Arc::clone(&interval_ms),
            shutting_down: Arc::clone(&shutting_down),
        };

        let orchestrator = Self {
            session,
            command_tx,
            command_rx,
            event_tx,
            latest,
            auto_running,
            interval_ms,
            shutting_down,
            cycle_pending: Arc::new(AtomicBool::new(false)),
        };

        (orchestrator, handle)
    }

    /// Spawn the session worker and the scheduler.
    ///
    /// Join the returned handles after `OrchestratorHandle::shutdown`.
    pub fn start(self) -> Result<Vec<JoinHandle<()>>> {
        let scheduler = self.spawn_scheduler()?;
        let worker = self.spawn_worker()?;
        Ok(vec![worker, scheduler])
    }

    fn spawn_scheduler(&self) -> Result<JoinHandle<()>> {
        let command_tx = self.command_tx.clone();
        let auto_running = Arc::clone(&self.auto_running);
        let interval_ms = Arc::clone(&self.interval_ms);
        let shutting_down = Arc::clone(&self.shutting_down);
        let cycle_pending = Arc::clone(&self.cycle_pending);

        thread::Builder::new()
            .name("herald-scheduler".to_string())
            .spawn(move || {
                debug!("Scheduler started");
                while !shutting_down.load(Ordering::SeqCst) {
                    if !auto_running.load(Ordering::SeqCst) {
                        thread::sleep(SCHEDULER_STEP);
                        continue;
                    }

                    // Sleep one interval in small steps so stop and
                    // shutdown take effect promptly.
                    let interval = Duration::from_millis(interval_ms.load(Ordering::SeqCst));
                    let deadline = Instant::now() + interval;
                    while Instant::now() < deadline {
                        if shutting_down.load(Ordering::SeqCst)
                            || !auto_running.load(Ordering::SeqCst)
                        {
                            break;
                        }
                        thread::sleep(SCHEDULER_STEP.min(
                            deadline.saturating_duration_since(Instant::now()),
                        ));
                    }
                    if shutting_down.load(Ordering::SeqCst)
                        || !auto_running.load(Ordering::SeqCst)
                    {
                        continue;
                    }

                    // Never stack ticks behind a slow cycle: skip this one
                    // and let the next interval try again.
                    if cycle_pending.swap(true, Ordering::SeqCst) {
                        debug!("Previous cycle still running, delaying tick");
                    } else if command_tx
                        .send(OrchestratorCommand::RunCycle(CycleMode::Continuous))
                        .is_err()
                    {
                        break;
                    }
                }
                debug!("Scheduler stopped");
            })
            .map_err(|e| HeraldError::Channel(format!("Failed to spawn scheduler: {}", e)))
    }

    fn spawn_worker(self) -> Result<JoinHandle<()>> {
        let Orchestrator {
            mut session,
            command_rx,
            event_tx,
            latest,
            auto_running,
            cycle_pending,
            ..
        } = self;

        thread::Builder::new()
            .name("herald-session".to_string())
            .spawn(move || {
                info!("Session worker started");
                loop {
                    match command_rx.recv() {
                        Ok(OrchestratorCommand::RunCycle(mode)) => {
                            let result = session.run_cycle(mode);
                            *latest.lock() = Some(result.clone());
                            cycle_pending.store(false, Ordering::SeqCst);
                            Self::emit(&event_tx, OrchestratorEvent::CycleCompleted(result));
                        }
                        Ok(OrchestratorCommand::Configure(update)) => {
                            match session.configure(update) {
                                Ok(()) => {
                                    Self::emit(&event_tx, OrchestratorEvent::ConfigurationApplied)
                                }
                                Err(e) => {
                                    Self::emit(&event_tx, OrchestratorEvent::Error(e.to_string()))
                                }
                            }
                        }
                        Ok(OrchestratorCommand::StopSession) => {
                            auto_running.store(false, Ordering::SeqCst);
                            session.stop();
                            Self::emit(&event_tx, OrchestratorEvent::SessionStopped);
                        }
                        Ok(OrchestratorCommand::Shutdown) => {
                            session.stop();
                            Self::emit(&event_tx, OrchestratorEvent::Shutdown);
                            break;
                        }
                        Err(_) => {
                            warn!("Command channel disconnected");
                            session.stop();
                            break;
                        }
                    }
                }
                info!("Session worker stopped");
            })
            .map_err(|e| HeraldError::Channel(format!("Failed to spawn session worker: {}", e)))
    }

    fn emit(event_tx: &Sender<OrchestratorEvent>, event: OrchestratorEvent) {
        // Events are advisory; a full channel means the transport is not
        // draining and the latest-result slot still serves polling.
        if event_tx.try_send(event).is_err() {
            debug!("Event channel full, dropping event");
        }
    }
}
