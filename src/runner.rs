//! Threaded per-frame loop.
//!
//! A ticker thread fires at the target frame rate. Each tick tries to start a
//! detection; if the previous one is still in flight the tick is dropped
//! rather than queued. A single worker thread owns the [`FrameSource`], runs
//! detection, and feeds the result into the shared [`MeasurementSession`].
//! Stopping the loop joins both threads and closes the source before
//! returning, so no detection result reaches the session afterwards.
//! Starting a loop resumes the session, which clears any samples left over
//! from an earlier stream; tearing it down stops the session.

use crate::{
    landmarks::LandmarkSet,
    session::{MeasurementSession, SessionSnapshot},
    Error, Result,
};
use log::{debug, error, info, warn};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{self, Receiver, Sender},
    Arc, Mutex,
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Detector output for one camera frame
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorFrame {
    /// Zero or more detected faces
    pub faces: Vec<LandmarkSet>,
    /// Frame size in pixels
    pub width: f64,
    pub height: f64,
}

/// Camera plus landmark detector
pub trait FrameSource: Send {
    /// Detect faces on the latest camera frame; `Ok(None)` once the stream ended
    ///
    /// # Errors
    ///
    /// Returns an error if the frame could not be acquired or decoded
    fn next_frame(&mut self) -> Result<Option<DetectorFrame>>;

    /// Release the detector and camera
    fn close(&mut self) {}
}

/// Allows at most one detection in flight
#[derive(Debug, Default)]
pub struct DetectionGate {
    busy: AtomicBool,
}

/// Held while a detection runs; releases the gate on drop
#[derive(Debug)]
pub struct DetectionPermit {
    gate: Arc<DetectionGate>,
}

impl DetectionGate {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Take the gate if no detection is running
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>) -> Option<DetectionPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DetectionPermit { gate: Arc::clone(self) })
    }

    /// True while a permit is outstanding
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Drop for DetectionPermit {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
struct LoopCounters {
    ticks: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
}

/// Frame loop counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    /// Ticks fired
    pub ticks: u64,
    /// Detector results fed into the session
    pub processed: u64,
    /// Ticks skipped because a detection was in flight
    pub dropped: u64,
}

impl LoopCounters {
    fn snapshot(&self) -> LoopStats {
        LoopStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Running frame loop
pub struct FrameLoop {
    session: Arc<Mutex<MeasurementSession>>,
    running: Arc<AtomicBool>,
    counters: Arc<LoopCounters>,
    ticker: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
}

impl FrameLoop {
    /// Start ticking at `fps` and feeding `session`.
    ///
    /// The session is resumed first, so its smoothing window starts empty.
    /// Throttled snapshots are sent on `snapshots`; a disconnected receiver is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if `fps` is zero, the session lock is poisoned, or a
    /// thread cannot be spawned
    pub fn start(
        source: Box<dyn FrameSource>,
        session: Arc<Mutex<MeasurementSession>>,
        fps: u32,
        snapshots: Sender<SessionSnapshot>,
    ) -> Result<Self> {
        if fps == 0 {
            return Err(Error::FrameLoop("Frame rate must be greater than 0".to_string()));
        }
        session
            .lock()
            .map_err(|_| Error::FrameLoop("session lock poisoned".to_string()))?
            .resume();

        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(LoopCounters::default());
        let gate = DetectionGate::new();
        let (request_tx, request_rx) = mpsc::channel::<DetectionPermit>();

        let worker = {
            let session = Arc::clone(&session);
            let running = Arc::clone(&running);
            let counters = Arc::clone(&counters);
            thread::Builder::new()
                .name("pd-detector".to_string())
                .spawn(move || run_worker(source, request_rx, session, snapshots, running, counters))?
        };

        let ticker = {
            let running = Arc::clone(&running);
            let counters = Arc::clone(&counters);
            let interval = Duration::from_secs_f64(1.0 / f64::from(fps));
            thread::Builder::new()
                .name("pd-ticker".to_string())
                .spawn(move || run_ticker(interval, gate, request_tx, running, counters))?
        };

        info!("Frame loop started at {fps} fps");
        Ok(Self {
            session,
            running,
            counters,
            ticker: Some(ticker),
            worker: Some(worker),
        })
    }

    /// False once stopped or the source ran out of frames
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Counters so far
    #[must_use]
    pub fn stats(&self) -> LoopStats {
        self.counters.snapshot()
    }

    /// Halt ticking, wait for the in-flight detection, close the source, and
    /// stop the session
    ///
    /// # Errors
    ///
    /// Returns an error if a loop thread panicked or the session lock is poisoned
    pub fn stop(mut self) -> Result<LoopStats> {
        self.running.store(false, Ordering::Release);
        self.join_threads()
    }

    /// Block until the source runs out of frames, then tear down like [`stop`](Self::stop)
    ///
    /// # Errors
    ///
    /// Returns an error if a loop thread panicked or the session lock is poisoned
    pub fn wait(mut self) -> Result<LoopStats> {
        self.join_threads()
    }

    fn join_threads(&mut self) -> Result<LoopStats> {
        // Ticker first: it owns the request sender, so the worker sees a closed channel.
        if let Some(ticker) = self.ticker.take() {
            ticker
                .join()
                .map_err(|_| Error::FrameLoop("ticker thread panicked".to_string()))?;
        }
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| Error::FrameLoop("detector thread panicked".to_string()))?;
        }
        self.session
            .lock()
            .map_err(|_| Error::FrameLoop("session lock poisoned".to_string()))?
            .stop();
        let stats = self.counters.snapshot();
        info!(
            "Frame loop stopped: {} ticks, {} processed, {} dropped",
            stats.ticks, stats.processed, stats.dropped
        );
        Ok(stats)
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        if self.ticker.is_some() || self.worker.is_some() {
            self.running.store(false, Ordering::Release);
            if let Err(e) = self.join_threads() {
                error!("Frame loop teardown failed: {e}");
            }
        }
    }
}

fn run_ticker(
    interval: Duration,
    gate: Arc<DetectionGate>,
    requests: Sender<DetectionPermit>,
    running: Arc<AtomicBool>,
    counters: Arc<LoopCounters>,
) {
    let mut next_tick = Instant::now();
    while running.load(Ordering::Acquire) {
        counters.ticks.fetch_add(1, Ordering::Relaxed);
        match gate.try_acquire() {
            Some(permit) => {
                if requests.send(permit).is_err() {
                    break;
                }
            }
            None => {
                counters.dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Detection still in flight, frame dropped");
            }
        }

        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            next_tick = now;
        }
    }
}

fn run_worker(
    mut source: Box<dyn FrameSource>,
    requests: Receiver<DetectionPermit>,
    session: Arc<Mutex<MeasurementSession>>,
    snapshots: Sender<SessionSnapshot>,
    running: Arc<AtomicBool>,
    counters: Arc<LoopCounters>,
) {
    while let Ok(permit) = requests.recv() {
        if !running.load(Ordering::Acquire) {
            break;
        }

        match source.next_frame() {
            Ok(Some(frame)) => {
                // Stop may have been requested while the detector was busy.
                if !running.load(Ordering::Acquire) {
                    break;
                }
                let Ok(mut session) = session.lock() else {
                    error!("Session lock poisoned, stopping frame loop");
                    running.store(false, Ordering::Release);
                    break;
                };
                session.process_frame(&frame.faces, frame.width, frame.height);
                counters.processed.fetch_add(1, Ordering::Relaxed);
                if let Some(snapshot) = session.poll_snapshot() {
                    let _ = snapshots.send(snapshot);
                }
            }
            Ok(None) => {
                info!("Frame source exhausted");
                running.store(false, Ordering::Release);
                break;
            }
            Err(e) => warn!("Detection failed, frame skipped: {e}"),
        }
        drop(permit);
    }

    source.close();
    debug!("Frame source closed");
}
