/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

//! The subscription engine.
//!
//! A [`Subscription`] owns an open event stream and, while running, one tokio
//! task that reads frames from it and dispatches them. The caller's side only
//! ever touches the cancellation token, the state flag, the join handle and
//! the stream closer.

use crate::protocol::{
    FrameKind, FrameParser, JsonDecoder, LineRead, LineReader, PayloadDecoder, StreamCloser,
};
use crate::subscription::listener::Dispatcher;
use crate::subscription::{
    Heartbeat, HeartbeatMonitor, Liveness, SubscriptionConfig, SubscriptionListener,
};
use crate::utils::{Result, SubscriptionError};
use futures_util::FutureExt;
use serde::de::DeserializeOwned;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Lifecycle state of a [`Subscription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SubscriptionState {
    /// Created, never started
    Idle = 0,
    /// A background task is reading the stream
    Running = 1,
    /// `stop()` is waiting for the background task
    Stopping = 2,
    /// The last run has ended
    Stopped = 3,
}

impl SubscriptionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => SubscriptionState::Idle,
            1 => SubscriptionState::Running,
            2 => SubscriptionState::Stopping,
            _ => SubscriptionState::Stopped,
        }
    }
}

#[derive(Debug, Default)]
struct SharedState {
    state: AtomicU8,
    run: AtomicU64,
}

impl SharedState {
    fn get(&self) -> SubscriptionState {
        SubscriptionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: SubscriptionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves from `from` to `to`, leaving any other state untouched.
    fn transition(&self, from: SubscriptionState, to: SubscriptionState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn begin_run(&self, id: u64) {
        self.run.store(id, Ordering::Release);
        self.set(SubscriptionState::Running);
    }

    /// Marks run `id` as ended, unless a newer run has begun since.
    fn end_run(&self, id: u64) {
        if self.run.load(Ordering::Acquire) == id {
            self.set(SubscriptionState::Stopped);
        }
    }
}

/// Holds the line reader between runs. The running task takes it out and
/// puts it back when the stream ended on its own.
type ReaderSlot = Arc<Mutex<Option<LineReader>>>;

fn lock_slot(slot: &ReaderSlot) -> MutexGuard<'_, Option<LineReader>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The latest run. Kept after `stop()` so a task that outlived the stop
/// timeout still blocks `start()` until it has wound down.
struct ActiveRun {
    id: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Why a run's read loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunEnd {
    EndOfStream,
    Cancelled,
    StreamFailed,
}

/// A long-lived subscription to an event stream.
///
/// Created in the [`SubscriptionState::Idle`] state with [`Subscription::open`].
/// [`start`](Subscription::start) spawns the background task,
/// [`stop`](Subscription::stop) cancels it, waits a bounded time for it to exit
/// and closes the stream. A stopped subscription may be started again; since
/// its stream is closed, the new run ends right away.
///
/// # Examples
///
/// ```ignore
/// use modality_events::subscription::Subscription;
/// use modality_events::types::DeviceEventData;
///
/// let mut subscription = Subscription::<DeviceEventData>::open_json(stream, |data| {
///     println!("{:?} {}", data.action, data.device_info.device_id);
/// })
/// .on_heartbeat(|hb| println!("heartbeat timeout: {}ms", hb.timeout_millis))
/// .on_stopped(|| println!("stopped"));
///
/// subscription.start()?;
/// // ...
/// subscription.stop().await;
/// ```
pub struct Subscription<T> {
    decoder: Arc<dyn PayloadDecoder<T>>,
    dispatcher: Dispatcher<T>,
    config: SubscriptionConfig,
    reader: ReaderSlot,
    closer: StreamCloser,
    state: Arc<SharedState>,
    monitor: Arc<HeartbeatMonitor>,
    run: Option<ActiveRun>,
    runs: u64,
}

impl<T: Send + 'static> Subscription<T> {
    /// Creates a subscription over an open stream.
    ///
    /// `decoder` turns the payload of each primary frame into a `T`, and
    /// `on_event` receives every decoded value. Nothing is read until
    /// [`start`](Subscription::start) is called.
    pub fn open<R, D, F>(stream: R, decoder: D, on_event: F) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        D: PayloadDecoder<T> + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let config = SubscriptionConfig::default();
        let reader = LineReader::new(stream).with_max_line_length(config.max_line_length);
        let closer = reader.closer();
        let mut dispatcher = Dispatcher::default();
        dispatcher.add_event(on_event);

        Self {
            decoder: Arc::new(decoder),
            dispatcher,
            monitor: Arc::new(HeartbeatMonitor::new(config.stale_grace)),
            config,
            reader: Arc::new(Mutex::new(Some(reader))),
            closer,
            state: Arc::new(SharedState::default()),
            run: None,
            runs: 0,
        }
    }

    /// Replaces the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::InvalidConfig`] if `config` does not validate,
    /// or [`SubscriptionError::AlreadyRunning`] while a run is active.
    pub fn with_config(mut self, config: SubscriptionConfig) -> Result<Self> {
        config.validate()?;
        if self.run_active() {
            return Err(SubscriptionError::AlreadyRunning);
        }
        if let Some(reader) = lock_slot(&self.reader).as_mut() {
            reader.set_max_line_length(config.max_line_length);
        }
        self.monitor = Arc::new(HeartbeatMonitor::new(config.stale_grace));
        self.config = config;
        Ok(self)
    }

    /// Registers an additional callback for primary events.
    #[must_use]
    pub fn on_event(mut self, callback: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.dispatcher.add_event(callback);
        self
    }

    /// Registers a callback for heartbeat frames.
    #[must_use]
    pub fn on_heartbeat(mut self, callback: impl Fn(&Heartbeat) + Send + Sync + 'static) -> Self {
        self.dispatcher.add_heartbeat(callback);
        self
    }

    /// Registers a callback invoked when a run starts.
    #[must_use]
    pub fn on_started(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.dispatcher.add_started(callback);
        self
    }

    /// Registers a callback invoked when a run ends.
    #[must_use]
    pub fn on_stopped(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.dispatcher.add_stopped(callback);
        self
    }

    /// Registers a callback for run errors.
    #[must_use]
    pub fn on_error(
        mut self,
        callback: impl Fn(&SubscriptionError) + Send + Sync + 'static,
    ) -> Self {
        self.dispatcher.add_error(callback);
        self
    }

    /// Adds a listener. Listeners added while a run is active are notified
    /// from the next run on.
    pub fn add_listener(&mut self, listener: Box<dyn SubscriptionListener<T>>) {
        self.dispatcher.add_listener(listener);
    }

    /// Current lifecycle state.
    ///
    /// After a `stop()` whose timeout elapsed this stays
    /// [`SubscriptionState::Stopping`] until the background task has delivered
    /// its stopped notification.
    pub fn state(&self) -> SubscriptionState {
        self.state.get()
    }

    /// Returns `true` while a background task is reading the stream.
    pub fn is_running(&self) -> bool {
        self.state.get() == SubscriptionState::Running
    }

    /// Returns `true` once the stream has been closed.
    pub fn is_stream_closed(&self) -> bool {
        self.closer.is_closed()
    }

    /// Liveness information gathered during the current or last run.
    pub fn liveness(&self) -> Liveness {
        self.monitor.snapshot()
    }

    /// Active configuration.
    pub fn config(&self) -> &SubscriptionConfig {
        &self.config
    }

    /// Starts a run on a new background task and returns immediately.
    ///
    /// # Errors
    ///
    /// - [`SubscriptionError::AlreadyRunning`] if the previous run has not
    ///   delivered its stopped notification yet, including a run whose task
    ///   outlived the `stop()` timeout.
    /// - [`SubscriptionError::NoRuntime`] if called outside a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.run_active() {
            warn!("Previous subscription run is still active, refusing to start");
            return Err(SubscriptionError::AlreadyRunning);
        }

        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| SubscriptionError::NoRuntime)?;

        self.runs += 1;
        let id = self.runs;
        let token = CancellationToken::new();
        let guard = StopGuard::new(id, self.dispatcher.clone(), Arc::clone(&self.state));
        let task = RunTask {
            id,
            decoder: Arc::clone(&self.decoder),
            heartbeat_decoder: JsonDecoder::new(),
            dispatcher: self.dispatcher.clone(),
            monitor: Arc::clone(&self.monitor),
            reader: Arc::clone(&self.reader),
            parser: self.config.frame_parser(),
            token: token.clone(),
        };

        self.state.begin_run(id);
        let handle = runtime.spawn(task.run(guard));
        info!(
            "Subscription run {} started with {} listener(s)",
            id,
            self.dispatcher.listener_count()
        );

        self.run = Some(ActiveRun { id, token, handle });
        Ok(())
    }

    /// Stops the current run and closes the stream.
    ///
    /// Signals cancellation, waits at most `stop_timeout` for the background task
    /// to exit, then closes the stream whether or not it did. A task still busy
    /// after the timeout finishes on its own, reading nothing more, and
    /// `start()` is refused until it has. Calling `stop()` without an active
    /// run, or a second time, does nothing.
    pub async fn stop(&mut self) {
        let stop_timeout = self.config.stop_timeout;
        let Some(run) = self.run.as_mut() else {
            debug!("stop() called without an active run");
            return;
        };
        if run.token.is_cancelled() {
            debug!("Subscription run {} already stopped", run.id);
            return;
        }

        self.state
            .transition(SubscriptionState::Running, SubscriptionState::Stopping);
        run.token.cancel();

        let exited = match tokio::time::timeout(stop_timeout, &mut run.handle).await {
            Ok(Ok(())) => {
                debug!("Subscription run {} exited", run.id);
                true
            }
            Ok(Err(err)) => {
                warn!("Subscription run {} ended abnormally: {}", run.id, err);
                true
            }
            Err(_) => {
                warn!(
                    "Subscription run {} did not exit within {:?}, closing the stream under it",
                    run.id, stop_timeout
                );
                run.handle.abort();
                false
            }
        };

        self.close_stream();
        if exited {
            self.state.set(SubscriptionState::Stopped);
        }
    }

    /// State turns `Stopped` only after a run delivered every notification,
    /// so what may remain of its task is returning.
    fn run_active(&self) -> bool {
        self.run.as_ref().is_some_and(|run| {
            !run.handle.is_finished() && self.state.get() != SubscriptionState::Stopped
        })
    }
}

impl<T> Subscription<T> {
    fn close_stream(&self) {
        lock_slot(&self.reader).take();
        if self.closer.close() {
            info!("Event stream closed");
        }
    }
}

impl<T: DeserializeOwned + Send + 'static> Subscription<T> {
    /// Creates a subscription whose primary payloads are JSON.
    pub fn open_json<R, F>(stream: R, on_event: F) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self::open(stream, JsonDecoder::<T>::new(), on_event)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(run) = &self.run
            && !run.token.is_cancelled()
        {
            debug!("Subscription dropped while run {} active, cancelling", run.id);
            run.token.cancel();
        }
        self.close_stream();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("state", &self.state.get())
            .field("runs", &self.runs)
            .field("stream_closed", &self.closer.is_closed())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Pairs the started and stopped notifications of one run. Created before the
/// task is spawned, so the run's state is settled even if the task is dropped
/// before it ever runs.
struct StopGuard<T> {
    id: u64,
    dispatcher: Dispatcher<T>,
    state: Arc<SharedState>,
    announced: bool,
    done: bool,
}

impl<T> StopGuard<T> {
    fn new(id: u64, dispatcher: Dispatcher<T>, state: Arc<SharedState>) -> Self {
        Self {
            id,
            dispatcher,
            state,
            announced: false,
            done: false,
        }
    }

    /// Delivers the started notification. Returns `false` if a callback panicked.
    fn announce(&mut self) -> bool {
        self.announced = true;
        let delivered = catch_unwind(AssertUnwindSafe(|| self.dispatcher.started())).is_ok();
        if !delivered {
            error!(
                "Subscription run {}: a started callback panicked, ending the run",
                self.id
            );
        }
        delivered
    }

    fn finish(mut self) {
        self.notify();
    }

    fn notify(&mut self) {
        if self.done {
            return;
        }
        self.done = true;

        if self.announced && !std::thread::panicking() {
            info!("Subscription run {} stopped", self.id);
            if catch_unwind(AssertUnwindSafe(|| self.dispatcher.stopped())).is_err() {
                error!("Subscription run {}: a stopped callback panicked", self.id);
            }
        } else {
            debug!("Subscription run {} ended without notifications", self.id);
        }
        self.state.end_run(self.id);
    }
}

impl<T> Drop for StopGuard<T> {
    fn drop(&mut self) {
        self.notify();
    }
}

/// Everything one run needs, moved into the background task.
struct RunTask<T> {
    id: u64,
    decoder: Arc<dyn PayloadDecoder<T>>,
    heartbeat_decoder: JsonDecoder<Heartbeat>,
    dispatcher: Dispatcher<T>,
    monitor: Arc<HeartbeatMonitor>,
    reader: ReaderSlot,
    parser: FrameParser,
    token: CancellationToken,
}

impl<T: Send + 'static> RunTask<T> {
    async fn run(mut self, mut guard: StopGuard<T>) {
        self.monitor.reset();
        if !guard.announce() {
            guard.finish();
            return;
        }

        let taken = lock_slot(&self.reader).take();
        let Some(mut reader) = taken else {
            warn!("Subscription run {}: stream already closed", self.id);
            guard.finish();
            return;
        };

        let outcome = AssertUnwindSafe(self.read_frames(&mut reader))
            .catch_unwind()
            .await;

        match outcome {
            Ok(end) => debug!("Subscription run {} read loop ended: {:?}", self.id, end),
            Err(_) => error!(
                "Subscription run {}: a callback panicked, ending the run",
                self.id
            ),
        }

        if !self.token.is_cancelled() {
            *lock_slot(&self.reader) = Some(reader);
        }

        guard.finish();
    }

    async fn read_frames(&mut self, reader: &mut LineReader) -> RunEnd {
        loop {
            if self.token.is_cancelled() {
                return RunEnd::Cancelled;
            }

            let line = match reader.next_line(&self.token).await {
                Ok(LineRead::Line(line)) => line,
                Ok(LineRead::EndOfStream) => {
                    if self.parser.has_pending() {
                        debug!("Stream ended in the middle of a frame");
                    }
                    return RunEnd::EndOfStream;
                }
                Ok(LineRead::Cancelled) => return RunEnd::Cancelled,
                Err(err) => {
                    error!("Subscription run {}: {}", self.id, err);
                    self.dispatcher.error(&err);
                    return RunEnd::StreamFailed;
                }
            };
            self.monitor.record_line();

            let frame = match self.parser.push_line(&line) {
                Ok(Some(frame)) => frame,
                Ok(None) => continue,
                Err(reason) => {
                    // Dropped without telling the consumer
                    debug!("Subscription run {}: dropping frame: {}", self.id, reason);
                    self.monitor.record_dropped();
                    continue;
                }
            };
            self.monitor.record_frame();
            trace!("{} frame: {}", frame.kind, frame.raw_payload);

            match frame.kind {
                FrameKind::Data => match self.decoder.decode(&frame.raw_payload) {
                    Ok(event) => self.dispatcher.event(&event),
                    Err(source) => self.report_decode_error(frame.kind, source),
                },
                FrameKind::Heartbeat => match self.heartbeat_decoder.decode(&frame.raw_payload) {
                    Ok(heartbeat) => {
                        self.monitor.record_heartbeat(&heartbeat);
                        self.dispatcher.heartbeat(&heartbeat);
                    }
                    Err(source) => self.report_decode_error(frame.kind, source),
                },
                FrameKind::Unknown => {}
            }
        }
    }

    fn report_decode_error(&self, kind: FrameKind, source: crate::utils::DecodeError) {
        let err = SubscriptionError::PayloadDecode { kind, source };
        warn!("Subscription run {}: {}", self.id, err);
        self.dispatcher.error(&err);
    }
}
