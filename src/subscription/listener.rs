/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 18/10/26
******************************************************************************/

use crate::subscription::Heartbeat;
use crate::utils::SubscriptionError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Interface to be implemented to listen to Subscription events comprehending notifications
/// of run start and end, primary payloads, heartbeats and errors.
///
/// Events for these listeners are dispatched by the subscription's background task, not by
/// the task that called `Subscription::start()`. This means that, upon reception of an event,
/// the caller may have moved on, and a listener that updates shared state must synchronize.
/// Within a single run, all notifications are delivered in order by that one task:
/// `on_started` first, then any number of `on_event`, `on_heartbeat` and `on_error`, and
/// `on_stopped` last.
///
/// Every method has an empty default implementation, so a listener only overrides the
/// notifications it cares about.
pub trait SubscriptionListener<T>: Send + Sync {
    /// Event handler called once at the beginning of each run, before any frame is read.
    fn on_started(&self) {}

    /// Event handler called each time a primary frame has been received and decoded.
    ///
    /// # Parameters
    ///
    /// - `event`: the decoded payload of the frame.
    fn on_event(&self, _event: &T) {}

    /// Event handler called each time a heartbeat frame has been received and decoded.
    ///
    /// Heartbeats are informational: the subscription keeps running regardless of how
    /// long it has been since the previous one.
    ///
    /// # Parameters
    ///
    /// - `heartbeat`: the decoded heartbeat, carrying the timeout announced by the server.
    fn on_heartbeat(&self, _heartbeat: &Heartbeat) {}

    /// Event handler called when the run hits an error.
    ///
    /// A payload that cannot be decoded is reported here and the run continues with the next
    /// frame. A failure of the underlying stream is reported here as well, and ends the run.
    /// Cancellation requested through `Subscription::stop()` is never reported as an error.
    ///
    /// # Parameters
    ///
    /// - `error`: the error; see `SubscriptionError::is_fatal()`.
    fn on_error(&self, _error: &SubscriptionError) {}

    /// Event handler called exactly once at the end of each run, whatever ended it. No further
    /// notification is delivered for that run afterwards.
    fn on_stopped(&self) {}
}

/// Notification forwarded by [`ChannelSubscriptionListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent<T> {
    /// A run started
    Started,
    /// A primary payload was received
    Event(T),
    /// A heartbeat was received
    Heartbeat(Heartbeat),
    /// An error was reported
    Error {
        /// Whether the error ended the run
        fatal: bool,
        /// Description of the error
        message: String,
    },
    /// A run ended
    Stopped,
}

/// A subscription listener that forwards every notification to a tokio mpsc channel.
///
/// This listener allows decoupling the reception of events from their processing,
/// enabling asynchronous consumption of events by other tasks or components.
///
/// # Examples
///
/// ```ignore
/// use modality_events::subscription::{ChannelSubscriptionListener, SubscriptionEvent};
///
/// let (listener, mut rx) = ChannelSubscriptionListener::create_channel();
/// subscription.add_listener(Box::new(listener));
///
/// tokio::spawn(async move {
///     while let Some(event) = rx.recv().await {
///         if let SubscriptionEvent::Event(data) = event {
///             println!("Received: {:?}", data);
///         }
///     }
/// });
/// ```
pub struct ChannelSubscriptionListener<T> {
    sender: mpsc::UnboundedSender<SubscriptionEvent<T>>,
}

impl<T> ChannelSubscriptionListener<T> {
    pub fn new(sender: mpsc::UnboundedSender<SubscriptionEvent<T>>) -> Self {
        Self { sender }
    }

    pub fn create_channel() -> (Self, mpsc::UnboundedReceiver<SubscriptionEvent<T>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn forward(&self, event: SubscriptionEvent<T>) {
        // The receiver may have been dropped, which is acceptable
        let _ = self.sender.send(event);
    }
}

impl<T: Clone + Send> SubscriptionListener<T> for ChannelSubscriptionListener<T> {
    fn on_started(&self) {
        self.forward(SubscriptionEvent::Started);
    }

    fn on_event(&self, event: &T) {
        self.forward(SubscriptionEvent::Event(event.clone()));
    }

    fn on_heartbeat(&self, heartbeat: &Heartbeat) {
        self.forward(SubscriptionEvent::Heartbeat(*heartbeat));
    }

    fn on_error(&self, error: &SubscriptionError) {
        self.forward(SubscriptionEvent::Error {
            fatal: error.is_fatal(),
            message: error.to_string(),
        });
    }

    fn on_stopped(&self) {
        self.forward(SubscriptionEvent::Stopped);
    }
}

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;
type Notification = Arc<dyn Fn() + Send + Sync>;

/// Fans notifications out to registered closures and listeners.
///
/// Cloned into each run, so registrations made while a run is active take effect
/// from the next run on.
pub(crate) struct Dispatcher<T> {
    on_event: Vec<Callback<T>>,
    on_heartbeat: Vec<Callback<Heartbeat>>,
    on_error: Vec<Callback<SubscriptionError>>,
    on_started: Vec<Notification>,
    on_stopped: Vec<Notification>,
    listeners: Vec<Arc<dyn SubscriptionListener<T>>>,
}

impl<T> Clone for Dispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            on_event: self.on_event.clone(),
            on_heartbeat: self.on_heartbeat.clone(),
            on_error: self.on_error.clone(),
            on_started: self.on_started.clone(),
            on_stopped: self.on_stopped.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<T> Default for Dispatcher<T> {
    fn default() -> Self {
        Self {
            on_event: Vec::new(),
            on_heartbeat: Vec::new(),
            on_error: Vec::new(),
            on_started: Vec::new(),
            on_stopped: Vec::new(),
            listeners: Vec::new(),
        }
    }
}

impl<T> Dispatcher<T> {
    pub(crate) fn add_event(&mut self, callback: impl Fn(&T) + Send + Sync + 'static) {
        self.on_event.push(Arc::new(callback));
    }

    pub(crate) fn add_heartbeat(&mut self, callback: impl Fn(&Heartbeat) + Send + Sync + 'static) {
        self.on_heartbeat.push(Arc::new(callback));
    }

    pub(crate) fn add_error(
        &mut self,
        callback: impl Fn(&SubscriptionError) + Send + Sync + 'static,
    ) {
        self.on_error.push(Arc::new(callback));
    }

    pub(crate) fn add_started(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_started.push(Arc::new(callback));
    }

    pub(crate) fn add_stopped(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.on_stopped.push(Arc::new(callback));
    }

    pub(crate) fn add_listener(&mut self, listener: Box<dyn SubscriptionListener<T>>) {
        self.listeners.push(Arc::from(listener));
    }

    pub(crate) fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn started(&self) {
        self.on_started.iter().for_each(|callback| callback());
        self.listeners.iter().for_each(|l| l.on_started());
    }

    pub(crate) fn event(&self, event: &T) {
        self.on_event.iter().for_each(|callback| callback(event));
        self.listeners.iter().for_each(|l| l.on_event(event));
    }

    pub(crate) fn heartbeat(&self, heartbeat: &Heartbeat) {
        self.on_heartbeat.iter().for_each(|callback| callback(heartbeat));
        self.listeners.iter().for_each(|l| l.on_heartbeat(heartbeat));
    }

    pub(crate) fn error(&self, error: &SubscriptionError) {
        self.on_error.iter().for_each(|callback| callback(error));
        self.listeners.iter().for_each(|l| l.on_error(error));
    }

    pub(crate) fn stopped(&self) {
        self.on_stopped.iter().for_each(|callback| callback());
        self.listeners.iter().for_each(|l| l.on_stopped());
    }
}
