/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 16/5/25
******************************************************************************/
mod config;
mod heartbeat;
mod listener;
mod model;

pub use config::SubscriptionConfig;
pub use heartbeat::{Heartbeat, HeartbeatMonitor, Liveness};
pub use listener::{ChannelSubscriptionListener, SubscriptionEvent, SubscriptionListener};
pub use model::{Subscription, SubscriptionState};
