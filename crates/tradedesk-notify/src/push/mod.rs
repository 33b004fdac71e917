//! Background delivery channel: worker registration, push subscription
//! lifecycle, and native display.

pub mod channel;
pub mod subscription;

pub use channel::{BackgroundDelivery, WorkerHandle};
pub use subscription::{PushSubscription, SubscriptionKeys};
