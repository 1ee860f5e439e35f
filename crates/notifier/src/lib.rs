pub mod channels;
pub mod worker;

pub use channels::{ChannelError, ChannelSender, ResendChannel, SlackChannel, TwilioChannel};
pub use worker::{CycleReport, DeliveryOutcome, DeliveryWorker};
