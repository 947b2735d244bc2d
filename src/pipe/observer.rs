//! Brick state notifications for rendering adapters.
//!
//! The pipe reports brick lifecycle and bucket changes to an optional
//! [`BrickObserver`]. [`ChannelObserver`] forwards them over a crossbeam
//! channel so a frontend living on another thread can drain them.

use crate::chain::Chain;
use crate::pipe::brick::Brick;
use crate::pipe::error::BrickError;
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Something that happened to a brick.
#[derive(Debug, Clone, PartialEq)]
pub enum BrickEvent {
    Attached,
    Detached,
    SettingChanged,
    TranslationFinished { is_encode: bool },
    /// Translation or view failed; recoverable errors included.
    TranslationFailed(BrickError),
    Viewed,
}

#[cfg_attr(test, mockall::automock)]
pub trait BrickObserver {
    fn on_brick_event(&self, brick: &Brick, event: &BrickEvent);

    fn on_content_changed(&self, _bucket: usize, _content: &Chain) {}
}

/// Messages sent to the rendering thread.
#[derive(Debug, Clone)]
pub enum ObserverMessage {
    Brick {
        name: String,
        title: String,
        event: BrickEvent,
    },
    Content {
        bucket: usize,
        content: Chain,
    },
}

/// Channel capacity for observer messages.
const MSG_CHANNEL_CAPACITY: usize = 1_024;

/// Forwards observer notifications to a crossbeam channel.
///
/// Messages are dropped when the channel is full or the receiver is gone.
pub struct ChannelObserver {
    msg_tx: Sender<ObserverMessage>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end for the consumer.
    pub fn new() -> (Self, Receiver<ObserverMessage>) {
        let (msg_tx, msg_rx) = bounded(MSG_CHANNEL_CAPACITY);
        (Self { msg_tx }, msg_rx)
    }

    fn send(&self, msg: ObserverMessage) {
        match self.msg_tx.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => tracing::warn!("observer channel full, dropping message"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl BrickObserver for ChannelObserver {
    fn on_brick_event(&self, brick: &Brick, event: &BrickEvent) {
        self.send(ObserverMessage::Brick {
            name: brick.name().to_owned(),
            title: brick.title(),
            event: event.clone(),
        });
    }

    fn on_content_changed(&self, bucket: usize, content: &Chain) {
        self.send(ObserverMessage::Content {
            bucket,
            content: content.clone(),
        });
    }
}

/// Drain all pending messages.
pub fn drain(msg_rx: &Receiver<ObserverMessage>) -> Vec<ObserverMessage> {
    let mut msgs = Vec::new();
    while let Ok(msg) = msg_rx.try_recv() {
        msgs.push(msg);
    }
    msgs
}
