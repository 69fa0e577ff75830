use bytes::Bytes;
use tokio::sync::mpsc;

use crate::source::EncoderError;

/// Everything a session hands to its consumer, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A ready-to-send chunk: the file header, or one framed tag.
    Output(Bytes),
    /// The coded picture size changed.
    StreamSizeChanged { width: u32, height: u32 },
    EncoderError(EncoderError),
}

/// Receives the byte stream and notifications of a session.
///
/// Called on the session task. Implementations must return quickly;
/// anything that does I/O should forward the event to its own task.
pub trait StreamListener: Send + 'static {
    fn on_event(&mut self, event: StreamEvent);
}

impl StreamListener for mpsc::UnboundedSender<StreamEvent> {
    fn on_event(&mut self, event: StreamEvent) {
        // the consumer hung up; nothing left to deliver to
        let _ = self.send(event);
    }
}
