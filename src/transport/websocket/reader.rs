//! Frame reading logic for websocket transport

use std::sync::atomic::Ordering;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{ChatError, Result};

use super::transport::WebSocketTransport;

impl WebSocketTransport {
    /// Read text frames from the websocket
    ///
    /// This method spawns a background task that forwards text payloads and
    /// ends when the peer closes the connection or a read fails.
    ///
    /// # Returns
    /// A receiver that yields text payloads or errors
    pub(super) fn read_messages_impl(&mut self) -> mpsc::UnboundedReceiver<Result<String>> {
        let (tx, rx) = mpsc::unbounded_channel();

        let stream = self.stream.take();
        let ready = self.ready.clone();
        let max_frame_size = self.max_frame_size;

        let task = tokio::spawn(async move {
            let Some(mut stream) = stream else {
                let _ = tx.send(Err(ChatError::connection(
                    "Not connected - stream not available",
                )));
                return;
            };

            while let Some(next) = stream.next().await {
                let text = match next {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            log::debug!("dropping non-utf8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        log::debug!("peer closed websocket: {frame:?}");
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let _ = tx.send(Err(ChatError::transport(format!(
                            "websocket read failed: {e}"
                        ))));
                        break;
                    }
                };

                if text.len() > max_frame_size {
                    log::warn!(
                        "dropping inbound frame of {} bytes (limit {max_frame_size})",
                        text.len()
                    );
                    continue;
                }

                if tx.send(Ok(text)).is_err() {
                    // Receiver dropped, stop reading
                    break;
                }
            }

            ready.store(false, Ordering::SeqCst);
        });

        // Store task handle for cleanup
        self.reader_task = Some(task);

        rx
    }
}
