//! Lifecycle management for websocket transport (connect, close)

use std::sync::atomic::Ordering;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{ChatError, Result};

use super::config::CLOSE_FLUSH_TIMEOUT;
use super::transport::WebSocketTransport;

impl WebSocketTransport {
    /// Connect to the endpoint
    ///
    /// Performs the websocket handshake, splits the stream and spawns the
    /// writer task that owns the sink.
    ///
    /// # Errors
    /// Returns error if the handshake fails or exceeds the connect timeout
    pub(super) async fn connect_impl(&mut self) -> Result<()> {
        if self.is_connected_or_consumed() {
            return Ok(());
        }

        let handshake = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _response) = tokio::time::timeout(self.connect_timeout, handshake)
            .await
            .map_err(|_| {
                ChatError::timeout(format!(
                    "handshake did not complete within {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|e| ChatError::connection(format!("websocket handshake failed: {e}")))?;

        let (mut sink, stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        let ready = self.ready.clone();
        let writer_task = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let is_close = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    log::debug!("websocket write failed: {e}");
                    ready.store(false, Ordering::SeqCst);
                    break;
                }
                if is_close {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        self.stream = Some(stream);
        self.outbound_tx = Some(outbound_tx);
        self.writer_task = Some(writer_task);
        self.ready.store(true, Ordering::SeqCst);

        log::debug!(
            "websocket connected to {}{}",
            self.url.host_str().unwrap_or_default(),
            self.url.path()
        );
        Ok(())
    }

    fn is_connected_or_consumed(&self) -> bool {
        self.outbound_tx.is_some()
    }

    /// Close the transport and clean up resources
    ///
    /// Sends a close frame, gives the writer a short window to flush it and
    /// then stops both background tasks.
    ///
    /// # Errors
    /// Currently returns Ok in all cases, but is Result for API consistency
    pub(super) async fn close_impl(&mut self) -> Result<()> {
        self.ready.store(false, Ordering::SeqCst);

        if let Some(tx) = self.outbound_tx.take() {
            let _ = tx.send(Message::Close(None));
        }

        if let Some(task) = self.writer_task.take()
            && tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, task).await.is_err()
        {
            log::debug!("websocket writer did not flush close frame in time");
        }

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }

        self.stream = None;
        Ok(())
    }

    /// Handle Drop cleanup
    pub(super) fn drop_impl(&mut self) {
        self.ready.store(false, Ordering::SeqCst);

        // Dropping the sender ends the writer loop, which closes the sink.
        drop(self.outbound_tx.take());

        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}
