//! Inbound control endpoint.

use std::io;

use tokio::net::UdpSocket;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use vireo_events::{ControlMessage, MessageSource};

use crate::codec;

const MAX_DATAGRAM: usize = 1536;

/// Receives control datagrams on a UDP port and queues the decoded
/// messages for per-tick draining.
///
/// The socket is read on a spawned task; the queue is unbounded so a slow
/// tick never drops messages. Malformed datagrams are logged and dropped.
pub struct ControlListener {
    port: u16,
    bound_port: Option<u16>,
    queue_tx: UnboundedSender<ControlMessage>,
    queue_rx: UnboundedReceiver<ControlMessage>,
    task: Option<JoinHandle<()>>,
}

impl ControlListener {
    pub fn new(port: u16) -> Self {
        let (queue_tx, queue_rx) = unbounded_channel();
        Self {
            port,
            bound_port: None,
            queue_tx,
            queue_rx,
            task: None,
        }
    }

    /// Port messages are (or will be) received on. While listening this is
    /// the actually bound port, which matters when configured as 0.
    pub fn port(&self) -> u16 {
        self.bound_port.unwrap_or(self.port)
    }

    pub fn is_listening(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Bind the socket and start receiving. Idempotent while listening.
    pub async fn start(&mut self) -> io::Result<()> {
        if self.is_listening() {
            return Ok(());
        }

        let socket = UdpSocket::bind(("0.0.0.0", self.port)).await?;
        self.bound_port = Some(socket.local_addr()?.port());

        let tx = self.queue_tx.clone();
        self.task = Some(tokio::spawn(async move {
            let mut buf = vec![0u8; MAX_DATAGRAM];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((len, from)) => match codec::decode(&buf[..len]) {
                        Ok(msg) => {
                            debug!(target: "control", "received {} from {from}", msg.addr);
                            if tx.send(msg).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(target: "control", "dropping malformed datagram from {from}: {e}");
                        }
                    },
                    Err(e) => {
                        error!(target: "control", "receive failed: {e}");
                        break;
                    }
                }
            }
        }));

        info!(target: "control", "listening on port {}", self.port());
        Ok(())
    }

    /// Stop receiving. Already-queued messages remain drainable.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!(target: "control", "stopped listening");
        }
        self.bound_port = None;
    }

    /// Change the listen port, rebinding if currently listening.
    /// Ports below 1024 are rejected; setting the current port is a no-op.
    pub async fn set_port(&mut self, port: u16) -> io::Result<()> {
        if port < 1024 {
            warn!(target: "control", "listen port must be >= 1024");
            return Ok(());
        }
        if port == self.port {
            return Ok(());
        }
        self.port = port;
        if self.is_listening() {
            self.stop();
            self.start().await?;
        }
        Ok(())
    }
}

impl Drop for ControlListener {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl MessageSource for ControlListener {
    fn drain(&mut self) -> Vec<ControlMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.queue_rx.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::ControlSender;
    use std::time::Duration;
    use vireo_events::ControlValue;

    #[tokio::test]
    async fn test_listener_receives_sent_message() {
        let mut listener = ControlListener::new(0);
        listener.start().await.unwrap();
        let port = listener.port();
        assert!(listener.is_listening());

        let sender = ControlSender::new("127.0.0.1", port).await.unwrap();
        let msg = ControlMessage::new("/vireo/reload").with_arg(ControlValue::Int32(1));
        sender.send(&msg).await.unwrap();

        let mut received = Vec::new();
        for _ in 0..50 {
            received.extend(listener.drain());
            if !received.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(received, vec![msg]);
    }

    #[tokio::test]
    async fn test_set_port_rejects_privileged() {
        let mut listener = ControlListener::new(9990);
        listener.set_port(80).await.unwrap();
        assert_eq!(listener.port(), 9990);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut listener = ControlListener::new(0);
        listener.start().await.unwrap();
        listener.stop();
        listener.stop();
        assert!(!listener.is_listening());
    }
}
