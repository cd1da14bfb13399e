//! Outbound control endpoint.

use std::io;

use tokio::net::UdpSocket;
use tracing::{debug, warn};

use vireo_events::ControlMessage;

use crate::codec;

/// Sends encoded control messages to a reconfigurable host/port target.
///
/// The target never changes as a side effect of script loads; only
/// explicit `set_host`/`set_port` calls mutate it, and setting the current
/// value is silently ignored.
pub struct ControlSender {
    host: String,
    port: u16,
    socket: UdpSocket,
}

impl ControlSender {
    pub async fn new(host: impl Into<String>, port: u16) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self {
            host: host.into(),
            port,
            socket,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn set_host(&mut self, host: &str) {
        if self.host == host {
            return;
        }
        self.host = host.to_string();
        debug!(target: "control", "send host: {host}");
    }

    pub fn set_port(&mut self, port: u16) {
        if port < 1024 {
            warn!(target: "control", "send port must be >= 1024");
            return;
        }
        if self.port == port {
            return;
        }
        self.port = port;
        debug!(target: "control", "send port: {port}");
    }

    pub async fn send(&self, msg: &ControlMessage) -> io::Result<()> {
        let datagram = codec::encode(msg);
        self.socket
            .send_to(&datagram, (self.host.as_str(), self.port))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_port_guards() {
        let mut sender = ControlSender::new("localhost", 8880).await.unwrap();
        sender.set_port(80);
        assert_eq!(sender.port(), 8880);
        sender.set_port(9000);
        assert_eq!(sender.port(), 9000);
    }

    #[tokio::test]
    async fn test_set_host_same_value_ignored() {
        let mut sender = ControlSender::new("localhost", 8880).await.unwrap();
        sender.set_host("localhost");
        assert_eq!(sender.host(), "localhost");
        sender.set_host("127.0.0.1");
        assert_eq!(sender.host(), "127.0.0.1");
    }
}
