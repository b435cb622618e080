//! Infrastructure implementation of the `ReadinessProbe` port.
//!
//! A node is ready when its published port accepts a connection and sends
//! an SSH protocol banner. A bare TCP accept is not enough: the runtime's
//! port proxy accepts before sshd is listening.

use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;

use crate::application::ports::ReadinessProbe;

const BANNER_PREFIX: &[u8] = b"SSH-";

/// Probes `127.0.0.1:<port>` for an SSH banner.
pub struct BannerProbe {
    timeout: Duration,
}

impl BannerProbe {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for BannerProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(3))
    }
}

impl ReadinessProbe for BannerProbe {
    async fn ssh_ready(&self, port: u16) -> bool {
        let attempt = async {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.ok()?;
            let mut buf = [0u8; 4];
            stream.read_exact(&mut buf).await.ok()?;
            Some(buf.as_slice() == BANNER_PREFIX)
        };
        matches!(tokio::time::timeout(self.timeout, attempt).await, Ok(Some(true)))
    }
}
