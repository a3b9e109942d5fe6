use std::io;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{ClearBuffer, SerialPort, SerialPortBuilderExt, SerialStream};
use tracing::info;

use crate::transport::Transport;
use crate::UbxError;

/// Receiver UART opened through tokio-serial.
pub struct SerialLink {
    port: SerialStream,
    dev: String,
}

impl SerialLink {
    pub fn open(dev: &str, baud: u32) -> Result<Self, UbxError> {
        let port = tokio_serial::new(dev, baud)
            .open_native_async()
            .map_err(|source| UbxError::Open { dev: dev.to_string(), source })?;
        info!("receiver link open: {} @ {}", dev, baud);
        Ok(Self { port, dev: dev.to_string() })
    }

    /// Hand the port over to the NMEA reader once configuration is done.
    pub fn into_inner(self) -> SerialStream {
        self.port
    }
}

impl Transport for SerialLink {
    async fn clear_input(&mut self) -> io::Result<()> {
        self.port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes).await?;
        self.port.flush().await
    }

    async fn read_up_to(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut filled = 0;
        while filled < buf.len() {
            match tokio::time::timeout_at(deadline, self.port.read(&mut buf[filled..])).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => filled += n,
                Ok(Err(e)) => return Err(e),
                Err(_elapsed) => break,
            }
        }
        Ok(filled)
    }

    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()> {
        SerialPort::set_baud_rate(&mut self.port, baud).map_err(io::Error::from)?;
        info!("receiver link {} now @ {}", self.dev, baud);
        Ok(())
    }
}
