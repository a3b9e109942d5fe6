use std::io;
use std::time::Duration;

/// Byte pipe to the receiver.
#[allow(async_fn_in_trait)]
pub trait Transport {
    /// Drop whatever the receiver sent before our next frame.
    async fn clear_input(&mut self) -> io::Result<()>;

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Fill `buf` until it is full, the peer goes quiet, or `timeout` elapses.
    /// Returns how many bytes were read; a short count is not an error.
    async fn read_up_to(&mut self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    fn set_baud_rate(&mut self, baud: u32) -> io::Result<()>;
}
