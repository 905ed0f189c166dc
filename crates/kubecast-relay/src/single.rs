use futures::io::{AsyncRead, AsyncReadExt};

use crate::error::RelayError;
use crate::sink::{FrameWriter, MessageSink};

/// Fixed read size; one successful read becomes exactly one frame.
pub const CHUNK_SIZE: usize = 1024;

/// Pump one log source into the frame writer until end-of-stream.
///
/// Frames are emitted in read order. A read error aborts the relay and is
/// propagated; a write error means the connection is dead and no further
/// reads or writes are attempted.
pub async fn relay_single<R, S>(mut source: R, writer: &FrameWriter<S>) -> Result<(), RelayError>
where
    R: AsyncRead + Unpin,
    S: MessageSink,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = source.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write(&buf[..n]).await?;
    }
}
