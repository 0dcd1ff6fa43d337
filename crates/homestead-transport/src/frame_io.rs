//! Reading and writing whole frames on a byte stream.

use homestead_protocol::{HEADER_LEN, frame_size_from_header};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// Reads one complete frame (header included) from a stream.
///
/// Returns `Ok(None)` when the peer closes the stream before the next
/// frame starts. A close in the middle of a frame, a size outside the
/// allowed range, or an I/O error are all errors; the caller should drop
/// the connection.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        let n = reader
            .read(&mut prefix[filled..])
            .await
            .map_err(TransportError::ReceiveFailed)?;
        if n == 0 {
            if filled == 0 {
                return Ok(None);
            }
            return Err(TransportError::ConnectionClosed(format!(
                "{filled} of 4 size bytes read"
            )));
        }
        filled += n;
    }

    let size = frame_size_from_header(prefix)?;
    let mut frame = vec![0u8; size];
    frame[..4].copy_from_slice(&prefix);
    reader
        .read_exact(&mut frame[4..])
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::ConnectionClosed(
                format!("frame of {size} bytes truncated"),
            ),
            _ => TransportError::ReceiveFailed(e),
        })?;

    debug_assert!(frame.len() >= HEADER_LEN);
    Ok(Some(frame))
}

/// Writes one complete frame and flushes.
pub async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    writer
        .write_all(frame)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}
