//! Per-connection request handling.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::protocol::{Dispatcher, Response, StatusCode};

/// Size of each read from the peer. A shorter read ends the message.
pub const READ_CHUNK_SIZE: usize = 500;

/// Upper bound on a single request; anything past it is ignored.
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

/// Read one request.
///
/// The message ends at the first read shorter than [`READ_CHUNK_SIZE`],
/// at end of stream, or once [`MAX_REQUEST_BYTES`] have been collected.
/// A message that is an exact multiple of the chunk size waits for the
/// peer to close its write half.
pub async fn read_request<R>(reader: &mut R) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];

    loop {
        let n = reader.read(&mut chunk).await?;
        buffer.extend_from_slice(&chunk[..n]);
        if n < READ_CHUNK_SIZE {
            break;
        }
        if buffer.len() >= MAX_REQUEST_BYTES {
            buffer.truncate(MAX_REQUEST_BYTES);
            break;
        }
    }

    Ok(buffer)
}

/// Serve a single connection: read, dispatch, write, close.
pub async fn handle<S>(mut stream: S, dispatcher: Dispatcher) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let request = read_request(&mut stream).await?;
    debug!(bytes = request.len(), "request received");

    // Dispatch touches the filesystem synchronously
    let response = match tokio::task::spawn_blocking(move || dispatcher.handle(&request)).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "dispatch task failed");
            Response::new(StatusCode::InternalFailed, "ERROR_INTERNAL")
        }
    };

    stream.write_all(&response.encode()).await?;
    stream.flush().await?;
    stream.shutdown().await?;
    debug!(status = response.status.code(), "response sent");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionTable;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_read_short_message() {
        let mut input: &[u8] = b"PTDP v1 LIST_STATES";
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request, b"PTDP v1 LIST_STATES");
    }

    #[tokio::test]
    async fn test_read_multi_chunk_message() {
        let data = vec![b'a'; READ_CHUNK_SIZE * 2 + 17];
        let mut input: &[u8] = &data;
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.len(), data.len());
    }

    #[tokio::test]
    async fn test_read_exact_chunk_ends_at_eof() {
        let data = vec![b'a'; READ_CHUNK_SIZE];
        let mut input: &[u8] = &data;
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.len(), READ_CHUNK_SIZE);
    }

    #[tokio::test]
    async fn test_read_is_capped() {
        let data = vec![b'a'; MAX_REQUEST_BYTES + READ_CHUNK_SIZE * 3];
        let mut input: &[u8] = &data;
        let request = read_request(&mut input).await.unwrap();
        assert_eq!(request.len(), MAX_REQUEST_BYTES);
    }

    #[tokio::test]
    async fn test_handle_over_duplex() {
        let dispatcher = Dispatcher::new(Arc::new(SessionTable::new(Duration::from_secs(60))));
        let (mut client, server) = tokio::io::duplex(4096);

        let task = tokio::spawn(handle(server, dispatcher));
        client.write_all(b"PTDP v1 LIST_STATES").await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(response, b"35 - STATES_LISTED\n\nNONE\n\n");
    }
}
