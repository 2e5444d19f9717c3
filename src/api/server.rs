//! Newline-delimited JSON transport: one request per line in, one reply per line out.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{info, warn};

use super::handler::RequestHandler;
use super::protocol::{Reply, decode_request, encode_reply};
use crate::errors::SummarizerError;

/// Serve requests until `reader` reaches end of input, returning the number
/// of replies written. Blank lines are skipped; every other line, malformed
/// or not, receives exactly one reply.
///
/// # Errors
///
/// Returns `IoError` if reading or writing the stream fails.
pub async fn serve<H, R, W>(handler: &H, mut reader: R, mut writer: W) -> Result<usize, SummarizerError>
where
    H: RequestHandler + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    let mut replies = 0;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        let (id, request) = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => decode_request(line),
            Err(e) => (
                None,
                Err(SummarizerError::ParseError(format!("Request is not UTF-8: {e}"))),
            ),
        };

        let reply = match request {
            Ok(request) => handler.handle(request).await,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed request");
                Reply::failure(e.to_string())
            }
        };

        let frame = encode_reply(id.as_ref(), &reply)?;
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        replies += 1;
    }

    info!(replies, "Request stream closed");
    Ok(replies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::surface::PickSurface;
    use serde_json::{Value, json};
    use tokio::io::BufReader;

    fn parse_lines(out: &[u8]) -> Vec<Value> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_one_reply_per_non_blank_line() {
        let input = "{\"type\":\"ping\",\"id\":1}\n\n   \ngarbage\n{\"type\":\"toggle-pick\"}\n";
        let mut out = Vec::new();

        let n = serve(&PickSurface::new(), BufReader::new(input.as_bytes()), &mut out)
            .await
            .unwrap();

        assert_eq!(n, 3);
        let replies = parse_lines(&out);
        assert_eq!(replies[0], json!({"ok": true, "id": 1}));
        assert_eq!(replies[1]["ok"], false);
        assert!(replies[1]["error"].as_str().unwrap().contains("Invalid JSON"));
        assert_eq!(replies[2], json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_gets_a_reply_and_serving_continues() {
        let mut input = b"{\"type\":\"ping\",\"id\":1}\n".to_vec();
        input.extend_from_slice(b"{\"type\":\"ping\",\"id\":\xff}\n");
        input.extend_from_slice(b"{\"type\":\"ping\",\"id\":3}");
        let mut out = Vec::new();

        let n = serve(&PickSurface::new(), BufReader::new(&input[..]), &mut out)
            .await
            .unwrap();

        assert_eq!(n, 3);
        let replies = parse_lines(&out);
        assert_eq!(replies[0], json!({"ok": true, "id": 1}));
        assert_eq!(replies[1]["ok"], false);
        assert!(replies[1]["error"].as_str().unwrap().contains("not UTF-8"));
        assert_eq!(replies[2], json!({"ok": true, "id": 3}));
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let mut out = Vec::new();
        let n = serve(&PickSurface::new(), BufReader::new(&b""[..]), &mut out)
            .await
            .unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }
}
