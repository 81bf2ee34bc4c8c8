//! Shared streaming-response plumbing.
//!
//! Both SSE (`data: {...}`) and NDJSON streams are consumed line by line.
//! The timeout is re-armed on every received chunk: a stream that keeps
//! producing tokens never times out, a stalled one is aborted after the idle
//! window (dropping the response cancels the in-flight request).

use std::time::Duration;

use crate::error_handler::{AiAgentError, Result};

/// Reads a streaming body line by line, appending whatever `extract` yields
/// for each complete line. A trailing partial line is flushed at end of
/// stream.
pub(crate) async fn collect_stream<F>(
    mut resp: reqwest::Response,
    idle: Duration,
    mut extract: F,
) -> Result<String>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut out = String::new();
    let mut buf = String::new();

    loop {
        let chunk = match tokio::time::timeout(idle, resp.chunk()).await {
            Ok(next) => next?,
            Err(_) => return Err(AiAgentError::Timeout(idle)),
        };
        let Some(bytes) = chunk else { break };
        buf.push_str(&String::from_utf8_lossy(&bytes));

        while let Some(pos) = buf.find('\n') {
            let line: String = buf.drain(..=pos).collect();
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(text) = extract(line) {
                out.push_str(&text);
            }
        }
    }

    let tail = buf.trim();
    if !tail.is_empty() {
        if let Some(text) = extract(tail) {
            out.push_str(&text);
        }
    }

    Ok(out)
}

/// Strips the SSE `data:` prefix; `None` for non-data lines and the
/// terminal `[DONE]` marker.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    let payload = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:"))?;
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return None;
    }
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sse_data_lines() {
        assert_eq!(sse_data("data: {\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data:{\"x\":1}"), Some("{\"x\":1}"));
        assert_eq!(sse_data("data: [DONE]"), None);
        assert_eq!(sse_data("event: ping"), None);
    }
}
