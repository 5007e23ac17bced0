//! Agent output plumbing: line reading, suppression, exit descriptions.

use std::process::ExitStatus;
use std::sync::atomic::{AtomicBool, Ordering};

use procura_core::AgentTag;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

/// Longest chunk relayed as one line. Longer output is split.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Per-run suppression state.
///
/// Once a terminal line has been seen, the run's outcome is known and
/// everything after it except further terminal lines is noise.
#[derive(Debug, Default)]
pub struct OutputFilter {
    suppressed: AtomicBool,
}

impl OutputFilter {
    pub const fn new() -> Self {
        Self {
            suppressed: AtomicBool::new(false),
        }
    }

    /// Decide whether a classified stdout line should be forwarded.
    /// A terminal tag is always forwarded and turns suppression on.
    pub fn admit(&self, tag: AgentTag) -> bool {
        if tag.is_terminal() {
            self.suppressed.store(true, Ordering::Release);
            return true;
        }
        !self.suppressed.load(Ordering::Acquire)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed.load(Ordering::Acquire)
    }
}

/// Read the next line, tolerating invalid UTF-8.
///
/// Returns `Ok(None)` at end of stream. Trailing `\n` / `\r\n` are stripped.
/// A line longer than [`MAX_LINE_BYTES`] comes back in several pieces.
pub async fn next_line<R>(reader: &mut R, buf: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let mut limited = AsyncReadExt::take(&mut *reader, MAX_LINE_BYTES as u64);
    if limited.read_until(b'\n', buf).await? == 0 {
        return Ok(None);
    }
    let text = String::from_utf8_lossy(buf);
    Ok(Some(text.trim_end_matches(['\n', '\r']).to_string()))
}

/// Human-readable exit description carried in the final relay message.
pub fn describe_exit(status: ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("Agent process exited with code {code}");
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("Agent process terminated by signal {signal}");
        }
    }
    "Agent process exited without a status code".to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    #[test]
    fn filter_passes_until_terminal() {
        let filter = OutputFilter::new();
        assert!(filter.admit(AgentTag::Sourcing));
        assert!(filter.admit(AgentTag::System));
        assert!(filter.admit(AgentTag::FinalOutcome));
        assert!(filter.is_suppressed());
        assert!(!filter.admit(AgentTag::Order));
        assert!(!filter.admit(AgentTag::System));
        assert!(filter.admit(AgentTag::FinalOutcome));
    }

    #[tokio::test]
    async fn reads_lines_and_strips_endings() {
        let data: &[u8] = b"first\r\nsecond\nlast";
        let mut reader = BufReader::new(data);
        let mut buf = Vec::new();
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("first"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("second"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("last"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), None);
    }

    #[tokio::test]
    async fn unterminated_output_is_split_at_the_cap() {
        let mut data = vec![b'a'; MAX_LINE_BYTES + 10];
        data.extend_from_slice(b"\nnext\n");
        let mut reader = BufReader::new(data.as_slice());
        let mut buf = Vec::new();

        let first = next_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(first.len(), MAX_LINE_BYTES);
        let rest = next_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert_eq!(rest.len(), 10);
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap().as_deref(), Some("next"));
        assert_eq!(next_line(&mut reader, &mut buf).await.unwrap(), None);
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced() {
        let data: &[u8] = b"caf\xe9\n";
        let mut reader = BufReader::new(data);
        let mut buf = Vec::new();
        let line = next_line(&mut reader, &mut buf).await.unwrap().unwrap();
        assert!(line.starts_with("caf"));
        assert!(line.contains('\u{FFFD}'));
    }

    #[cfg(unix)]
    #[test]
    fn exit_descriptions() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(
            describe_exit(ExitStatus::from_raw(0)),
            "Agent process exited with code 0"
        );
        assert_eq!(
            describe_exit(ExitStatus::from_raw(3 << 8)),
            "Agent process exited with code 3"
        );
        assert_eq!(
            describe_exit(ExitStatus::from_raw(15)),
            "Agent process terminated by signal 15"
        );
    }
}
