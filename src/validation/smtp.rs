use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;

use crate::error::SmtpError;
use crate::models::Verdict;

pub const SMTP_PORT: u16 = 25;
pub const SMTP_TIMEOUT: Duration = Duration::from_secs(20);
pub const PROBE_SENDER: &str = "test@example.com";
/// Longest reply line accepted, line ending included.
pub const MAX_LINE_BYTES: usize = 8192;
/// Most lines accepted in one multi-line reply.
pub const MAX_REPLY_LINES: usize = 100;

/// Asks a mail exchanger whether it accepts a recipient.
#[async_trait]
pub trait MailboxProbe: Send + Sync {
    /// Returns `Valid`, `Invalid` or `Unknown`. Never fails.
    async fn probe(&self, mx_host: &str, address: &str) -> Verdict;
}

/// [`MailboxProbe`] that runs a HELO / MAIL FROM / RCPT TO dialogue over TCP.
///
/// Only the RCPT reply decides the verdict: `250` is `Valid`, any other code
/// is `Invalid`. Connection failures, timeouts and any reply that breaks the
/// dialogue before RCPT are reported as `Unknown`.
#[derive(Debug, Clone)]
pub struct SmtpProbe {
    helo_name: String,
    port: u16,
    timeout: Duration,
}

impl SmtpProbe {
    pub fn new(helo_name: impl Into<String>) -> Self {
        Self {
            helo_name: helo_name.into(),
            port: SMTP_PORT,
            timeout: SMTP_TIMEOUT,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn dialogue(&self, mx_host: &str, address: &str) -> Result<Verdict, SmtpError> {
        if address.contains(['\r', '\n']) {
            return Err(SmtpError::Protocol("line break in recipient".into()));
        }

        // The session owns the socket; dropping it on any return closes the connection.
        let mut session = SmtpSession::connect(mx_host, self.port, self.timeout).await?;

        let banner = session.read_reply("greeting").await?;
        if banner.code != 220 {
            return Err(SmtpError::Rejected {
                stage: "greeting",
                code: banner.code,
            });
        }

        let helo = session
            .command("HELO", &format!("HELO {}", self.helo_name))
            .await?;
        if !helo.is_positive_completion() {
            return Err(SmtpError::Rejected {
                stage: "HELO",
                code: helo.code,
            });
        }

        let mail = session
            .command("MAIL FROM", &format!("MAIL FROM:<{PROBE_SENDER}>"))
            .await?;
        if !mail.is_positive_completion() {
            return Err(SmtpError::Rejected {
                stage: "MAIL FROM",
                code: mail.code,
            });
        }

        let rcpt = session
            .command("RCPT TO", &format!("RCPT TO:<{address}>"))
            .await?;
        let verdict = if rcpt.code == 250 {
            Verdict::Valid
        } else {
            Verdict::Invalid
        };
        tracing::debug!(mx_host, address, code = rcpt.code, %verdict, "RCPT answered");

        session.quit().await;
        Ok(verdict)
    }
}

#[async_trait]
impl MailboxProbe for SmtpProbe {
    async fn probe(&self, mx_host: &str, address: &str) -> Verdict {
        match self.dialogue(mx_host, address).await {
            Ok(verdict) => verdict,
            Err(err) => {
                tracing::debug!(mx_host, address, error = %err, "SMTP probe inconclusive");
                Verdict::Unknown
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SmtpReply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl SmtpReply {
    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

struct SmtpSession {
    stream: BufStream<TcpStream>,
    timeout: Duration,
}

impl SmtpSession {
    async fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self, SmtpError> {
        let stream = match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                return Err(SmtpError::Connect {
                    host: format!("{host}:{port}"),
                    source,
                });
            }
            Err(_) => return Err(SmtpError::Timeout { stage: "connect" }),
        };
        Ok(Self {
            stream: BufStream::new(stream),
            timeout,
        })
    }

    async fn command(&mut self, stage: &'static str, line: &str) -> Result<SmtpReply, SmtpError> {
        let timeout = self.timeout;
        let payload = format!("{line}\r\n");
        bounded(timeout, stage, async {
            self.stream.write_all(payload.as_bytes()).await?;
            self.stream.flush().await
        })
        .await?;
        self.read_reply(stage).await
    }

    /// Reads one complete reply, single or multi-line, within the session timeout.
    async fn read_reply(&mut self, stage: &'static str) -> Result<SmtpReply, SmtpError> {
        match tokio::time::timeout(self.timeout, self.read_reply_lines()).await {
            Ok(reply) => reply,
            Err(_) => Err(SmtpError::Timeout { stage }),
        }
    }

    async fn read_reply_lines(&mut self) -> Result<SmtpReply, SmtpError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            if lines.len() == MAX_REPLY_LINES {
                return Err(SmtpError::Protocol(format!(
                    "reply exceeds {MAX_REPLY_LINES} lines"
                )));
            }
            let mut raw = String::new();
            let read = (&mut self.stream)
                .take(MAX_LINE_BYTES as u64 + 1)
                .read_line(&mut raw)
                .await
                .map_err(|source| SmtpError::Io { source })?;
            if read == 0 {
                return Err(SmtpError::Io {
                    source: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "connection closed",
                    ),
                });
            }
            if read > MAX_LINE_BYTES {
                return Err(SmtpError::Protocol(format!(
                    "reply line exceeds {MAX_LINE_BYTES} bytes"
                )));
            }
            let (line_code, is_last, text) = parse_reply_line(&raw)?;
            match code {
                Some(existing) if existing != line_code => {
                    return Err(SmtpError::Protocol(format!(
                        "inconsistent reply codes: {existing} vs {line_code}"
                    )));
                }
                _ => code = Some(line_code),
            }
            lines.push(text);
            if is_last {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or_default(),
            lines,
        })
    }

    async fn quit(&mut self) {
        if let Err(err) = self.command("QUIT", "QUIT").await {
            tracing::trace!(error = %err, "QUIT not acknowledged");
        }
    }
}

/// Splits one reply line into code, last-line flag and text.
fn parse_reply_line(raw: &str) -> Result<(u16, bool, String), SmtpError> {
    let line = raw.trim_end_matches(['\r', '\n']);
    let code = line
        .get(..3)
        .and_then(|digits| digits.parse::<u16>().ok())
        .ok_or_else(|| SmtpError::Protocol(format!("invalid reply: {line}")))?;
    let is_last = line.as_bytes().get(3) != Some(&b'-');
    let text = line.get(4..).unwrap_or_default().to_string();
    Ok((code, is_last, text))
}

async fn bounded<T, F>(timeout: Duration, stage: &'static str, fut: F) -> Result<T, SmtpError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(SmtpError::Io { source }),
        Err(_) => Err(SmtpError::Timeout { stage }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Accepts one connection, sends `banner`, then answers each received line
    /// with the next scripted reply. Yields the lines it received.
    async fn fake_server(
        banner: impl Into<String>,
        replies: Vec<&'static str>,
    ) -> (u16, JoinHandle<Vec<String>>) {
        let banner = banner.into();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut stream = BufStream::new(socket);
            let mut received = Vec::new();
            if stream.write_all(banner.as_bytes()).await.is_err() || stream.flush().await.is_err() {
                return received;
            }
            for reply in replies {
                let mut line = String::new();
                match stream.read_line(&mut line).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => received.push(line.trim_end().to_string()),
                }
                if stream.write_all(reply.as_bytes()).await.is_err()
                    || stream.flush().await.is_err()
                {
                    break;
                }
            }
            received
        });
        (port, handle)
    }

    fn probe_on(port: u16) -> SmtpProbe {
        SmtpProbe::new("localhost")
            .with_port(port)
            .with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_accepted_recipient_is_valid() {
        let (port, server) = fake_server(
            "220 mx.example.com ESMTP\r\n",
            vec!["250 mx.example.com\r\n", "250 2.1.0 Ok\r\n", "250 2.1.5 Ok\r\n", "221 Bye\r\n"],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Valid);

        let received = server.await.unwrap();
        assert_eq!(
            received,
            vec![
                "HELO localhost",
                "MAIL FROM:<test@example.com>",
                "RCPT TO:<good@example.com>",
                "QUIT",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_recipient_is_invalid() {
        let (port, _server) = fake_server(
            "220 mx.example.com ESMTP\r\n",
            vec![
                "250 mx.example.com\r\n",
                "250 Ok\r\n",
                "550 5.1.1 No such user\r\n",
                "221 Bye\r\n",
            ],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "nobody@example.com").await;
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[tokio::test]
    async fn test_only_250_counts_as_acceptance() {
        let (port, _server) = fake_server(
            "220 mx.example.com ESMTP\r\n",
            vec![
                "250 mx.example.com\r\n",
                "250 Ok\r\n",
                "251 User not local; will forward\r\n",
                "221 Bye\r\n",
            ],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "moved@example.com").await;
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[tokio::test]
    async fn test_greylisted_recipient_is_invalid() {
        let (port, _server) = fake_server(
            "220 mx.example.com ESMTP\r\n",
            vec![
                "250 mx.example.com\r\n",
                "250 Ok\r\n",
                "450 4.7.1 Greylisted, try again later\r\n",
                "221 Bye\r\n",
            ],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "user@example.com").await;
        assert_eq!(verdict, Verdict::Invalid);
    }

    #[tokio::test]
    async fn test_multiline_replies_are_consumed() {
        let (port, _server) = fake_server(
            "220-mx.example.com ESMTP\r\n220 no UCE\r\n",
            vec![
                "250-mx.example.com\r\n250-SIZE 10240000\r\n250 HELP\r\n",
                "250 Ok\r\n",
                "250 Ok\r\n",
                "221 Bye\r\n",
            ],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Valid);
    }

    #[tokio::test]
    async fn test_refused_greeting_is_unknown() {
        let (port, _server) = fake_server("554 No SMTP service here\r\n", vec![]).await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_rejected_sender_is_unknown() {
        let (port, _server) = fake_server(
            "220 mx.example.com ESMTP\r\n",
            vec!["250 mx.example.com\r\n", "553 Sender address rejected\r\n"],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_connection_refused_is_unknown() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
        });

        let probe = SmtpProbe::new("localhost")
            .with_port(port)
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let verdict = probe.probe("127.0.0.1", "good@example.com").await;

        assert_eq!(verdict, Verdict::Unknown);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_trickling_reply_is_bounded_by_timeout() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let _server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            for _ in 0..50 {
                if socket.write_all(b"220-still here\r\n").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        });

        let probe = SmtpProbe::new("localhost")
            .with_port(port)
            .with_timeout(Duration::from_millis(300));
        let started = Instant::now();
        let verdict = probe.probe("127.0.0.1", "good@example.com").await;

        assert_eq!(verdict, Verdict::Unknown);
        assert!(
            started.elapsed() < Duration::from_millis(1500),
            "took {:?}",
            started.elapsed()
        );
    }

    #[tokio::test]
    async fn test_oversized_reply_line_is_unknown() {
        let banner = format!("220 {}\r\n", "x".repeat(MAX_LINE_BYTES * 4));
        let (port, _server) = fake_server(
            banner,
            vec!["250 mx.example.com\r\n", "250 Ok\r\n", "250 Ok\r\n", "221 Bye\r\n"],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_endless_continuation_is_unknown() {
        let banner = format!("{}220 ready\r\n", "220-more\r\n".repeat(MAX_REPLY_LINES * 2));
        let (port, _server) = fake_server(
            banner,
            vec!["250 mx.example.com\r\n", "250 Ok\r\n", "250 Ok\r\n", "221 Bye\r\n"],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[tokio::test]
    async fn test_reply_at_line_limit_is_accepted() {
        let banner = format!(
            "{}220 ready\r\n",
            "220-more\r\n".repeat(MAX_REPLY_LINES - 1)
        );
        let (port, _server) = fake_server(
            banner,
            vec!["250 mx.example.com\r\n", "250 Ok\r\n", "250 Ok\r\n", "221 Bye\r\n"],
        )
        .await;

        let verdict = probe_on(port).probe("127.0.0.1", "good@example.com").await;
        assert_eq!(verdict, Verdict::Valid);
    }

    #[tokio::test]
    async fn test_line_break_in_address_is_unknown() {
        let verdict = probe_on(1)
            .probe("127.0.0.1", "a@example.com\r\nDATA")
            .await;
        assert_eq!(verdict, Verdict::Unknown);
    }

    #[test]
    fn test_parse_reply_line() {
        assert_eq!(
            parse_reply_line("250-SIZE 1000\r\n").unwrap(),
            (250, false, "SIZE 1000".to_string())
        );
        assert_eq!(
            parse_reply_line("250 Ok\r\n").unwrap(),
            (250, true, "Ok".to_string())
        );
        assert_eq!(parse_reply_line("221").unwrap(), (221, true, String::new()));
        assert!(parse_reply_line("OK\r\n").is_err());
        assert!(parse_reply_line("2x0 nope\r\n").is_err());
    }

    #[test]
    fn test_defaults() {
        let probe = SmtpProbe::new("localhost");
        assert_eq!(probe.port, SMTP_PORT);
        assert_eq!(probe.timeout, SMTP_TIMEOUT);
    }
}
