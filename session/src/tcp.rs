//! Line-oriented TCP session for lab devices and terminal servers

use crate::timing::read_until_quiet;
use crate::{
    CommandError, ConnectError, DeviceSession, DeviceTarget, SessionConfig, SessionConnector,
    TimingPolicy,
};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// Opens line-based sessions over plain TCP
#[derive(Debug, Default)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SessionConnector for TcpConnector {
    type Session = TcpSession;

    async fn open(&self, config: &SessionConfig) -> Result<TcpSession, ConnectError> {
        let addr = format!("{}:{}", config.host, config.port);

        let stream = match timeout(config.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ConnectError::Io {
                    host: config.host.clone(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(ConnectError::Timeout {
                    host: config.host.clone(),
                    timeout: config.connect_timeout,
                })
            }
        };

        let mut session = TcpSession {
            stream,
            timing: config.timing.clone(),
            host: config.host.clone(),
        };
        session.login(config).await?;
        Ok(session)
    }

    fn name(&self) -> &'static str {
        "tcp"
    }
}

/// One open TCP session. Commands are written as lines and output is
/// collected with the timing reader; no prompt matching happens anywhere.
#[derive(Debug)]
pub struct TcpSession {
    stream: TcpStream,
    timing: TimingPolicy,
    host: DeviceTarget,
}

impl TcpSession {
    /// Blind login exchange: drain the banner, answer the username and
    /// password prompts by pacing, then disable paging for the dialect.
    async fn login(&mut self, config: &SessionConfig) -> Result<(), ConnectError> {
        self.exchange("login", Some(&config.credential.username))
            .await?;
        self.exchange("login", Some(&config.credential.password))
            .await?;
        self.exchange("login", None).await?;
        debug!("logged in to {}", self.host);

        let setup = config.device_type.paging_disable();
        self.send_line(setup).await.map_err(|e| ConnectError::Login {
            host: self.host.clone(),
            reason: e.to_string(),
        })?;
        self.exchange(setup, None).await?;
        Ok(())
    }

    /// Drain pending output, then optionally answer with one line
    async fn exchange(&mut self, context: &str, answer: Option<&str>) -> Result<(), ConnectError> {
        read_until_quiet(&mut self.stream, &self.timing, context)
            .await
            .map_err(|e| ConnectError::Login {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;

        if let Some(line) = answer {
            self.send_line(line).await.map_err(|e| ConnectError::Login {
                host: self.host.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), std::io::Error> {
        let mut framed = String::with_capacity(line.len() + 1);
        framed.push_str(line);
        framed.push('\n');
        self.stream.write_all(framed.as_bytes()).await?;
        self.stream.flush().await
    }
}

#[async_trait]
impl DeviceSession for TcpSession {
    async fn run_command(&mut self, command: &str) -> Result<String, CommandError> {
        self.send_line(command).await.map_err(|e| CommandError::Io {
            command: command.to_string(),
            source: e,
        })?;
        read_until_quiet(&mut self.stream, &self.timing, command).await
    }

    async fn close(&mut self) -> Result<(), CommandError> {
        self.stream
            .shutdown()
            .await
            .map_err(|e| CommandError::Io {
                command: "<close>".to_string(),
                source: e,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Credential, DeviceType};
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[test]
    fn test_connector_name() {
        assert_eq!(TcpConnector::new().name(), "tcp");
    }

    #[tokio::test]
    async fn test_session_against_scripted_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];

            sock.write_all(b"Username: ").await.unwrap();
            let _ = sock.read(&mut buf).await.unwrap(); // username line
            sock.write_all(b"Password: ").await.unwrap();
            let _ = sock.read(&mut buf).await.unwrap(); // password line
            sock.write_all(b"router# ").await.unwrap();
            let _ = sock.read(&mut buf).await.unwrap(); // paging disable
            sock.write_all(b"router# ").await.unwrap();

            let n = sock.read(&mut buf).await.unwrap();
            assert!(String::from_utf8_lossy(&buf[..n]).contains("show version"));
            sock.write_all(b"IOS 15.2\nrouter# ").await.unwrap();

            // Hold the socket until the client shuts down
            let _ = sock.read(&mut buf).await;
        });

        let config = SessionConfig::new(
            DeviceType::CiscoIos,
            DeviceTarget::new("127.0.0.1"),
            Credential::new("admin", "secret"),
            true,
        )
        .with_port(addr.port());

        let connector = TcpConnector::new();
        let mut session = connector.open(&config).await.unwrap();
        let output = session.run_command("show version").await.unwrap();
        assert!(output.contains("IOS 15.2"));
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_refused_surfaces_as_io_error() {
        // Bind then drop to get a port with no listener
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = SessionConfig::new(
            DeviceType::CiscoIos,
            DeviceTarget::new("127.0.0.1"),
            Credential::new("admin", "secret"),
            true,
        )
        .with_port(addr.port());

        let err = TcpConnector::new().open(&config).await.unwrap_err();
        assert!(matches!(err, ConnectError::Io { .. }));
    }
}
