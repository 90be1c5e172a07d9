//! IRC-style chat transport.

use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use super::{ChatConnector, ChatTransport, VoteConfig, VoteError};

/// Connects to an IRC-style chat service (Twitch chat compatible).
pub struct IrcConnector {
    config: VoteConfig,
}

impl IrcConnector {
    pub fn new(config: VoteConfig) -> Self {
        Self { config }
    }

    fn channel(&self) -> String {
        let ch = self.config.channel.trim_start_matches('#');
        format!("#{}", ch)
    }
}

#[async_trait]
impl ChatConnector for IrcConnector {
    async fn connect(&self) -> Result<Box<dyn ChatTransport>, VoteError> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| VoteError::ConnectionFailed(format!("{}: {}", addr, e)))?;

        let (read_half, write_half) = stream.into_split();
        let mut transport = IrcTransport {
            reader: BufReader::new(read_half),
            writer: write_half,
        };

        // PASS before NICK, then JOIN; the server starts streaming channel
        // messages once the join is acknowledged.
        transport
            .send_line(&format!("PASS {}", self.config.token))
            .await?;
        transport
            .send_line(&format!("NICK {}", self.config.nick))
            .await?;
        transport.send_line(&format!("JOIN {}", self.channel())).await?;

        debug!(addr, channel = %self.channel(), "Chat connected");
        Ok(Box::new(transport))
    }
}

struct IrcTransport {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

#[async_trait]
impl ChatTransport for IrcTransport {
    async fn send_line(&mut self, line: &str) -> Result<(), VoteError> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, VoteError> {
        let mut line = String::new();
        match tokio::time::timeout(timeout, self.reader.read_line(&mut line)).await {
            // Idle: nothing arrived within the per-read timeout.
            Err(_elapsed) => Ok(None),
            Ok(Ok(0)) => Err(VoteError::ConnectionClosed),
            Ok(Ok(_)) => Ok(Some(line)),
            Ok(Err(e)) => Err(e.into()),
        }
    }
}
