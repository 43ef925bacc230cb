//! TCP host shell for the wire protocol.
//!
//! One accepted connection gets its own decoder, dispatcher and
//! [`FrameStack`], so concurrent producers write independent streams. A
//! decode error terminates only the offending connection; the partial
//! output stream is closed first.

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};

use crate::config::EtlConfig;
use crate::error::Result;
use crate::event::{Events, LogKind};
use crate::protocol::{Decoder, Dispatcher};
use crate::stream::FrameStack;

/// Read buffer size per connection.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Accept loop owning the shared configuration and event channel.
pub struct Server {
    config: EtlConfig,
    events: Events,
}

impl Server {
    pub fn new(config: EtlConfig, events: Events) -> Self {
        Self { config, events }
    }

    /// Bind and serve until the listener fails. Per-connection errors are
    /// reported on the event channel and do not stop the loop.
    pub async fn run(&self, port: u16) -> Result<()> {
        let listener = TcpListener::bind(("0.0.0.0", port)).await?;
        self.events
            .log(LogKind::Status, format!("Listening on port {port}"));

        loop {
            let (stream, peer) = listener.accept().await?;
            self.events
                .log(LogKind::Status, format!("Connected from {peer}"));

            let config = self.config.clone();
            let events = self.events.clone();
            tokio::spawn(async move {
                if let Err(e) = serve_connection(stream, config, events.clone()).await {
                    events.log(LogKind::Error, format!("connection {peer}: {e}"));
                }
                events.log(LogKind::Status, format!("Disconnected {peer}"));
            });
        }
    }
}

/// Per-connection loop: read chunks, feed the decoder byte-wise, execute
/// each command as soon as it completes. Commands decoded ahead of an
/// error in the same chunk have already executed by the time the error
/// surfaces.
async fn serve_connection(
    mut stream: TcpStream,
    config: EtlConfig,
    events: Events,
) -> Result<()> {
    let mut decoder = Decoder::with_length_unit(config.length_unit);
    let mut dispatcher = Dispatcher::new(FrameStack::new(config, events));
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                dispatcher.agent_mut().close();
                return Err(e.into());
            }
        };
        for &b in &buf[..n] {
            match decoder.feed(b) {
                Ok(Some(cmd)) => dispatcher.execute(cmd),
                Ok(None) => {}
                Err(e) => {
                    dispatcher.agent_mut().close();
                    return Err(e.into());
                }
            }
        }
    }
    dispatcher.agent_mut().close();
    Ok(())
}
