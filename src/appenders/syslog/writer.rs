//! Syslog transport with background reconnection
//!
//! UDP sends each flushed buffer as one datagram. TCP keeps a persistent
//! stream and frames each message as `"<octet-count> <payload>"`; when the
//! stream breaks, a single connector thread retries in the background and
//! hands the new stream back over a channel while the application keeps
//! logging (messages written while disconnected are dropped).

use super::facility::Transport;
use crate::core::{LifeCycle, LoggerError, Result, StatusManager};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs, UdpSocket};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Buffers above this size are released after a flush instead of reused
pub const MAX_LEN: usize = 8192;

pub const DEFAULT_RECONNECTION_DELAY: Duration = Duration::from_secs(30);

/// Opens stream connections to the syslog daemon
///
/// The default is [`TcpConnect`]; tests substitute their own to simulate
/// refused or dropped connections.
pub trait Connect: Send + Sync {
    fn connect(&self, addr: &SocketAddr) -> io::Result<Box<dyn Write + Send>>;
}

/// Plain TCP connections with connect and write timeouts
#[derive(Debug, Clone)]
pub struct TcpConnect {
    timeout: Duration,
}

impl TcpConnect {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpConnect {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Connect for TcpConnect {
    fn connect(&self, addr: &SocketAddr) -> io::Result<Box<dyn Write + Send>> {
        let stream = TcpStream::connect_timeout(addr, self.timeout)?;
        stream.set_write_timeout(Some(self.timeout))?;
        stream.set_nodelay(true)?;
        Ok(Box::new(stream))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Writer side of a running connector thread
struct ConnectorHandle {
    // dropping the sender interrupts the connector at its next wait
    _cancel: Sender<()>,
    results: Receiver<Box<dyn Write + Send>>,
}

enum Sink {
    Datagram(UdpSocket),
    Stream {
        stream: Option<Box<dyn Write + Send>>,
        connector: Option<ConnectorHandle>,
    },
}

pub struct SyslogWriter {
    host: String,
    port: u16,
    transport: Transport,
    addr: Option<SocketAddr>,
    sink: Option<Sink>,
    buf: Vec<u8>,
    connect: Arc<dyn Connect>,
    reconnection_delay: Duration,
    connector_spawns: usize,
    status: StatusManager,
}

impl SyslogWriter {
    pub fn new(host: impl Into<String>, port: u16, transport: Transport, status: &StatusManager) -> Self {
        Self {
            host: host.into(),
            port,
            transport,
            addr: None,
            sink: None,
            buf: Vec::with_capacity(256),
            connect: Arc::new(TcpConnect::default()),
            reconnection_delay: DEFAULT_RECONNECTION_DELAY,
            connector_spawns: 0,
            status: status.clone(),
        }
    }

    /// Wait between reconnection attempts; zero disables reconnection
    #[must_use]
    pub fn with_reconnection_delay(mut self, delay: Duration) -> Self {
        self.reconnection_delay = delay;
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connect: Arc<dyn Connect>) -> Self {
        self.connect = connect;
        self
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    /// Number of connector threads started so far
    pub fn connector_spawns(&self) -> usize {
        self.connector_spawns
    }

    fn origin(&self) -> String {
        format!("SyslogWriter[{}:{}]", self.host, self.port)
    }

    fn resolve(&self) -> Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| LoggerError::unknown_host(&self.host, e.to_string()))?
            .next()
            .ok_or_else(|| LoggerError::unknown_host(&self.host, "no address found"))
    }

    /// Append bytes to the pending message
    pub fn write(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Send the pending message and reset the buffer
    ///
    /// Stream failures are handled here: the connection is dropped, a warning
    /// goes to status and reconnection starts, and `Ok` is returned because
    /// the message is deliberately discarded. Datagram failures are returned.
    pub fn flush(&mut self) -> Result<()> {
        self.poll_connector();
        let result = self.send_pending();

        if self.buf.len() > MAX_LEN {
            self.buf = Vec::with_capacity(256);
        } else {
            self.buf.clear();
        }
        result
    }

    fn send_pending(&mut self) -> Result<()> {
        let addr = self.addr;
        let failure = match (self.sink.as_mut(), addr) {
            (Some(Sink::Datagram(socket)), Some(addr)) => {
                socket
                    .send_to(&self.buf, addr)
                    .map_err(|e| LoggerError::io_operation("sending syslog datagram", addr.to_string(), e))?;
                return Ok(());
            }
            (Some(Sink::Stream { stream, .. }), _) => {
                let Some(out) = stream.as_mut() else {
                    return Ok(());
                };
                match write_framed(&mut **out, &self.buf) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        *stream = None;
                        e
                    }
                }
            }
            _ => {
                return Err(LoggerError::NotStarted(format!(
                    "SyslogWriter[{}:{}]",
                    self.host, self.port
                )))
            }
        };

        self.status
            .add_warn(format!("Detected problem with connection: {}", failure), self.origin());
        self.fire_connector();
        Ok(())
    }

    /// Current connection state, after collecting any finished reconnect
    ///
    /// A datagram writer reports `Connected` once started.
    pub fn state(&mut self) -> ConnectionState {
        self.poll_connector();
        match self.sink {
            None => ConnectionState::Disconnected,
            Some(Sink::Datagram(_)) => ConnectionState::Connected,
            Some(Sink::Stream { ref stream, ref connector }) => {
                if stream.is_some() {
                    ConnectionState::Connected
                } else if connector.is_some() {
                    ConnectionState::Connecting
                } else {
                    ConnectionState::Disconnected
                }
            }
        }
    }

    fn poll_connector(&mut self) {
        if let Some(Sink::Stream { stream, connector }) = self.sink.as_mut() {
            let Some(handle) = connector.as_ref() else {
                return;
            };
            match handle.results.try_recv() {
                Ok(new_stream) => {
                    *stream = Some(new_stream);
                    *connector = None;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => *connector = None,
            }
        }
    }

    /// Start a connector unless one is running or reconnection is disabled
    fn fire_connector(&mut self) {
        if self.reconnection_delay.is_zero() {
            return;
        }
        let Some(addr) = self.addr else {
            return;
        };
        let origin = self.origin();
        let Some(Sink::Stream { connector, .. }) = self.sink.as_mut() else {
            return;
        };
        if connector.is_some() {
            return;
        }

        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(0);
        let (result_tx, result_rx) = crossbeam_channel::bounded(1);
        let task = ConnectorTask {
            connect: Arc::clone(&self.connect),
            addr,
            host: self.host.clone(),
            delay: self.reconnection_delay,
            cancel: cancel_rx,
            results: result_tx,
            status: self.status.clone(),
            origin: origin.clone(),
        };

        self.status.add_info("Starting a new connector thread.", origin.clone());
        let spawned = thread::Builder::new()
            .name(format!("syslog-connector-{}", self.host))
            .spawn(move || task.run());
        match spawned {
            Ok(_) => {
                *connector = Some(ConnectorHandle {
                    _cancel: cancel_tx,
                    results: result_rx,
                });
                self.connector_spawns += 1;
            }
            Err(e) => {
                self.status.add_error(format!("Failed to start connector thread: {}", e), origin);
            }
        }
    }

    /// Drop the connection and interrupt any running connector
    pub fn close(&mut self) {
        self.sink = None;
        self.buf.clear();
    }
}

fn write_framed(out: &mut (dyn Write + Send), payload: &[u8]) -> io::Result<()> {
    write!(out, "{} ", payload.len())?;
    out.write_all(payload)?;
    out.flush()
}

impl LifeCycle for SyslogWriter {
    /// Resolve the host and open the transport
    ///
    /// An unresolvable host fails the start. A refused initial TCP connection
    /// does not: the writer starts disconnected and reconnects in the
    /// background.
    fn start(&mut self) -> Result<()> {
        let addr = self.resolve()?;
        self.addr = Some(addr);

        match self.transport {
            Transport::Udp => {
                let local = if addr.is_ipv4() { "0.0.0.0:0" } else { "[::]:0" };
                let socket = UdpSocket::bind(local)
                    .map_err(|e| LoggerError::io_operation("binding syslog socket", local, e))?;
                self.sink = Some(Sink::Datagram(socket));
            }
            Transport::Tcp => {
                let stream = match self.connect.connect(&addr) {
                    Ok(stream) => Some(stream),
                    Err(e) => {
                        self.status.add_warn(
                            format!(
                                "Could not connect to remote syslog server at [{}]. We will try again later. ({})",
                                self.host, e
                            ),
                            self.origin(),
                        );
                        None
                    }
                };
                let connected = stream.is_some();
                self.sink = Some(Sink::Stream {
                    stream,
                    connector: None,
                });
                if !connected {
                    self.fire_connector();
                }
            }
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.close();
    }

    fn is_started(&self) -> bool {
        self.sink.is_some()
    }
}

/// State moved into a connector thread
struct ConnectorTask {
    connect: Arc<dyn Connect>,
    addr: SocketAddr,
    host: String,
    delay: Duration,
    cancel: Receiver<()>,
    results: Sender<Box<dyn Write + Send>>,
    status: StatusManager,
    origin: String,
}

impl ConnectorTask {
    fn run(self) {
        loop {
            match self.cancel.recv_timeout(self.delay) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    self.status.add_info("Connector interrupted. Leaving loop.", self.origin.clone());
                    return;
                }
            }

            self.status
                .add_info(format!("Attempting connection to {}", self.host), self.origin.clone());
            match self.connect.connect(&self.addr) {
                Ok(stream) => {
                    if self.results.send(stream).is_ok() {
                        self.status.add_info(
                            "Connection established. Exiting connector thread.",
                            self.origin.clone(),
                        );
                    }
                    return;
                }
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    self.status.add_info(
                        format!("Remote host {} refused connection.", self.host),
                        self.origin.clone(),
                    );
                }
                Err(e) => {
                    self.status.add_info(
                        format!("Could not connect to {}. Exception is {}", self.host, e),
                        self.origin.clone(),
                    );
                }
            }
        }
    }
}
