//! # Network Module
//!
//! This module provides networking abstractions over ZMQ. The simulator's websocket is bridged
//! onto a ZMQ request/reply pair, one request per inbound text frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, atomic::{AtomicBool, AtomicUsize, Ordering}},
    thread
};
use log::warn;
use serde::Deserialize;
use zmq::{Socket, Context, SocketType, SocketEvent};

// Export zmq
pub use zmq;

// ------------------------------------------------------------------------------------------------
// MACROS
// ------------------------------------------------------------------------------------------------

macro_rules! set_sockopts {
    ($socket:expr, $(($opt:ident, $val:expr)),+) => {
        $(
            $socket.$opt($val)
                .map_err(|e| MonitoredSocketError::SocketOptionError(stringify!($opt).into(), e))?;
        )+
    };
}

// ------------------------------------------------------------------------------------------------
// STATICS
// ------------------------------------------------------------------------------------------------

/// Counter used to give each monitor its own inproc endpoint.
static NUM_MONITORS: AtomicUsize = AtomicUsize::new(0);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Network parameters, the `[net]` table of the executable's parameter file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetParams {
    /// Endpoint the telemetry server binds to. The simulator bridge connects here.
    pub tlm_endpoint: String,
}

/// A zmq socket with a background thread watching its connection events.
///
/// A bound socket may have several peers (for example a restarted simulator bridge which has not
/// yet been dropped by the heartbeat), so the number of live peers is counted rather than kept
/// as a flag.
pub struct MonitoredSocket {
    socket: Socket,

    monitor_thread: Option<thread::JoinHandle<()>>,

    stop: Arc<AtomicBool>,

    peers: Arc<AtomicUsize>
}

/// Options applied to a [`MonitoredSocket`] when it is created.
///
/// Apart from `bind` and `block_on_first_connect` these map directly onto `zmq_setsockopt`
/// options, with zmq's own defaults.
pub struct SocketOptions {

    /// Bind to the endpoint (servers) instead of connecting to it (clients). Defaults to `false`.
    pub bind: bool,

    /// Wait in [`MonitoredSocket::new`] until the first connection is made. Defaults to `true`,
    /// bound sockets should turn this off.
    pub block_on_first_connect: bool,

    /// `ZMQ_REQ_CORRELATE`, REQ sockets only
    pub req_correlate: bool,

    /// `ZMQ_REQ_RELAXED`, REQ sockets only. Lets a client resend after a lost reply.
    pub req_relaxed: bool,

    /// `ZMQ_LINGER` in ms
    pub linger: i32,

    /// `ZMQ_CONNECT_TIMEOUT` in ms
    pub connect_timeout: i32,

    /// `ZMQ_RCVTIMEO` in ms, receives return `EAGAIN` after this
    pub recv_timeout: i32,

    /// `ZMQ_SNDTIMEO` in ms, sends return `EAGAIN` after this
    pub send_timeout: i32,

    /// `ZMQ_HEARTBEAT_IVL` in ms
    pub heartbeat_ivl: i32,

    /// `ZMQ_HEARTBEAT_TIMEOUT` in ms
    pub heartbeat_timeout: i32,

    /// `ZMQ_HEARTBEAT_TTL` in ms
    pub heartbeat_ttl: i32
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum MonitoredSocketError {
    #[error("Could not create a zmq socket: {0}")]
    CreateSocketError(zmq::Error),

    #[error("Could not attach a monitor to the socket: {0}")]
    MonitoringEnableError(zmq::Error),

    #[error("Could not bind or connect the socket: {0}")]
    CouldNotConnect(zmq::Error),

    #[error("The socket reported {0:?} before its first connection")]
    UnexpectedEvent(SocketEvent),

    #[error("Could not read an event from the monitor: {0}")]
    EventReadError(zmq::Error),

    #[error("Could not set the {0} socket option: {1}")]
    SocketOptionError(String, zmq::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MonitoredSocket {
    /// Create a socket of the given type on `endpoint` and start monitoring it.
    ///
    /// The options are applied before the socket is bound or connected. If
    /// `socket_options.block_on_first_connect` is set this only returns once a peer has connected.
    pub fn new(
        ctx: &Context, 
        socket_type: SocketType,
        socket_options: SocketOptions,
        endpoint: &str
    ) -> Result<Self, MonitoredSocketError> {
        let socket = ctx.socket(socket_type)
            .map_err(MonitoredSocketError::CreateSocketError)?;

        // The monitor is a PAIR socket listening on a private inproc endpoint
        let monitor_endpoint = format!(
            "inproc://monitor_{}", 
            NUM_MONITORS.fetch_add(1, Ordering::Relaxed)
        );
        socket.monitor(&monitor_endpoint, SocketEvent::ALL as i32)
            .map_err(MonitoredSocketError::MonitoringEnableError)?;
        let monitor = ctx.socket(zmq::PAIR)
            .map_err(MonitoredSocketError::CreateSocketError)?;
        monitor.connect(&monitor_endpoint)
            .map_err(MonitoredSocketError::CouldNotConnect)?;

        socket_options.set(&socket)?;

        match socket_options.bind {
            true => socket.bind(endpoint),
            false => socket.connect(endpoint)
        }.map_err(MonitoredSocketError::CouldNotConnect)?;

        let peers = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        if socket_options.block_on_first_connect {
            loop {
                match read_event(&monitor).map_err(MonitoredSocketError::EventReadError)? {
                    SocketEvent::CONNECTED | SocketEvent::ACCEPTED => break,
                    SocketEvent::CONNECT_DELAYED | SocketEvent::LISTENING => continue,
                    e => return Err(MonitoredSocketError::UnexpectedEvent(e))
                }
            }

            peers.store(1, Ordering::Relaxed);
        }

        let monitor_thread = {
            let stop = stop.clone();
            let peers = peers.clone();
            thread::spawn(move || monitor_socket(monitor, monitor_endpoint, stop, peers))
        };

        Ok(Self {
            socket,
            monitor_thread: Some(monitor_thread),
            stop,
            peers
        })
    }

    /// Return if the socket has at least one peer connected.
    pub fn connected(&self) -> bool {
        self.num_peers() > 0
    }

    /// Number of peers currently connected to the socket.
    pub fn num_peers(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }
}

impl Drop for MonitoredSocket {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);

        // An idle monitor may never see another event, so detach it rather than join
        self.monitor_thread.take();
    }
}

impl std::ops::Deref for MonitoredSocket {
    type Target = Socket;

    fn deref(&self) -> &Self::Target {
        &self.socket
    }
}

impl std::ops::DerefMut for MonitoredSocket {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.socket
    }
}

impl SocketOptions {
    /// Apply these options to the given socket.
    pub fn set(&self, socket: &Socket) -> Result<(), MonitoredSocketError> {
        set_sockopts!(
            socket,
            (set_connect_timeout, self.connect_timeout),
            (set_heartbeat_ivl, self.heartbeat_ivl),
            (set_heartbeat_timeout, self.heartbeat_timeout),
            (set_heartbeat_ttl, self.heartbeat_ttl),
            (set_linger, self.linger),
            (set_rcvtimeo, self.recv_timeout),
            (set_sndtimeo, self.send_timeout)
        );

        if let Ok(SocketType::REQ) = socket.get_socket_type() {
            set_sockopts!(
                socket,
                (set_req_correlate, self.req_correlate),
                (set_req_relaxed, self.req_relaxed)
            );
        }

        Ok(())
    }
}

impl Default for NetParams {
    fn default() -> Self {
        Self {
            tlm_endpoint: String::from("tcp://*:4567")
        }
    }
}

impl Default for SocketOptions {
    fn default() -> Self {
        Self {
            bind: false,
            block_on_first_connect: true,
            req_correlate: false,
            req_relaxed: false,
            linger: 30_000,
            connect_timeout: 0,
            recv_timeout: -1,
            send_timeout: -1,
            heartbeat_ivl: 0,
            heartbeat_timeout: 0,
            heartbeat_ttl: 0
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Read one event from a monitor socket.
///
/// Monitor events are two frames: the event id and value, then the peer address.
fn read_event(monitor: &Socket) -> Result<SocketEvent, zmq::Error> {
    let msg = monitor.recv_msg(0)?;

    if msg.len() < 2 || !monitor.get_rcvmore()? {
        return Err(zmq::Error::EINVAL)
    }

    let event = SocketEvent::from_raw(u16::from_ne_bytes([msg[0], msg[1]]));

    monitor.recv_msg(0)?;

    Ok(event)
}

/// Apply a connection event to the peer count.
fn update_peers(peers: &AtomicUsize, event: SocketEvent) {
    match event {
        SocketEvent::CONNECTED | SocketEvent::ACCEPTED => {
            peers.fetch_add(1, Ordering::Relaxed);
        },
        SocketEvent::DISCONNECTED => {
            // Saturate at zero, a disconnect can be seen for a peer counted before monitoring
            let _ = peers.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
        },
        _ => ()
    }
}

fn monitor_socket(
    monitor: Socket,
    monitor_endpoint: String,
    stop: Arc<AtomicBool>,
    peers: Arc<AtomicUsize>
) {
    while !stop.load(Ordering::Relaxed) {
        match read_event(&monitor) {
            Ok(e) => update_peers(&peers, e),
            Err(e) => {
                warn!("Stopping monitor {}, could not read event: {}", monitor_endpoint, e);
                peers.store(0, Ordering::Relaxed);
                return
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_net_params_default() {
        let params: NetParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.tlm_endpoint, "tcp://*:4567");

        let params: NetParams = serde_json::from_str(r#"{"tlm_endpoint": "tcp://*:5000"}"#)
            .unwrap();
        assert_eq!(params.tlm_endpoint, "tcp://*:5000");
    }

    #[test]
    fn test_peer_count() {
        let peers = AtomicUsize::new(0);

        update_peers(&peers, SocketEvent::DISCONNECTED);
        assert_eq!(peers.load(Ordering::Relaxed), 0);

        update_peers(&peers, SocketEvent::ACCEPTED);
        update_peers(&peers, SocketEvent::ACCEPTED);
        update_peers(&peers, SocketEvent::LISTENING);
        assert_eq!(peers.load(Ordering::Relaxed), 2);

        update_peers(&peers, SocketEvent::DISCONNECTED);
        assert_eq!(peers.load(Ordering::Relaxed), 1);
        update_peers(&peers, SocketEvent::CLOSED);
        assert_eq!(peers.load(Ordering::Relaxed), 1);
    }
}
