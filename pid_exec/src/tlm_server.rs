//! # Telemetry Server
//!
//! The server accepts connections from the simulator bridge. Each request carries one websocket
//! text frame from the simulator, and each reply carries the frame to send back. Since a REP socket
//! must answer every request, frames which need no answer are replied to with an empty string.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    tlm::{self, SteerCmd},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Telemetry server
pub struct TlmServer {
    socket: MonitoredSocket,

    /// Set when a request has been received and not yet replied to.
    reply_pending: bool
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A reply to a frame from the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    /// Nothing needs to be sent to the simulator.
    None,

    /// Hand control of the car back to the user.
    Manual,

    /// Steering and throttle demands.
    Steer(SteerCmd)
}

#[derive(Debug, thiserror::Error)]
pub enum TlmServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not recieve a frame from the client: {0}")]
    RecvError(zmq::Error),

    #[error("Could not send the reply to the client: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the reply: {0}")]
    SerializationError(serde_json::Error),

    #[error("The client sent a frame which was not valid UTF-8")]
    NonUtf8Frame,

    #[error("A reply was sent without a pending request")]
    NoPendingRequest
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TlmServer {
    /// Create a new instance of the TLM Server.
    ///
    /// This function will not block until the client connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, TlmServerError> {
        let socket_options = SocketOptions {
            bind: true,
            block_on_first_connect: false,
            heartbeat_ivl: 500,
            heartbeat_ttl: 1000,
            heartbeat_timeout: 1000,
            linger: 1,
            recv_timeout: 200,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::REP,
            socket_options,
            &params.tlm_endpoint
        ).map_err(TlmServerError::SocketError)?;

        Ok(Self {
            socket,
            reply_pending: false
        })
    }

    /// Check if the client is connected to the server
    pub fn is_connected(&self) -> bool {
        self.socket.connected()
    }

    /// Number of bridges connected to the server.
    pub fn num_clients(&self) -> usize {
        self.socket.num_peers()
    }

    /// Recieve a single frame from the client.
    ///
    /// Returns `Ok(None)` if no frame arrived before the receive timeout. After a frame is returned
    /// [`TlmServer::send_reply`] should be called before receiving again, otherwise the empty reply
    /// is sent first. If the frame is not valid UTF-8 the empty reply is sent by this function.
    pub fn recv_frame(&mut self) -> Result<Option<String>, TlmServerError> {
        // The socket can't recieve until the last request has been answered
        if self.reply_pending {
            self.send_reply(&Reply::None)?;
        }

        let frame = match self.socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                self.reply_pending = true;
                self.send_reply(&Reply::None)?;
                return Err(TlmServerError::NonUtf8Frame)
            },
            Err(zmq::Error::EAGAIN) => return Ok(None),
            Err(e) => return Err(TlmServerError::RecvError(e))
        };

        self.reply_pending = true;

        Ok(Some(frame))
    }

    /// Send the reply to the last received frame.
    pub fn send_reply(&mut self, reply: &Reply) -> Result<(), TlmServerError> {
        if !self.reply_pending {
            return Err(TlmServerError::NoPendingRequest)
        }

        let reply_str = reply.to_frame()?;

        self.socket.send(reply_str.as_str(), 0)
            .map_err(TlmServerError::SendError)?;

        self.reply_pending = false;

        Ok(())
    }
}

impl Reply {
    /// Get the text frame for this reply, empty if there is nothing to send.
    pub fn to_frame(&self) -> Result<String, TlmServerError> {
        match self {
            Reply::None => Ok(String::new()),
            Reply::Manual => Ok(String::from(tlm::MANUAL_FRAME)),
            Reply::Steer(cmd) => tlm::encode_steer(cmd)
                .map_err(TlmServerError::SerializationError)
        }
    }
}
