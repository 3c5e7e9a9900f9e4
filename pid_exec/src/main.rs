//! # PID Drive Executable
//!
//! Drives a simulated car around a track. Telemetry frames arrive from the simulator bridge, each
//! one is run through drive control and the resulting steering and throttle demands are sent back.
//!
//! # Architecture
//!
//!     - Initialise session, logging and parameters
//!     - Initialise DriveCtrl and the telemetry server
//!     - Main loop:
//!         - Recieve a frame from the simulator
//!         - Decode and dispatch it, running a control tick for telemetry
//!         - Send the reply
//!         - Archive the tick

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{Result, eyre::WrapErr};
use log::{info, trace, warn};
use structopt::StructOpt;

// Internal
use pid_lib::{
    cli::Opts,
    dispatch,
    drive_ctrl::{DriveCtrl, InitData},
    params::PidExecParams,
    tlm_server::{Reply, TlmServer, TlmServerError},
};
use util::{
    archive::Archived,
    logger::logger_init,
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new(
        "pid_exec",
        &opts.sessions_dir
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("PID Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut params: PidExecParams = match opts.params {
        Some(ref p) => util::params::load::<PidExecParams>(p)
            .wrap_err_with(|| format!("Could not load parameters from {}", p))?,
        None => {
            info!("No parameter file given, using defaults");
            PidExecParams::default()
        }
    };

    if opts.apply_gains(&mut params.drive_ctrl)
        .wrap_err("Invalid command line gains")?
    {
        info!("Gains overridden from the command line");
    }

    info!("Parameters loaded:");
    info!("    Steering gains: {:?}", params.drive_ctrl.steer);
    info!("    Throttle gains: {:?}", params.drive_ctrl.throttle);
    info!("    Target speed: {}", params.drive_ctrl.target_speed);

    // ---- INITIALISE MODULES ----

    let mut drive_ctrl = DriveCtrl::default();
    drive_ctrl.init(InitData {
        params: params.drive_ctrl,
        session: Some(session.clone())
    }).wrap_err("Failed to initialise DriveCtrl")?;
    info!("DriveCtrl init complete");

    // ---- INITIALISE NETWORK ----

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let mut tlm_server = TlmServer::new(&zmq_ctx, &params.net)
        .wrap_err("Failed to initialise the TlmServer")?;

    info!("Listening on {}", params.net.tlm_endpoint);

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut connected = false;

    loop {
        // Report changes in the connection
        if tlm_server.is_connected() != connected {
            connected = !connected;
            match connected {
                true => info!("Connected, {} client(s)", tlm_server.num_clients()),
                false => warn!("Disconnected")
            }
        }

        let frame = match tlm_server.recv_frame() {
            Ok(Some(f)) => f,
            Ok(None) => continue,
            Err(TlmServerError::NonUtf8Frame) => {
                warn!("Recieved a frame which was not valid UTF-8");
                continue
            },
            Err(e) => return Err(e)
                .wrap_err("An error occured while recieving frames from the client")
        };

        // Anything that couldn't be decoded gets no reply, the simulator will send the next frame
        let reply = match dispatch::handle_frame(&mut drive_ctrl, &frame) {
            Ok(r) => r,
            Err(e) => {
                warn!("Could not decode frame {:?}: {}", frame, e);
                Reply::None
            }
        };

        match reply.to_frame() {
            Ok(f) if !f.is_empty() => trace!("{}", f),
            _ => ()
        }

        if let Err(e) = tlm_server.send_reply(&reply) {
            warn!("Could not send reply: {}", e);
        }

        // ---- WRITE ARCHIVES ----

        if let Reply::Steer(_) = reply {
            if let Err(e) = drive_ctrl.write() {
                warn!("Could not archive DriveCtrl: {}", e);
            }
        }
    }
}
