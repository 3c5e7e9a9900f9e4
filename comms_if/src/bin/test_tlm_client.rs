//! Telemetry client test
//!
//! Stands in for the simulator bridge. A crude vehicle model is driven by the commands returned from
//! the server so the closed loop can be exercised without the simulator.

use comms_if::{
    net::{MonitoredSocket, SocketOptions},
    tlm::{SteerCmd, EVENT_HEADER, MANUAL_FRAME},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {

    // Create the context for zmq
    let ctx = zmq::Context::new();

    // Set the socket options
    let socket_options = SocketOptions {
        connect_timeout: 1000,
        heartbeat_ivl: 500,
        heartbeat_ttl: 1000,
        heartbeat_timeout: 1000,
        linger: 1,
        recv_timeout: 1000,
        send_timeout: 10,
        req_correlate: true,
        req_relaxed: true,
        ..Default::default()
    };

    // Create the socket
    let socket = match MonitoredSocket::new(
        &ctx,
        zmq::REQ,
        socket_options,
        "tcp://localhost:4567"
    ) {
        Ok(s) => s,
        Err(e) => {
            println!("Could not connect to the server");
            return Err(e.into())
        }
    };

    // Vehicle state
    let mut cte = 1.0f64;
    let mut speed = 0.0f64;
    let mut heading = 0.0f64;
    let mut cycle: u64 = 0;

    loop {
        if !socket.connected() {
            println!("Waiting for connection");
            std::thread::sleep(std::time::Duration::from_millis(1000));
            continue;
        }

        // Every so often send an event with no data to check the manual reply
        let frame = if cycle % 50 == 49 {
            String::from("42[\"telemetry\",null]")
        }
        else {
            format!(
                "42[\"telemetry\",{{\"cte\":\"{:.4}\",\"speed\":\"{:.4}\",\"steering_angle\":\"{:.4}\"}}]",
                cte, speed, heading
            )
        };
        cycle += 1;

        if let Err(e) = socket.send(frame.as_str(), 0) {
            println!("could not send: {}", e);
            std::thread::sleep(std::time::Duration::from_millis(1000));
            continue;
        }

        let reply = match socket.recv_string(0) {
            Ok(Ok(r)) => r,
            Ok(Err(_)) => {
                println!("server sent a non UTF-8 reply");
                continue;
            }
            Err(e) => {
                println!("could not read from server: {}", e);
                std::thread::sleep(std::time::Duration::from_millis(1000));
                continue;
            }
        };

        if reply.is_empty() {
            println!("no reply");
        }
        else if reply == MANUAL_FRAME {
            println!("manual");
        }
        else {
            // Strip the event header to get to the [name, command] pair
            let body = reply.strip_prefix(EVENT_HEADER).unwrap_or(&reply);
            let cmd: (String, SteerCmd) = match serde_json::from_str(body) {
                Ok(c) => c,
                Err(e) => {
                    println!("could not parse reply {:?}: {}", reply, e);
                    continue;
                }
            };
            println!("cte: {:+.4} speed: {:6.3} -> {:?}", cte, speed, cmd.1);

            // Step the vehicle model forward by one tick
            speed = (speed + 0.05 * cmd.1.throttle).max(0.0);
            heading += 0.05 * cmd.1.steering_angle;
            cte += 0.01 * speed * heading.sin();
        }

        std::thread::sleep(std::time::Duration::from_millis(50));
    }
}
