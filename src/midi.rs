//! MIDI input transport
//!
//! Wraps a midir input connection. The midir callback runs on its own
//! thread, so parsed [`MidiEvent`]s are forwarded over a crossbeam channel
//! to the REPL loop, which owns the engine.

use anyhow::{anyhow, Result};
use crossbeam_channel::Sender;
use etude_core::clock::{Clock, SystemClock};
use etude_core::MidiEvent;
use midir::{Ignore, MidiInput, MidiInputConnection};

const CLIENT_NAME: &str = "Etude";

fn new_client() -> Result<MidiInput> {
    let mut midi_in = MidiInput::new(CLIENT_NAME)?;
    midi_in.ignore(Ignore::All);
    Ok(midi_in)
}

/// Owner of at most one open MIDI input connection
pub struct MidiInputHandle {
    connection: Option<MidiInputConnection<()>>,
    port_name: Option<String>,
    clock: SystemClock,
}

impl MidiInputHandle {
    /// Events are stamped with `clock`, which must share its origin with the
    /// engine's clock so response times line up
    pub fn new(clock: SystemClock) -> Self {
        MidiInputHandle {
            connection: None,
            port_name: None,
            clock,
        }
    }

    /// List available MIDI input ports.
    /// Creating a client can fail transiently on macOS, so this retries.
    pub fn list_ports() -> Result<Vec<String>> {
        let mut last_err = None;
        for attempt in 0..3 {
            if attempt > 0 {
                std::thread::sleep(std::time::Duration::from_millis(100));
            }
            match new_client() {
                Ok(midi_in) => {
                    return Ok(midi_in
                        .ports()
                        .iter()
                        .filter_map(|p| midi_in.port_name(p).ok())
                        .collect());
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(anyhow!(
            "MIDI initialization failed after 3 attempts: {:?}",
            last_err
        ))
    }

    /// Connect to the first port whose name contains `port_name` and forward
    /// its note events to `tx`. Returns the full port name.
    pub fn connect(&mut self, port_name: &str, tx: Sender<MidiEvent>) -> Result<String> {
        self.disconnect();

        let midi_in = new_client()?;
        let ports = midi_in.ports();
        let port = ports
            .iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .map(|name| name.contains(port_name))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("MIDI port '{}' not found", port_name))?;
        let actual_name = midi_in.port_name(port)?;

        let clock = self.clock;
        let connection = midi_in
            .connect(
                port,
                "etude-in",
                move |_stamp, message, _| {
                    if let Some(event) = MidiEvent::from_bytes(message, clock.now_ms()) {
                        let _ = tx.send(event);
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", actual_name, e))?;

        tracing::info!("Listening on MIDI input {}", actual_name);
        self.connection = Some(connection);
        self.port_name = Some(actual_name.clone());
        Ok(actual_name)
    }

    /// Close the connection; returns false if nothing was connected
    pub fn disconnect(&mut self) -> bool {
        match self.connection.take() {
            Some(connection) => {
                connection.close();
                if let Some(name) = self.port_name.take() {
                    tracing::info!("Closed MIDI input {}", name);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn connected_port(&self) -> Option<&str> {
        self.port_name.as_deref()
    }
}

impl Drop for MidiInputHandle {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_starts_disconnected() {
        let mut handle = MidiInputHandle::new(SystemClock::new());
        assert!(!handle.is_connected());
        assert_eq!(handle.connected_port(), None);
        assert!(!handle.disconnect());
    }

    #[test]
    fn test_list_ports() {
        // May fail on systems without a MIDI backend (like CI)
        match MidiInputHandle::list_ports() {
            Ok(ports) => println!("Found {} MIDI input ports", ports.len()),
            Err(e) => println!("MIDI unavailable: {}", e),
        }
    }

    #[test]
    fn test_connect_to_missing_port_fails() {
        let (tx, _rx) = crossbeam_channel::unbounded();
        let mut handle = MidiInputHandle::new(SystemClock::new());
        let result = handle.connect("no such port \u{1F3B9} etude", tx);
        assert!(result.is_err());
        assert!(!handle.is_connected());
    }
}
