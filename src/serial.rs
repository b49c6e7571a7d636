// Background serial worker for the weather sensor.
//
// The worker thread owns the port exclusively: the UI talks to it through a
// command channel and receives parsed samples through a data channel. Both
// channels are std mpsc, so samples arrive in read order and the worker never
// blocks on a slow consumer.

use std::io::{Read, Write};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Read timeout passed to the port; also the worst-case stop latency.
const READ_TIMEOUT: Duration = Duration::from_secs(2);
/// The Arduino resets when the port opens; give it time to come back up.
const SETTLE_DELAY: Duration = Duration::from_secs(2);
/// Per-iteration sleep so the poll loop doesn't hog a core.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Device command characters (see weather.ino).
pub const CMD_START_RECORDING: char = '1';
pub const CMD_STOP_RECORDING: char = '0';

/// One parsed sensor reading.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub status: String,
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
}

#[derive(Debug, Clone)]
pub enum SerialMessage {
    Sample(Sample),
    Error(String),
}

#[derive(Debug, Clone)]
enum SerialCmd {
    Write(char),
    Stop,
}

/// Handle to the polling thread. Dropping it without calling `stop` leaves
/// the thread running until its command channel disconnects.
pub struct SerialWorker {
    cmd_tx: Sender<SerialCmd>,
    handle: Option<JoinHandle<()>>,
}

impl SerialWorker {
    /// Spawns the polling thread. The port is opened on the worker side, so
    /// an open failure arrives as a `SerialMessage::Error` on the returned
    /// receiver and ends that session; there is no automatic retry.
    pub fn start(port_name: String, baud_rate: u32) -> (Self, Receiver<SerialMessage>) {
        let (cmd_tx, cmd_rx) = channel::<SerialCmd>();
        let (data_tx, data_rx) = channel::<SerialMessage>();

        let handle = thread::spawn(move || poll_loop(port_name, baud_rate, cmd_rx, data_tx));

        (
            Self {
                cmd_tx,
                handle: Some(handle),
            },
            data_rx,
        )
    }

    /// Queues a single-character command for the device ('1' start, '0' stop).
    pub fn send_command(&self, command: char) {
        let _ = self.cmd_tx.send(SerialCmd::Write(command));
    }

    /// Signals the loop to terminate and joins the thread. Bounded by one
    /// loop pass (10 ms sleep, 2 s read timeout worst case).
    pub fn stop(mut self) {
        let _ = self.cmd_tx.send(SerialCmd::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn poll_loop(
    port_name: String,
    baud_rate: u32,
    cmd_rx: Receiver<SerialCmd>,
    data_tx: Sender<SerialMessage>,
) {
    let mut port = match serialport::new(&port_name, baud_rate)
        .timeout(READ_TIMEOUT)
        .open()
    {
        Ok(p) => p,
        Err(e) => {
            let _ = data_tx.send(SerialMessage::Error(format!(
                "Failed to open {}: {}",
                port_name, e
            )));
            return;
        }
    };

    thread::sleep(SETTLE_DELAY);

    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 256];

    loop {
        match cmd_rx.try_recv() {
            Ok(SerialCmd::Write(c)) => {
                let mut buf = [0u8; 4];
                let encoded = c.encode_utf8(&mut buf);
                if let Err(e) = port.write_all(encoded.as_bytes()) {
                    let _ = data_tx.send(SerialMessage::Error(format!(
                        "Failed to send command '{}': {}",
                        c, e
                    )));
                }
                let _ = port.flush();
            }
            Ok(SerialCmd::Stop) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        // Only read when the driver reports buffered bytes; transient errors
        // here are retried on the next pass.
        if let Ok(available) = port.bytes_to_read() {
            if available > 0 {
                if let Ok(n) = port.read(&mut chunk) {
                    pending.extend_from_slice(&chunk[..n]);
                    while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                        let raw: Vec<u8> = pending.drain(..=pos).collect();
                        let line = decode_line(&raw);
                        if let Some(sample) = parse_line(&line) {
                            let _ = data_tx.send(SerialMessage::Sample(sample));
                        }
                    }
                }
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Permissive decode of one raw record: non-ASCII bytes are dropped and the
/// line terminator trimmed. The wire format is plain ASCII.
fn decode_line(raw: &[u8]) -> String {
    let ascii: Vec<u8> = raw.iter().copied().filter(|b| b.is_ascii()).collect();
    String::from_utf8_lossy(&ascii).trim().to_string()
}

/// Parses `status,temp,hum,pres`. Lines without exactly four fields yield
/// nothing; a non-numeric value collapses the reading to the -1 sentinel
/// while keeping the status tag, so downstream still sees one record per
/// line.
pub fn parse_line(line: &str) -> Option<Sample> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 4 {
        return None;
    }

    let status = parts[0].to_string();
    match (
        parts[1].trim().parse::<f32>(),
        parts[2].trim().parse::<f32>(),
        parts[3].trim().parse::<f32>(),
    ) {
        (Ok(temperature), Ok(humidity), Ok(pressure)) => Some(Sample {
            status,
            temperature,
            humidity,
            pressure,
        }),
        _ => Some(Sample {
            status,
            temperature: -1.0,
            humidity: -1.0,
            pressure: -1.0,
        }),
    }
}
