// Serial protocol for the H-bridge controller board
//
// One fixed-size frame per wheel write:
// [0xFF, 0xFF, Channel, Direction, Speed_lo, Speed_hi, Checksum]
// The checksum is the inverted low byte of the sum of every byte after the
// header. The board acknowledges each frame with a single ACK byte.

use serialport::{self, SerialPort};
use std::io::{Read, Write};
use std::time::Duration;
use tracing::{debug, info};

use super::driver::{DriverError, MotorDriver, MotorState, WheelSide};

/// Default serial configuration for the controller board
pub const DEFAULT_BAUDRATE: u32 = 115_200;
pub const DEFAULT_TIMEOUT_MS: u64 = 50;

/// Frame header bytes
const HEADER: [u8; 2] = [0xFF, 0xFF];

/// Acknowledge byte sent back by the board for every accepted frame
const ACK: u8 = 0x06;

/// Negative acknowledge: frame rejected (bad checksum, driver fault)
const NAK: u8 = 0x15;

const FRAME_LEN: usize = 7;

/// PWM channel assignment on the controller board
#[repr(u8)]
#[derive(Debug, Clone, Copy)]
pub enum Channel {
    Left = 3,
    Right = 4,
}

impl From<WheelSide> for Channel {
    fn from(side: WheelSide) -> Self {
        match side {
            WheelSide::Left => Channel::Left,
            WheelSide::Right => Channel::Right,
        }
    }
}

/// Direction pin pattern (bit 0 = IN1, bit 1 = IN2)
fn direction_bits(state: MotorState) -> u8 {
    match state {
        MotorState::Advancing => 0b01,
        MotorState::Reversing => 0b10,
        MotorState::Braking => 0b00,
    }
}

/// Calculate checksum for a frame body (excluding header)
fn checksum(data: &[u8]) -> u8 {
    let sum: u16 = data.iter().map(|&b| b as u16).sum();
    (!sum & 0xFF) as u8
}

/// Build the frame for one wheel command
fn build_frame(side: WheelSide, state: MotorState, speed: u16) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[..2].copy_from_slice(&HEADER);
    frame[2] = Channel::from(side) as u8;
    frame[3] = direction_bits(state);
    frame[4..6].copy_from_slice(&speed.to_le_bytes());
    frame[6] = checksum(&frame[2..6]);
    frame
}

/// Motor driver talking to the controller board over a serial port
pub struct SerialMotorDriver {
    port: Box<dyn SerialPort>,
}

impl SerialMotorDriver {
    /// Open a new connection to the controller board
    pub fn open(port_name: &str) -> Result<Self, DriverError> {
        Self::open_with_baudrate(port_name, DEFAULT_BAUDRATE)
    }

    /// Open with custom baudrate
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self, DriverError> {
        info!("Opening motor controller on {} @ {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }

    fn read_ack(&mut self, side: WheelSide) -> Result<(), DriverError> {
        let mut reply = [0u8; 1];
        let read = self.port.read_exact(&mut reply).map(|()| reply[0]);
        parse_reply(side, read)
    }
}

/// Map the board's one-byte reply (or the read failure) to a write result
fn parse_reply(side: WheelSide, read: std::io::Result<u8>) -> Result<(), DriverError> {
    let reply = read.map_err(|e| {
        if e.kind() == std::io::ErrorKind::TimedOut {
            DriverError::Unavailable
        } else {
            DriverError::Io(e)
        }
    })?;

    match reply {
        ACK => Ok(()),
        NAK => Err(DriverError::Rejected {
            side,
            reason: "controller returned NAK".to_string(),
        }),
        other => Err(DriverError::Rejected {
            side,
            reason: format!("unexpected reply 0x{:02X}", other),
        }),
    }
}

impl MotorDriver for SerialMotorDriver {
    fn write(
        &mut self,
        side: WheelSide,
        state: MotorState,
        speed: u16,
    ) -> Result<(), DriverError> {
        let frame = build_frame(side, state, speed);
        debug!("Write {:?} wheel: {:?} @ {} -> {:02X?}", side, state, speed, frame);
        self.port.write_all(&frame)?;
        self.port.flush()?;
        self.read_ack(side)
    }
}
