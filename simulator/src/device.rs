//! Simulated reader: turns console input and server commands into device messages.

use log::{info, warn};
use tagportal_shared::nfc::{BLOCK_SIZE, UidError, Uid};
use tagportal_shared::protocol::{DeviceMessage, HexBytes, ServerMessage};
use tokio::time::Instant;

use crate::tags::TagField;
use crate::wifi::Wifi;

/// SAK reported for every simulated tag (MIFARE Classic 1K)
const SIMULATED_SAK: u8 = 0x08;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Tap(Uid),
    Remove,
    Help,
}

impl Command {
    /// Parses one console line. Blank lines give `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let rest: Vec<&str> = words.collect();

        match verb.to_ascii_lowercase().as_str() {
            "tap" => {
                if rest.is_empty() {
                    return Err("usage: tap <UID>".into());
                }
                Uid::parse(&rest.join(""))
                    .map(|uid| Some(Command::Tap(uid)))
                    .map_err(|e: UidError| format!("invalid UID: {}", e))
            }
            "remove" => Ok(Some(Command::Remove)),
            "help" | "?" => Ok(Some(Command::Help)),
            other => Err(format!("unknown command '{}', try 'help'", other)),
        }
    }
}

pub const HELP: &str = "Commands:
  tap <UID>   put a tag in the field (e.g. tap 6B695BDE)
  remove      take the tag out of the field
  help        show this list";

pub struct Device {
    pub field: TagField,
    pub wifi: Wifi,
    started: Instant,
    /// Last frame received for the display
    pub display: Vec<String>,
}

impl Device {
    pub fn new(wifi: Wifi) -> Self {
        Self {
            field: TagField::default(),
            wifi,
            started: Instant::now(),
            display: Vec::new(),
        }
    }

    pub fn tap(&mut self, uid: Uid) -> DeviceMessage {
        match self.field.present() {
            Some(previous) if *previous != uid => info!("Tag {} replaced by {}", previous, uid),
            _ => info!("Tag {} entered the field", uid),
        }
        let area = self.field.tap(uid.clone());
        DeviceMessage::TagDetected {
            uid,
            sak: Some(SIMULATED_SAK),
            block: Some(HexBytes(area)),
        }
    }

    pub fn remove(&mut self) -> Option<DeviceMessage> {
        let uid = self.field.remove()?;
        info!("Tag {} left the field", uid);
        Some(DeviceMessage::TagRemoved)
    }

    pub fn heartbeat(&self) -> DeviceMessage {
        DeviceMessage::Heartbeat {
            uptime: self.started.elapsed().as_secs(),
        }
    }

    /// Applies a server command and returns the messages to send back.
    pub async fn handle(&mut self, msg: ServerMessage) -> Vec<DeviceMessage> {
        match msg {
            ServerMessage::WriteBlock {
                request_id,
                block_number,
                block,
            } => {
                let result = self.field.write_present(block_number, &block.0);
                match &result {
                    Ok(()) => info!(
                        "Wrote {} block(s) at block {}",
                        block.0.len() / BLOCK_SIZE,
                        block_number
                    ),
                    Err(e) => warn!("Write at block {} failed: {}", block_number, e),
                }
                vec![command_result(request_id, result)]
            }

            ServerMessage::SwitchWifiMode { request_id, target } => {
                info!("Switching to {} mode", target);
                let status = self.wifi.switch_to(target).await;
                let result = if self.wifi.mode() == target {
                    Ok(())
                } else {
                    Err(format!("could not enter {} mode", target))
                };
                vec![command_result(request_id, result), status]
            }

            ServerMessage::ConfigureWifi {
                request_id,
                ssid,
                password,
            } => {
                self.wifi.configure(ssid, password);
                vec![command_result(request_id, Ok(()))]
            }

            ServerMessage::Display { lines } => {
                self.display = lines;
                vec![]
            }
        }
    }
}

fn command_result(request_id: String, result: Result<(), String>) -> DeviceMessage {
    DeviceMessage::CommandResult {
        request_id,
        success: result.is_ok(),
        error: result.err(),
    }
}

/// Draws a display frame the size of the reader's OLED.
pub fn render_display(lines: &[String]) -> String {
    const WIDTH: usize = 21;
    let border = format!("+{}+", "-".repeat(WIDTH));
    let mut out = border.clone();
    for line in lines {
        out.push_str(&format!("\n|{:<WIDTH$}|", line));
    }
    out.push('\n');
    out.push_str(&border);
    out
}
