//! TagPortal reader simulator
//!
//! Stands in for the ESP32 reader: joins a (simulated) WiFi network, connects
//! to the server's device socket and lets you tap virtual tags from the console.
//!
//! # Usage
//! ```bash
//! # Station mode against a local server
//! TAGPORTAL_CLIENT_SSID=HomeNet cargo run -p tagportal-simulator
//!
//! # Force the access point fallback
//! SIM_STATION_AVAILABLE=0 cargo run -p tagportal-simulator
//! ```
//!
//! # Console commands
//! - `tap <UID>`: put a tag in the field
//! - `remove`: take it out again
//! - `help`: list commands

mod config;
mod device;
mod tags;
mod wifi;

use std::time::Duration;

use anyhow::Context;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tagportal_shared::protocol::{DeviceMessage, ServerMessage};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::config::Settings;
use crate::device::{Command, Device};
use crate::wifi::Wifi;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

type DeviceSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env();
    info!("TagPortal simulator starting...");

    let mut device = Device::new(Wifi::new(settings.wifi.clone(), settings.station_available));
    let network = device.wifi.start().await;

    let url = settings.device_url();
    let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {}", url))?;
    info!("Connected to {}", url);

    let (mut sink, mut stream) = socket.split();
    send(&mut sink, &network).await?;

    println!("{}", device::HELP);

    let mut console = BufReader::new(tokio::io::stdin()).lines();
    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(msg) => {
                            let is_display = matches!(msg, ServerMessage::Display { .. });
                            for reply in device.handle(msg).await {
                                send(&mut sink, &reply).await?;
                            }
                            if is_display {
                                println!("{}", device::render_display(&device.display));
                            }
                        }
                        Err(e) => warn!("Invalid server message: {}", e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    info!("Server closed the connection");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("device socket failed"),
            },

            line = console.next_line() => {
                let Some(line) = line? else {
                    info!("Console closed, shutting down");
                    break;
                };
                match Command::parse(&line) {
                    Ok(Some(Command::Tap(uid))) => {
                        let msg = device.tap(uid);
                        send(&mut sink, &msg).await?;
                    }
                    Ok(Some(Command::Remove)) => match device.remove() {
                        Some(msg) => send(&mut sink, &msg).await?,
                        None => println!("No tag in the field"),
                    },
                    Ok(Some(Command::Help)) => println!("{}", device::HELP),
                    Ok(None) => {}
                    Err(e) => println!("{}", e),
                }
            }

            _ = heartbeat.tick() => {
                send(&mut sink, &device.heartbeat()).await?;
            }
        }
    }

    let _ = sink.close().await;
    Ok(())
}

async fn send(sink: &mut DeviceSink, msg: &DeviceMessage) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    debug!("-> {}", json);
    sink.send(Message::Text(json.into())).await?;
    Ok(())
}
