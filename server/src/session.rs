//! Reader session: what the device currently sees and what the display shows.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tagportal_shared::cards::{self, Card};
use tagportal_shared::ndef;
use tagportal_shared::nfc::{TagType, Uid};
use tagportal_shared::protocol::{HexBytes, ServerMessage, WifiMode};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkStatus {
    pub mode: WifiMode,
    pub ip: Option<Ipv4Addr>,
    pub ssid: Option<String>,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self {
            mode: WifiMode::Station,
            ip: None,
            ssid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub index: usize,
    pub name: &'static str,
    pub url: &'static str,
}

impl CardView {
    pub fn new(index: usize, card: &'static Card) -> Self {
        Self {
            index,
            name: card.name,
            url: card.url,
        }
    }
}

/// Tag currently in the reader field
#[derive(Debug, Clone, Serialize)]
pub struct TagSnapshot {
    pub uid: Uid,
    pub tag_type: TagType,
    pub block: Option<HexBytes>,
    /// URL of the NDEF URI record found in `block`
    pub ndef_url: Option<String>,
    pub ndef_error: Option<String>,
    pub card: Option<CardView>,
    pub detected_at: DateTime<Utc>,
}

/// Recognized card shown on the display until it expires
#[derive(Debug, Clone)]
pub struct ActiveCard {
    pub index: usize,
    pub card: &'static Card,
    pub read_at: Instant,
}

/// State for the connected device
pub struct DeviceStateInner {
    pub connected: bool,
    pub command_tx: Option<mpsc::Sender<ServerMessage>>,
    pub network: NetworkStatus,
    pub present_tag: Option<TagSnapshot>,
    pub active_card: Option<ActiveCard>,
    /// Status line shown on the display
    pub message: String,
    pub uptime: Option<u64>,
    /// Tag images sent to the device, keyed by request id, awaiting a result
    pub pending_writes: HashMap<String, Vec<u8>>,
}

impl Default for DeviceStateInner {
    fn default() -> Self {
        let network = NetworkStatus::default();
        Self {
            connected: false,
            command_tx: None,
            message: idle_message(network.mode).into(),
            network,
            present_tag: None,
            active_card: None,
            uptime: None,
            pending_writes: HashMap::new(),
        }
    }
}

pub fn idle_message(mode: WifiMode) -> &'static str {
    match mode {
        WifiMode::AccessPoint => "AP mode active",
        WifiMode::Station => "Client mode active",
    }
}

impl DeviceStateInner {
    pub fn tag_detected(
        &mut self,
        uid: Uid,
        sak: Option<u8>,
        block: Option<Vec<u8>>,
        now: Instant,
    ) -> TagSnapshot {
        let card = match cards::lookup(&uid) {
            Some((index, card)) => {
                self.active_card = Some(ActiveCard {
                    index,
                    card,
                    read_at: now,
                });
                self.message = format!("Access: {}", card.name);
                tracing::info!("Recognized card {}, redirecting to {}", uid, card.url);
                Some(CardView::new(index, card))
            }
            None => {
                self.message = "Unregistered card".into();
                tracing::info!("Unregistered card: {}", uid);
                None
            }
        };

        let (ndef_url, ndef_error) = match block.as_deref().map(ndef::decode) {
            Some(Ok(url)) => {
                tracing::debug!("Tag {} holds URL {}", uid, url);
                (Some(url), None)
            }
            Some(Err(e)) => {
                tracing::debug!("Tag {} has no readable URL record: {}", uid, e);
                (None, Some(e.to_string()))
            }
            None => (None, None),
        };

        let snapshot = TagSnapshot {
            uid,
            tag_type: sak.map(TagType::from_sak).unwrap_or(TagType::Unknown),
            block: block.map(HexBytes),
            ndef_url,
            ndef_error,
            card,
            detected_at: Utc::now(),
        };
        self.present_tag = Some(snapshot.clone());
        snapshot
    }

    pub fn tag_removed(&mut self) {
        self.present_tag = None;
    }

    /// Records a block written to the present tag so later reads see it.
    pub fn block_written(&mut self, block: Vec<u8>) {
        if let Some(tag) = &mut self.present_tag {
            match ndef::decode(&block) {
                Ok(url) => {
                    tag.ndef_url = Some(url);
                    tag.ndef_error = None;
                }
                Err(e) => {
                    tag.ndef_url = None;
                    tag.ndef_error = Some(e.to_string());
                }
            }
            tag.block = Some(HexBytes(block));
        }
    }

    pub fn set_network(&mut self, network: NetworkStatus) {
        self.network = network;
        if self.active_card.is_none() {
            self.message = idle_message(self.network.mode).into();
        }
    }

    /// Drops the active card once `timeout` has passed since it was read.
    /// Returns true when the display needs a refresh.
    pub fn expire(&mut self, now: Instant, timeout: Duration) -> bool {
        let expired = match &self.active_card {
            Some(active) => now.saturating_duration_since(active.read_at) > timeout,
            None => false,
        };
        if expired {
            self.active_card = None;
            self.message = idle_message(self.network.mode).into();
        }
        expired
    }

    pub fn active_card_view(&self) -> Option<CardView> {
        self.active_card
            .as_ref()
            .map(|active| CardView::new(active.index, active.card))
    }

    pub fn disconnected(&mut self) {
        self.connected = false;
        self.command_tx = None;
        self.present_tag = None;
        self.uptime = None;
        self.pending_writes.clear();
    }
}

/// Thread-safe device state wrapper
pub struct DeviceState(RwLock<DeviceStateInner>);

impl DeviceState {
    pub fn new() -> Self {
        Self(RwLock::new(DeviceStateInner::default()))
    }

    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, DeviceStateInner> {
        self.0.read().await
    }

    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, DeviceStateInner> {
        self.0.write().await
    }
}

pub fn spawn_expiry_task(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.expiry_tick);
        loop {
            ticker.tick().await;
            let expired = state
                .device_state
                .write()
                .await
                .expire(Instant::now(), state.config.display_timeout);
            if expired {
                tracing::debug!("Active card expired");
                crate::display::publish(&state).await;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid(text: &str) -> Uid {
        Uid::parse(text).unwrap()
    }

    #[test]
    fn test_known_card_becomes_active() {
        let mut inner = DeviceStateInner::default();
        let now = Instant::now();
        let snapshot = inner.tag_detected(uid("6B695BDE"), Some(0x08), None, now);

        assert_eq!(inner.message, "Access: ESEIAAT UPC");
        assert_eq!(snapshot.tag_type, TagType::MifareClassic1K);
        assert_eq!(snapshot.card.as_ref().map(|c| c.index), Some(0));
        let active = inner.active_card_view().unwrap();
        assert_eq!(active.url, "https://eseiaat.upc.edu/ca");
    }

    #[test]
    fn test_unknown_card_keeps_previous_active_card() {
        let mut inner = DeviceStateInner::default();
        let now = Instant::now();
        inner.tag_detected(uid("8B6295DB"), None, None, now);
        let snapshot = inner.tag_detected(uid("DEADBEEF"), None, None, now);

        assert_eq!(inner.message, "Unregistered card");
        assert!(snapshot.card.is_none());
        assert_eq!(inner.active_card_view().map(|c| c.index), Some(1));
        let present = inner.present_tag.as_ref().unwrap();
        assert_eq!(present.uid.to_string(), "DEADBEEF");
    }

    #[test]
    fn test_ndef_block_is_decoded() {
        let mut inner = DeviceStateInner::default();
        let block = ndef::encode("https://example.com").unwrap();
        let now = Instant::now();
        let snapshot = inner.tag_detected(uid("DEADBEEF"), Some(0x00), Some(block), now);
        assert_eq!(snapshot.ndef_url.as_deref(), Some("https://example.com"));
        assert!(snapshot.ndef_error.is_none());

        let blank = vec![0u8; 16];
        let snapshot = inner.tag_detected(uid("DEADBEEF"), None, Some(blank), now);
        assert!(snapshot.ndef_url.is_none());
        assert_eq!(
            snapshot.ndef_error.as_deref(),
            Some("block does not hold an NDEF URI record")
        );
    }

    #[test]
    fn test_block_written_updates_present_tag() {
        let mut inner = DeviceStateInner::default();
        inner.tag_detected(uid("DEADBEEF"), None, None, Instant::now());
        inner.block_written(ndef::encode("http://a.b").unwrap());
        let tag = inner.present_tag.as_ref().unwrap();
        assert_eq!(tag.ndef_url.as_deref(), Some("http://a.b"));
    }

    #[test]
    fn test_active_card_expires_after_timeout() {
        let mut inner = DeviceStateInner::default();
        let timeout = Duration::from_millis(5000);
        let read_at = Instant::now();
        inner.tag_detected(uid("CB3B90DB"), None, None, read_at);

        let just_before = read_at + Duration::from_millis(4999);
        assert!(!inner.expire(just_before, timeout));
        assert!(inner.active_card.is_some());

        let just_after = read_at + Duration::from_millis(5001);
        assert!(inner.expire(just_after, timeout));
        assert!(inner.active_card.is_none());
        assert_eq!(inner.message, "Client mode active");

        assert!(!inner.expire(read_at + Duration::from_secs(60), timeout));
    }

    #[test]
    fn test_network_change_resets_idle_message() {
        let mut inner = DeviceStateInner::default();
        inner.set_network(NetworkStatus {
            mode: WifiMode::AccessPoint,
            ip: Some(Ipv4Addr::new(192, 168, 4, 1)),
            ssid: None,
        });
        assert_eq!(inner.message, "AP mode active");

        inner.tag_detected(uid("C2981A06"), None, None, Instant::now());
        inner.set_network(NetworkStatus::default());
        assert_eq!(inner.message, "Access: GitHub Mauricio Urbina");
    }

    #[test]
    fn test_disconnect_clears_present_tag() {
        let mut inner = DeviceStateInner::default();
        inner.connected = true;
        inner.tag_detected(uid("C2981A06"), None, None, Instant::now());
        inner.disconnected();
        assert!(!inner.connected);
        assert!(inner.present_tag.is_none());
        assert!(inner.active_card.is_some());
    }
}
