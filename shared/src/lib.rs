pub mod cards;
pub mod ndef;
pub mod nfc;
pub mod protocol;
