//! Fixed table of known cards.

use serde::Serialize;

use crate::nfc::Uid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    pub uid: &'static str,
    pub url: &'static str,
    pub name: &'static str,
}

pub const CARDS: [Card; 4] = [
    Card {
        uid: "6B695BDE",
        url: "https://eseiaat.upc.edu/ca",
        name: "ESEIAAT UPC",
    },
    Card {
        uid: "8B6295DB",
        url: "https://github.com/pau-lozano-danes",
        name: "GitHub Pau Lozano",
    },
    Card {
        uid: "C2981A06",
        url: "https://github.com/mauricioudsx",
        name: "GitHub Mauricio Urbina",
    },
    Card {
        uid: "CB3B90DB",
        url: "https://futur.upc.edu/ManuelLopezPalma",
        name: "FUTUR Manuel Palma",
    },
];

pub fn all() -> &'static [Card] {
    &CARDS
}

pub fn get(index: usize) -> Option<&'static Card> {
    CARDS.get(index)
}

/// Returns the table index and entry for `uid`.
pub fn lookup(uid: &Uid) -> Option<(usize, &'static Card)> {
    let key = uid.to_string();
    CARDS.iter().enumerate().find(|(_, card)| card.uid == key)
}
