//! Virtual tag memory, keyed by UID.

use std::collections::{BTreeMap, HashMap};

use tagportal_shared::nfc::{BLOCK_SIZE, URL_BLOCK, Uid};

/// Data blocks read back as the URL area on tap (enough for the largest record)
const URL_AREA_BLOCKS: usize = 3;

/// Blocks per MIFARE Classic 1K sector
const BLOCKS_PER_SECTOR: u8 = 4;

fn is_sector_trailer(block: u8) -> bool {
    block % BLOCKS_PER_SECTOR == BLOCKS_PER_SECTOR - 1
}

/// Data blocks from `start` upward, skipping sector trailers.
fn data_blocks(start: u8) -> impl Iterator<Item = u8> {
    (start..=u8::MAX).filter(|block| !is_sector_trailer(*block))
}

/// Memory of a single MIFARE Classic tag. Unwritten blocks read as zero.
#[derive(Debug, Default, Clone)]
pub struct TagMemory {
    blocks: BTreeMap<u8, [u8; BLOCK_SIZE]>,
}

impl TagMemory {
    /// Writes `image` block by block starting at `start`.
    pub fn write(&mut self, start: u8, image: &[u8]) -> Result<(), String> {
        if start == 0 {
            return Err("block 0 holds the manufacturer data".into());
        }
        if is_sector_trailer(start) {
            return Err(format!("block {} is a sector trailer", start));
        }
        if image.is_empty() || image.len() % BLOCK_SIZE != 0 {
            return Err(format!(
                "image of {} bytes is not a whole number of blocks",
                image.len()
            ));
        }

        let chunks = image.chunks_exact(BLOCK_SIZE);
        let targets: Vec<u8> = data_blocks(start).take(chunks.len()).collect();
        if targets.len() < chunks.len() {
            return Err(format!("image does not fit after block {}", start));
        }

        for (block, chunk) in targets.into_iter().zip(chunks) {
            let mut data = [0u8; BLOCK_SIZE];
            data.copy_from_slice(chunk);
            self.blocks.insert(block, data);
        }
        Ok(())
    }

    pub fn read(&self, block: u8) -> [u8; BLOCK_SIZE] {
        self.blocks.get(&block).copied().unwrap_or([0u8; BLOCK_SIZE])
    }

    /// The blocks a reader returns when asked for the URL record.
    pub fn url_area(&self) -> Vec<u8> {
        data_blocks(URL_BLOCK)
            .take(URL_AREA_BLOCKS)
            .flat_map(|block| self.read(block))
            .collect()
    }
}

/// Tags the simulator has seen, plus the one currently in the field.
#[derive(Debug, Default)]
pub struct TagField {
    tags: HashMap<Uid, TagMemory>,
    present: Option<Uid>,
}

impl TagField {
    /// Puts `uid` in the field, creating a blank tag the first time.
    pub fn tap(&mut self, uid: Uid) -> Vec<u8> {
        let area = self.tags.entry(uid.clone()).or_default().url_area();
        self.present = Some(uid);
        area
    }

    /// Returns the tag that left the field, if any.
    pub fn remove(&mut self) -> Option<Uid> {
        self.present.take()
    }

    pub fn present(&self) -> Option<&Uid> {
        self.present.as_ref()
    }

    pub fn write_present(&mut self, start: u8, image: &[u8]) -> Result<(), String> {
        let uid = self.present.as_ref().ok_or("no tag in the field")?;
        self.tags.entry(uid.clone()).or_default().write(start, image)
    }
}

#[cfg(test)]
mod tests {
    use tagportal_shared::ndef;

    use super::*;

    fn uid(text: &str) -> Uid {
        Uid::parse(text).unwrap()
    }

    #[test]
    fn test_blank_tag_reads_zeroes() {
        let mut field = TagField::default();
        let area = field.tap(uid("DEADBEEF"));
        assert_eq!(area, vec![0u8; 48]);
        assert!(ndef::decode(&area).is_err());
    }

    #[test]
    fn test_written_url_survives_remove_and_tap() {
        let mut field = TagField::default();
        field.tap(uid("DEADBEEF"));
        let image = ndef::encode("https://github.com/example/a-long-project-name").unwrap();
        assert_eq!(image.len(), 48);
        field.write_present(URL_BLOCK, &image).unwrap();

        assert_eq!(field.remove(), Some(uid("DEADBEEF")));
        assert!(field.present().is_none());

        let area = field.tap(uid("DEADBEEF"));
        assert_eq!(
            ndef::decode(&area).unwrap(),
            "https://github.com/example/a-long-proj"
        );

        let other = field.tap(uid("6B695BDE"));
        assert_eq!(other, vec![0u8; 48]);
    }

    #[test]
    fn test_write_skips_sector_trailer() {
        let mut memory = TagMemory::default();
        memory.write(5, &[0xAA; 48]).unwrap();
        assert_eq!(memory.read(5), [0xAA; 16]);
        assert_eq!(memory.read(6), [0xAA; 16]);
        assert_eq!(memory.read(7), [0x00; 16]);
        assert_eq!(memory.read(8), [0xAA; 16]);
    }

    #[test]
    fn test_write_rejects_bad_targets() {
        let mut field = TagField::default();
        assert!(field.write_present(URL_BLOCK, &[0u8; 16]).is_err());

        field.tap(uid("DEADBEEF"));
        assert!(field.write_present(0, &[0u8; 16]).is_err());
        assert!(field.write_present(3, &[0u8; 16]).is_err());
        assert!(field.write_present(4, &[0u8; 10]).is_err());
        assert!(field.write_present(4, &[]).is_err());
        assert!(field.write_present(254, &[0u8; 32]).is_err());
    }
}
