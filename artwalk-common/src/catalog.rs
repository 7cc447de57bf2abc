//! Artwork catalog
//!
//! Fixed, ordered registry of the collectible artworks. Loaded once at
//! startup and never mutated; the count of non-bonus artworks is the
//! denominator for hunt-completion checks.

use serde::{Deserialize, Serialize};

/// Id prefix marking bonus artworks (excluded from completion counting)
const BONUS_PREFIX: &str = "bonus-";

/// A single collectible artwork
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArtworkRecord {
    /// Unique string key, also used in QR code resolution
    pub id: String,
    /// Presentation title
    pub display_name: String,
    /// Artist credit line
    pub artist_name: String,
    /// Hint shown on the map before the artwork is found
    pub clue_text: String,
    /// Position in the catalog (0-based)
    pub index: usize,
    /// Opaque locator consumed by the asset loader
    pub asset_path: String,
    /// Reward text shown once when the artwork is first unlocked
    pub unlock_reward: Option<String>,
}

impl ArtworkRecord {
    /// Bonus artworks do not count toward hunt completion
    pub fn is_bonus(&self) -> bool {
        self.id.starts_with(BONUS_PREFIX)
    }

    /// Zero-padded catalog number for display ("01", "02", ...)
    pub fn number_label(&self) -> String {
        format!("{:02}", self.index + 1)
    }
}

/// The full artwork registry
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<ArtworkRecord>,
}

impl Catalog {
    /// Build the production catalog
    pub fn new() -> Self {
        let entries: [(&str, &str, &str, &str, Option<&str>); 8] = [
            (
                "harbor-lights",
                "Harbor Lights",
                "Mira Okafor",
                "Where the fishing boats tie up, look for the blue bollard.",
                None,
            ),
            (
                "murmuration",
                "Murmuration",
                "Jonas Feld",
                "A thousand starlings roost above the old grain silo.",
                None,
            ),
            (
                "xmas-tree",
                "Evergreen",
                "Pia Lindqvist",
                "The town square tree stands all year if you know how to look.",
                Some("Free hot chocolate at Kiosk 12"),
            ),
            (
                "brass-whale",
                "Brass Whale",
                "Tomas Ayers",
                "She surfaces beside the maritime museum steps.",
                None,
            ),
            (
                "paper-garden",
                "Paper Garden",
                "Ines Duarte",
                "Folded blooms grow on the library's south wall.",
                None,
            ),
            (
                "echo-chimes",
                "Echo Chimes",
                "Ralf Stenmark",
                "Under the rail bridge, the wind plays first.",
                None,
            ),
            (
                "clockwork-fox",
                "Clockwork Fox",
                "Mira Okafor",
                "He keeps time by the north gate when nobody watches.",
                Some("10% off at the Gatehouse Cafe"),
            ),
            (
                "bonus-aurora",
                "Aurora",
                "Jonas Feld",
                "Finders of all seven may look up from the pier at dusk.",
                None,
            ),
        ];

        let records = entries
            .into_iter()
            .enumerate()
            .map(|(index, (id, display_name, artist_name, clue_text, reward))| ArtworkRecord {
                id: id.to_string(),
                display_name: display_name.to_string(),
                artist_name: artist_name.to_string(),
                clue_text: clue_text.to_string(),
                index,
                asset_path: format!("models/{}.glb", id),
                unlock_reward: reward.map(|r| r.to_string()),
            })
            .collect();

        Self { records }
    }

    /// Look up an artwork by id
    pub fn get(&self, id: &str) -> Option<&ArtworkRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// All artworks in catalog order
    pub fn iter(&self) -> impl Iterator<Item = &ArtworkRecord> {
        self.records.iter()
    }

    /// Total number of catalog entries, bonus included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Fixed completion denominator: artworks that count toward the hunt
    pub fn non_bonus_count(&self) -> usize {
        self.records.iter().filter(|r| !r.is_bonus()).count()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_shape() {
        let catalog = Catalog::new();

        assert_eq!(catalog.len(), 8);
        assert_eq!(catalog.non_bonus_count(), 7);

        // Ordered, 0-based indices
        for (i, record) in catalog.iter().enumerate() {
            assert_eq!(record.index, i);
        }
    }

    #[test]
    fn test_bonus_by_naming_convention() {
        let catalog = Catalog::new();

        let bonus = catalog.get("bonus-aurora").unwrap();
        assert!(bonus.is_bonus());

        let regular = catalog.get("xmas-tree").unwrap();
        assert!(!regular.is_bonus());
    }

    #[test]
    fn test_number_label_zero_padded() {
        let catalog = Catalog::new();

        assert_eq!(catalog.get("harbor-lights").unwrap().number_label(), "01");
        assert_eq!(catalog.get("clockwork-fox").unwrap().number_label(), "07");
    }

    #[test]
    fn test_unknown_id_is_none() {
        let catalog = Catalog::new();
        assert!(catalog.get("sunken-bell").is_none());
    }
}
