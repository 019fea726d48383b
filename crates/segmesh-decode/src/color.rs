//! Region color lookup.
//!
//! Mesh resources are named after the segment they contain, with the region
//! id as a trailing numeric suffix (`.../mesh/42`, `hoc1_7`, `area-12`). The
//! id selects a display color from a [`RegionTable`]. Lookup is best-effort:
//! any failure yields [`FALLBACK_COLOR`].

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// Color used when a region cannot be resolved.
pub const FALLBACK_COLOR: Rgb = Rgb::new(255, 255, 255);

/// Characters that may precede the numeric region suffix.
const SEPARATORS: &[char] = &['/', '_', '-', ':', '.', '='];

/// An 8-bit RGB triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u8; 3]", into = "[u8; 3]")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels scaled to `[0, 1]`.
    #[must_use]
    pub fn normalized(self) -> [f32; 3] {
        [
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        ]
    }

    /// The normalized color repeated once per vertex as a flat array.
    #[must_use]
    pub fn repeat_normalized(self, vertex_count: usize) -> Vec<f32> {
        let rgb = self.normalized();
        (0..vertex_count * 3).map(|i| rgb[i % 3]).collect()
    }
}

impl From<[u8; 3]> for Rgb {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self { r, g, b }
    }
}

impl From<Rgb> for [u8; 3] {
    fn from(rgb: Rgb) -> Self {
        [rgb.r, rgb.g, rgb.b]
    }
}

/// A labelled region. Entries without a color resolve to the fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub color: Option<Rgb>,
}

/// Something that names a region: either its id or a resource identifier
/// ending in the id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionRef<'a> {
    Id(u32),
    Identifier(&'a str),
}

impl From<u32> for RegionRef<'_> {
    fn from(id: u32) -> Self {
        Self::Id(id)
    }
}

impl<'a> From<&'a str> for RegionRef<'a> {
    fn from(identifier: &'a str) -> Self {
        Self::Identifier(identifier)
    }
}

/// Read-only mapping from region id to [`Region`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegionTable {
    regions: HashMap<u32, Region>,
}

static BUILTIN: LazyLock<RegionTable> = LazyLock::new(|| {
    RegionTable::from_regions(BUILTIN_REGIONS.iter().map(|&(id, name, color)| Region {
        id,
        name: name.to_owned(),
        color: color.map(Rgb::from),
    }))
});

#[rustfmt::skip]
const BUILTIN_REGIONS: &[(u32, &str, Option<[u8; 3]>)] = &[
    (1, "Area hOc1 (V1)", Some([190, 132, 147])),
    (2, "Area hOc2 (V2)", Some([209, 113, 119])),
    (3, "Area hOc3d", Some([105, 191, 48])),
    (4, "Area hOc4v", Some([222, 77, 155])),
    (5, "Area 44 (IFG)", Some([54, 74, 109])),
    (6, "Area 45 (IFG)", Some([167, 103, 146])),
    (7, "Area 4a (PreCG)", Some([118, 239, 183])),
    (8, "Area 3b (PostCG)", Some([239, 191, 155])),
    (9, "Hippocampus CA1", Some([250, 191, 217])),
    (10, "Dentate gyrus", Some([135, 8, 158])),
    (11, "Amygdala LB", Some([148, 177, 199])),
    (12, "Thalamus", Some([0, 118, 14])),
    (13, "Cerebellum", Some([230, 148, 34])),
    (14, "Brainstem", Some([119, 159, 176])),
    (15, "White matter", None),
];

impl RegionTable {
    /// The process-wide built-in table.
    #[must_use]
    pub fn builtin() -> &'static RegionTable {
        &BUILTIN
    }

    /// Build a table from regions. Later duplicates replace earlier ones.
    pub fn from_regions(regions: impl IntoIterator<Item = Region>) -> Self {
        Self {
            regions: regions.into_iter().map(|r| (r.id, r)).collect(),
        }
    }

    /// Parse a JSON array of `{ "id", "name", "color"? }` records.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let regions: Vec<Region> = serde_json::from_str(json)?;
        Ok(Self::from_regions(regions))
    }

    #[must_use]
    pub fn get(&self, id: u32) -> Option<&Region> {
        self.regions.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Resolve a region to its color, falling back to white on any miss.
    #[must_use]
    pub fn resolve<'a>(&self, region: impl Into<RegionRef<'a>>) -> Rgb {
        let id = match region.into() {
            RegionRef::Id(id) => Some(id),
            RegionRef::Identifier(identifier) => region_id(identifier),
        };
        id.and_then(|id| self.get(id))
            .and_then(|region| region.color)
            .unwrap_or(FALLBACK_COLOR)
    }
}

/// Resolve a region color against the built-in table.
#[must_use]
pub fn resolve_color<'a>(region: impl Into<RegionRef<'a>>) -> Rgb {
    RegionTable::builtin().resolve(region)
}

/// Extract the trailing numeric region id from a resource identifier.
///
/// Query strings and fragments are ignored. The digits must either make up
/// the whole remaining identifier or follow one of the separator characters.
#[must_use]
pub fn region_id(identifier: &str) -> Option<u32> {
    let path = identifier
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    let digits_start = path.len() - path.chars().rev().take_while(char::is_ascii_digit).count();
    let digits = &path[digits_start..];
    if digits.is_empty() {
        return None;
    }
    let preceded_by_separator = path[..digits_start]
        .chars()
        .next_back()
        .is_none_or(|c| SEPARATORS.contains(&c));
    if !preceded_by_separator {
        return None;
    }
    digits.parse().ok()
}
