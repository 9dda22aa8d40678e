//! # Passband (series) identifiers and registry
//!
//! A [`SeriesType`] names the photometric channel a magnitude was measured in
//! (Johnson V, Gaia G, ZTF zr, …) together with a display colour.
//!
//! ## Identity
//! -----------------
//! Two series with the same **short name** are the same series, whatever their
//! index, description or colour. `PartialEq`, `Eq` and `Hash` only look at the short
//! name.
//!
//! ## Registry
//! -----------------
//! [`SeriesRegistry`] holds the built-in AAVSO bands and accepts dynamically
//! registered series (Gaia, ZTF, mission light curves). All lookups return `Option`:
//! on a miss the caller decides whether to fall back to [`SeriesType::UNSPECIFIED`],
//! register a new series, or reject the record.
use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::constants::FastHashMap;

/// Display colour of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// A photometric series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesType {
    pub index: i32,
    pub description: Cow<'static, str>,
    pub short_name: Cow<'static, str>,
    pub color: Rgb,
}

impl PartialEq for SeriesType {
    fn eq(&self, other: &Self) -> bool {
        self.short_name == other.short_name
    }
}

impl Eq for SeriesType {}

impl Hash for SeriesType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.short_name.hash(state);
    }
}

impl fmt::Display for SeriesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}

impl SeriesType {
    /// Compile-time series definition.
    pub const fn builtin(
        index: i32,
        description: &'static str,
        short_name: &'static str,
        color: Rgb,
    ) -> Self {
        SeriesType {
            index,
            description: Cow::Borrowed(description),
            short_name: Cow::Borrowed(short_name),
            color,
        }
    }

    /// Runtime series definition.
    pub fn new(index: i32, description: impl Into<String>, short_name: impl Into<String>, color: Rgb) -> Self {
        SeriesType {
            index,
            description: Cow::Owned(description.into()),
            short_name: Cow::Owned(short_name.into()),
            color,
        }
    }

    /// Series produced by the analysis side (models, means, …) rather than by a source.
    pub fn is_synthetic(&self) -> bool {
        [Self::MODEL, Self::RESIDUALS, Self::MEANS, Self::FILTERED]
            .iter()
            .any(|s| s == self)
    }

    pub const VISUAL: SeriesType = SeriesType::builtin(0, "Visual", "Vis.", Rgb(0, 0, 0));
    pub const UNKNOWN: SeriesType = SeriesType::builtin(1, "Unknown", "N/A", Rgb(255, 255, 0));
    pub const JOHNSON_V: SeriesType = SeriesType::builtin(2, "Johnson V", "V", Rgb(0, 255, 0));
    pub const JOHNSON_B: SeriesType = SeriesType::builtin(3, "Johnson B", "B", Rgb(0, 0, 255));
    pub const COUSINS_R: SeriesType = SeriesType::builtin(4, "Cousins R", "R", Rgb(255, 0, 0));
    pub const COUSINS_I: SeriesType = SeriesType::builtin(5, "Cousins I", "I", Rgb(255, 64, 0));
    pub const ORANGE_LILLER: SeriesType =
        SeriesType::builtin(6, "Orange (Liller)", "Orange", Rgb(255, 200, 0));
    pub const JOHNSON_U: SeriesType = SeriesType::builtin(7, "Johnson U", "U", Rgb(128, 0, 128));
    pub const CLEAR_V: SeriesType =
        SeriesType::builtin(8, "Unfiltered with V Zeropoint", "CV", Rgb(128, 128, 128));
    pub const CLEAR_R: SeriesType =
        SeriesType::builtin(9, "Unfiltered with R Zeropoint", "CR", Rgb(64, 64, 64));
    pub const JOHNSON_R: SeriesType = SeriesType::builtin(10, "Johnson R", "RJ", Rgb(200, 0, 0));
    pub const JOHNSON_I: SeriesType = SeriesType::builtin(11, "Johnson I", "IJ", Rgb(200, 64, 0));
    pub const BLUE_VISUAL: SeriesType = SeriesType::builtin(21, "Blue", "Blue-Vis.", Rgb(0, 0, 160));
    pub const GREEN_VISUAL: SeriesType =
        SeriesType::builtin(22, "Green", "Green-Vis.", Rgb(0, 160, 0));
    pub const RED_VISUAL: SeriesType = SeriesType::builtin(23, "Red", "Red-Vis.", Rgb(160, 0, 0));
    pub const YELLOW_VISUAL: SeriesType =
        SeriesType::builtin(24, "Yellow", "Yellow-Vis.", Rgb(200, 200, 0));
    pub const K_NIR: SeriesType = SeriesType::builtin(26, "K NIR 2.2micron", "K", Rgb(96, 0, 0));
    pub const H_NIR: SeriesType = SeriesType::builtin(27, "H NIR 1.6micron", "H", Rgb(128, 0, 32));
    pub const J_NIR: SeriesType = SeriesType::builtin(28, "J NIR 1.2micron", "J", Rgb(160, 0, 64));
    pub const SLOAN_Z: SeriesType = SeriesType::builtin(29, "Sloan z", "SZ", Rgb(96, 32, 0));
    pub const STROMGREN_U: SeriesType = SeriesType::builtin(30, "Stromgren u", "STU", Rgb(64, 0, 128));
    pub const STROMGREN_V: SeriesType = SeriesType::builtin(31, "Stromgren v", "STV", Rgb(96, 0, 160));
    pub const STROMGREN_B: SeriesType = SeriesType::builtin(32, "Stromgren b", "STB", Rgb(0, 64, 160));
    pub const STROMGREN_Y: SeriesType = SeriesType::builtin(33, "Stromgren y", "STY", Rgb(160, 160, 0));
    pub const STROMGREN_HBW: SeriesType =
        SeriesType::builtin(34, "Stromgren Hbw", "STHBW", Rgb(0, 96, 96));
    pub const STROMGREN_HBN: SeriesType =
        SeriesType::builtin(35, "Stromgren Hbn", "STHBN", Rgb(0, 128, 128));
    pub const SLOAN_U: SeriesType = SeriesType::builtin(40, "Sloan u", "SU", Rgb(96, 0, 96));
    pub const SLOAN_G: SeriesType = SeriesType::builtin(41, "Sloan g", "SG", Rgb(0, 128, 0));
    pub const SLOAN_R: SeriesType = SeriesType::builtin(42, "Sloan r", "SR", Rgb(192, 0, 0));
    pub const SLOAN_I: SeriesType = SeriesType::builtin(43, "Sloan i", "SI", Rgb(192, 96, 0));
    pub const TRI_COLOR_BLUE: SeriesType = SeriesType::builtin(50, "Tri-color blue", "TB", Rgb(0, 0, 200));
    pub const TRI_COLOR_GREEN: SeriesType =
        SeriesType::builtin(51, "Tri-color green", "TG", Rgb(0, 200, 0));
    pub const TRI_COLOR_RED: SeriesType = SeriesType::builtin(52, "Tri-color red", "TR", Rgb(200, 0, 0));

    pub const UNSPECIFIED: SeriesType =
        SeriesType::builtin(-1, "Unspecified", "Unspecified", Rgb(255, 128, 0));
    pub const MODEL: SeriesType = SeriesType::builtin(-2, "Model", "Model", Rgb(0, 192, 192));
    pub const RESIDUALS: SeriesType = SeriesType::builtin(-3, "Residuals", "Residuals", Rgb(128, 128, 255));
    pub const MEANS: SeriesType = SeriesType::builtin(-4, "Means", "Means", Rgb(0, 0, 255));
    pub const FILTERED: SeriesType = SeriesType::builtin(-5, "Filtered", "Filtered", Rgb(255, 0, 255));

    /// Every compile-time series, AAVSO bands first.
    pub const BUILTIN: [SeriesType; 38] = [
        Self::VISUAL,
        Self::UNKNOWN,
        Self::JOHNSON_V,
        Self::JOHNSON_B,
        Self::COUSINS_R,
        Self::COUSINS_I,
        Self::ORANGE_LILLER,
        Self::JOHNSON_U,
        Self::CLEAR_V,
        Self::CLEAR_R,
        Self::JOHNSON_R,
        Self::JOHNSON_I,
        Self::BLUE_VISUAL,
        Self::GREEN_VISUAL,
        Self::RED_VISUAL,
        Self::YELLOW_VISUAL,
        Self::K_NIR,
        Self::H_NIR,
        Self::J_NIR,
        Self::SLOAN_Z,
        Self::STROMGREN_U,
        Self::STROMGREN_V,
        Self::STROMGREN_B,
        Self::STROMGREN_Y,
        Self::STROMGREN_HBW,
        Self::STROMGREN_HBN,
        Self::SLOAN_U,
        Self::SLOAN_G,
        Self::SLOAN_R,
        Self::SLOAN_I,
        Self::TRI_COLOR_BLUE,
        Self::TRI_COLOR_GREEN,
        Self::TRI_COLOR_RED,
        Self::UNSPECIFIED,
        Self::MODEL,
        Self::RESIDUALS,
        Self::MEANS,
        Self::FILTERED,
    ];
}

/// First index handed out to runtime-registered series.
const FIRST_DYNAMIC_INDEX: i32 = 1000;

static BUILTIN_REGISTRY: Lazy<SeriesRegistry> = Lazy::new(SeriesRegistry::with_builtin);

/// Lookup table of series by short name, index and description.
#[derive(Debug, Clone)]
pub struct SeriesRegistry {
    by_short_name: FastHashMap<String, SeriesType>,
    next_index: i32,
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl SeriesRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        SeriesRegistry {
            by_short_name: FastHashMap::default(),
            next_index: FIRST_DYNAMIC_INDEX,
        }
    }

    /// A registry pre-filled with [`SeriesType::BUILTIN`].
    pub fn with_builtin() -> Self {
        let mut registry = Self::empty();
        for series in SeriesType::BUILTIN {
            registry.insert(series);
        }
        registry
    }

    /// Shared read-only registry of the built-in series.
    pub fn builtin() -> &'static SeriesRegistry {
        &BUILTIN_REGISTRY
    }

    /// Insert a fully defined series.
    ///
    /// Return
    /// ----------
    /// * The series stored under that short name. An already registered series wins
    ///   over the argument.
    pub fn insert(&mut self, series: SeriesType) -> SeriesType {
        self.by_short_name
            .entry(series.short_name.to_string())
            .or_insert(series)
            .clone()
    }

    /// Register a series by description and short name, assigning a fresh index.
    ///
    /// Registering a short name twice returns the first definition.
    pub fn register(&mut self, description: &str, short_name: &str, color: Rgb) -> SeriesType {
        if let Some(existing) = self.by_short_name.get(short_name) {
            return existing.clone();
        }
        let series = SeriesType::new(self.next_index, description, short_name, color);
        self.next_index += 1;
        self.insert(series)
    }

    pub fn by_short_name(&self, short_name: &str) -> Option<&SeriesType> {
        self.by_short_name.get(short_name)
    }

    pub fn by_index(&self, index: i32) -> Option<&SeriesType> {
        self.by_short_name.values().find(|s| s.index == index)
    }

    pub fn by_description(&self, description: &str) -> Option<&SeriesType> {
        self.by_short_name
            .values()
            .find(|s| s.description == description)
    }

    pub fn contains(&self, series: &SeriesType) -> bool {
        self.by_short_name.contains_key(series.short_name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.by_short_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_short_name.is_empty()
    }

    /// Series sorted by index.
    pub fn sorted(&self) -> Vec<&SeriesType> {
        let mut all: Vec<&SeriesType> = self.by_short_name.values().collect();
        all.sort_by_key(|s| s.index);
        all
    }
}
