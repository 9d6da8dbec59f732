//! Named colour palette and per-subplot colour allocation
//!
//! Loads the ordered list of named colours from colors.json (embedded at
//! compile time). The order is fixed, so colour reassignment is deterministic:
//! a colour already used in a subplot is replaced by the next unused name
//! after it in the list.

use super::error::{PlotError, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Embedded colors.json content
const COLORS_JSON: &str = include_str!("../../colors.json");

/// Near-white names never handed out on a white background
pub const RESERVED_COLORS: [&str; 8] = [
    "white",
    "azure",
    "floralwhite",
    "ghostwhite",
    "honeydew",
    "ivory",
    "snow",
    "whitesmoke",
];

static BUILTIN: OnceLock<ColorRegistry> = OnceLock::new();

/// A single colour definition from colors.json
#[derive(Debug, Clone, Deserialize)]
pub struct ColorDefinition {
    pub name: String,
    pub hex: String,
}

/// Ordered registry of named colours
#[derive(Debug, Clone, Default)]
pub struct ColorRegistry {
    colors: Vec<ColorDefinition>,
    positions: HashMap<String, usize>,
}

impl ColorRegistry {
    /// The palette shipped with the binary
    pub fn builtin() -> Result<&'static ColorRegistry> {
        if let Some(registry) = BUILTIN.get() {
            return Ok(registry);
        }
        let parsed = Self::from_json(COLORS_JSON)?;
        Ok(BUILTIN.get_or_init(|| parsed))
    }

    /// Load colours from JSON, keeping file order
    pub fn from_json(json: &str) -> Result<Self> {
        let colors: Vec<ColorDefinition> = serde_json::from_str(json)?;

        let mut positions = HashMap::with_capacity(colors.len());
        for (i, def) in colors.iter().enumerate() {
            if parse_hex_color(&def.hex).is_none() {
                return Err(PlotError::DataConsistency(format!(
                    "colour '{}' has invalid hex value '{}'",
                    def.name, def.hex
                )));
            }
            positions.insert(def.name.clone(), i);
        }

        tracing::debug!(colors = colors.len(), "Loaded colour palette");

        Ok(Self { colors, positions })
    }

    /// Position of a colour name in palette order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Return `candidate` if unused, else the next unused palette entry after it
    ///
    /// The chosen name is recorded in `used`. When every later entry is taken
    /// the last palette entry is returned, accepting a repeated colour.
    pub fn ensure_unique(&self, candidate: &str, used: &mut UsedColors) -> Result<String> {
        if !used.contains(candidate) {
            used.insert(candidate);
            return Ok(candidate.to_string());
        }

        let start = self
            .position(candidate)
            .ok_or_else(|| PlotError::UnknownColor(candidate.to_string()))?;

        let chosen = self.colors[start..]
            .iter()
            .map(|def| def.name.as_str())
            .find(|name| !used.contains(name))
            .unwrap_or_else(|| self.colors[self.colors.len() - 1].name.as_str());

        if chosen != candidate {
            tracing::debug!(requested = candidate, assigned = chosen, "Colour reassigned");
        }
        used.insert(chosen);
        Ok(chosen.to_string())
    }
}

/// Colours already taken within one subplot
#[derive(Debug, Clone)]
pub struct UsedColors {
    names: HashSet<String>,
}

impl UsedColors {
    /// Fresh set, pre-seeded with the reserved near-white names
    pub fn new() -> Self {
        Self {
            names: RESERVED_COLORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn insert(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for UsedColors {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a hex color string to RGB array
///
/// Supports `#RRGGBB` and `RRGGBB`.
fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;

    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_color() {
        assert_eq!(parse_hex_color("#FF0000"), Some([255, 0, 0]));
        assert_eq!(parse_hex_color("1F78B4"), Some([31, 120, 180]));
        assert_eq!(parse_hex_color("#FFF"), None);
        assert_eq!(parse_hex_color("GGGGGG"), None);
    }

    #[test]
    fn test_registry_loads_in_order() {
        let registry = ColorRegistry::builtin().unwrap();
        assert_eq!(registry.len(), 148);
        assert_eq!(registry.position("aliceblue"), Some(0));
        assert_eq!(registry.position("blue"), Some(9));
        assert_eq!(registry.position("yellowgreen"), Some(147));
        for name in RESERVED_COLORS {
            assert!(registry.position(name).is_some(), "{} missing", name);
        }
    }

    #[test]
    fn test_unused_colour_is_kept() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        assert_eq!(registry.ensure_unique("red", &mut used).unwrap(), "red");
        assert!(used.contains("red"));
    }

    #[test]
    fn test_repeated_colour_is_reassigned() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        let first = registry.ensure_unique("blue", &mut used).unwrap();
        let second = registry.ensure_unique("blue", &mut used).unwrap();
        assert_eq!(first, "blue");
        assert_eq!(second, "blueviolet");
    }

    #[test]
    fn test_distinct_requests_stay_distinct() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        let requested = ["black", "green", "red", "blue", "purple", "orange"];
        let assigned: Vec<String> = requested
            .iter()
            .map(|c| registry.ensure_unique(c, &mut used).unwrap())
            .collect();
        let unique: HashSet<&String> = assigned.iter().collect();
        assert_eq!(unique.len(), requested.len());
    }

    #[test]
    fn test_reserved_colours_never_assigned() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        // "aqua" -> "aquamarine" is next; "azure" must be skipped after that
        for _ in 0..3 {
            let colour = registry.ensure_unique("aqua", &mut used).unwrap();
            assert!(!RESERVED_COLORS.contains(&colour.as_str()));
        }
        assert!(used.contains("beige"));
    }

    #[test]
    fn test_exhausted_palette_clamps_to_last() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        assert_eq!(
            registry.ensure_unique("yellowgreen", &mut used).unwrap(),
            "yellowgreen"
        );
        assert_eq!(
            registry.ensure_unique("yellowgreen", &mut used).unwrap(),
            "yellowgreen"
        );
    }

    #[test]
    fn test_unknown_colour_fails_only_on_collision() {
        let registry = ColorRegistry::builtin().unwrap();
        let mut used = UsedColors::new();
        assert!(registry.ensure_unique("nocolour", &mut used).is_ok());
        assert!(matches!(
            registry.ensure_unique("nocolour", &mut used),
            Err(PlotError::UnknownColor(_))
        ));
    }
}
