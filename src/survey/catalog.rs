//! Measure catalog: names of survey measures and their plotting groups
//!
//! The catalog is parsed from `measures.json` (embedded at compile time) and
//! validated once. Each measure group collects related measures that are
//! drawn on the same subplot, each with its own short label and colour.
//! Measures outside every group are plotted on their own in the default colour.

use super::error::{PlotError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Embedded measures.json content
const MEASURES_JSON: &str = include_str!("../../measures.json");

/// Colour of a measure plotted outside any group
pub const DEFAULT_MEASURE_COLOR: &str = "blue";

/// Global catalog, initialized on first successful access
static BUILTIN: OnceLock<MeasureCatalog> = OnceLock::new();

#[derive(Debug, Clone, Deserialize)]
struct MeasureDef {
    id: u32,
    name: String,
}

/// One measure's entry within a group
#[derive(Debug, Clone, Deserialize)]
pub struct GroupMember {
    pub id: u32,
    /// Short label used inside the group's subplot
    pub label: String,
    pub color: String,
}

/// A named set of measures drawn together
#[derive(Debug, Clone, Deserialize)]
pub struct MeasureGroup {
    pub name: String,
    pub members: Vec<GroupMember>,
}

impl MeasureGroup {
    fn member(&self, measure: u32) -> Option<&GroupMember> {
        self.members.iter().find(|md| md.id == measure)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    measures: Vec<MeasureDef>,
    groups: Vec<MeasureGroup>,
}

/// Registry of measure names and measure groups
#[derive(Debug, Clone)]
pub struct MeasureCatalog {
    names: HashMap<u32, String>,
    groups: Vec<MeasureGroup>,
    /// Reverse index: measure id -> index in `groups`
    group_index: HashMap<u32, usize>,
}

impl MeasureCatalog {
    /// The catalog shipped with the binary
    pub fn builtin() -> Result<&'static MeasureCatalog> {
        if let Some(catalog) = BUILTIN.get() {
            return Ok(catalog);
        }
        let parsed = Self::from_json(MEASURES_JSON)?;
        Ok(BUILTIN.get_or_init(|| parsed))
    }

    /// Parse and validate a catalog
    ///
    /// Every group member must have a name entry and belong to one group only.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;

        let mut names = HashMap::with_capacity(file.measures.len());
        for def in file.measures {
            if names.insert(def.id, def.name).is_some() {
                return Err(PlotError::DataConsistency(format!(
                    "measure {} named twice",
                    def.id
                )));
            }
        }

        let mut group_index = HashMap::new();
        for (idx, group) in file.groups.iter().enumerate() {
            for md in &group.members {
                if !names.contains_key(&md.id) {
                    return Err(PlotError::DataConsistency(format!(
                        "measure {} in group '{}' has no catalog entry",
                        md.id, group.name
                    )));
                }
                if let Some(prev) = group_index.insert(md.id, idx) {
                    return Err(PlotError::DataConsistency(format!(
                        "measure {} listed in groups {} and {}",
                        md.id, prev, idx
                    )));
                }
            }
        }

        tracing::debug!(
            measures = names.len(),
            groups = file.groups.len(),
            "Loaded measure catalog"
        );

        Ok(Self {
            names,
            groups: file.groups,
            group_index,
        })
    }

    /// Display name of a measure
    pub fn name_of(&self, measure: u32) -> Result<&str> {
        self.names
            .get(&measure)
            .map(String::as_str)
            .ok_or_else(|| PlotError::NotFound(format!("measure {} not in catalog", measure)))
    }

    /// Index of the group containing `measure`
    ///
    /// Fails for ungrouped measures; callers plot those individually.
    pub fn group_of(&self, measure: u32) -> Result<usize> {
        self.group_index.get(&measure).copied().ok_or_else(|| {
            PlotError::NotFound(format!("measure {} not in any measure group", measure))
        })
    }

    /// Label for a measure, group-specific when `group` is given
    pub fn label_for(
        &self,
        group: Option<usize>,
        measure: u32,
        append_number: bool,
    ) -> Result<String> {
        let label = match group {
            None => self.name_of(measure)?.to_string(),
            Some(idx) => self.member(idx, measure)?.label.clone(),
        };
        if append_number {
            Ok(format!("{} ({})", label, measure))
        } else {
            Ok(label)
        }
    }

    /// Base colour for a measure, group-specific when `group` is given
    pub fn color_for(&self, group: Option<usize>, measure: u32) -> Result<&str> {
        match group {
            None => Ok(DEFAULT_MEASURE_COLOR),
            Some(idx) => Ok(self.member(idx, measure)?.color.as_str()),
        }
    }

    pub fn group(&self, idx: usize) -> Result<&MeasureGroup> {
        self.groups
            .get(idx)
            .ok_or_else(|| PlotError::NotFound(format!("measure group {}", idx)))
    }

    pub fn group_name(&self, idx: usize) -> Result<&str> {
        Ok(self.group(idx)?.name.as_str())
    }

    pub fn groups(&self) -> &[MeasureGroup] {
        &self.groups
    }

    /// All named measure ids, ascending
    pub fn measure_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self.names.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn member(&self, idx: usize, measure: u32) -> Result<&GroupMember> {
        let group = self.group(idx)?;
        group.member(measure).ok_or_else(|| {
            PlotError::DataConsistency(format!(
                "measure {} not in measure group {} ('{}')",
                measure, idx, group.name
            ))
        })
    }
}
