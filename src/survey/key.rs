//! Partial coordinates in the measure/survey/group/cohort/genotype/file space
//!
//! A [`DimKey`] names one point, or a slice, of the survey output index. Keys
//! start mostly unset and are filled in step by step by the expander, one
//! dimension at a time, via [`DimKey::merge`].

use super::catalog::MeasureCatalog;
use super::error::{PlotError, Result};
use super::store::ValueStore;
use serde::Serialize;
use std::fmt;

/// Independent dimensions of the survey output index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Measure,
    Survey,
    Group,
    Cohort,
    Genotype,
    File,
}

impl Dimension {
    /// Dimensions that take a plotting role, in precedence order
    pub const ROLES: [Dimension; 5] = [
        Dimension::Survey,
        Dimension::Group,
        Dimension::Cohort,
        Dimension::Genotype,
        Dimension::File,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Measure => "measure",
            Dimension::Survey => "survey",
            Dimension::Group => "group",
            Dimension::Cohort => "cohort",
            Dimension::Genotype => "genotype",
            Dimension::File => "file",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable partial coordinate; `None` means unset (distinct from zero)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DimKey {
    /// Index into the measure catalog's group list
    pub measure_group: Option<usize>,
    pub measure: Option<u32>,
    pub survey: Option<i64>,
    /// Age group or species, depending on the measure
    pub group: Option<i64>,
    pub cohort: Option<i64>,
    pub genotype: Option<i64>,
    /// Index of the source file in read order
    pub file: Option<usize>,
}

impl DimKey {
    /// Fully unset key, the seed of every expansion
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_measure_group(mut self, measure_group: usize) -> Self {
        self.measure_group = Some(measure_group);
        self
    }

    pub fn with_measure(mut self, measure: u32) -> Self {
        self.measure = Some(measure);
        self
    }

    pub fn with_survey(mut self, survey: i64) -> Self {
        self.survey = Some(survey);
        self
    }

    pub fn with_group(mut self, group: i64) -> Self {
        self.group = Some(group);
        self
    }

    pub fn with_cohort(mut self, cohort: i64) -> Self {
        self.cohort = Some(cohort);
        self
    }

    pub fn with_genotype(mut self, genotype: i64) -> Self {
        self.genotype = Some(genotype);
        self
    }

    pub fn with_file(mut self, file: usize) -> Self {
        self.file = Some(file);
        self
    }

    /// Fill every field unset in `self` from `other`
    pub fn merge(&self, other: &DimKey) -> DimKey {
        DimKey {
            measure_group: self.measure_group.or(other.measure_group),
            measure: self.measure.or(other.measure),
            survey: self.survey.or(other.survey),
            group: self.group.or(other.group),
            cohort: self.cohort.or(other.cohort),
            genotype: self.genotype.or(other.genotype),
            file: self.file.or(other.file),
        }
    }

    pub fn from_measure_groups(measure_groups: &[usize]) -> Vec<DimKey> {
        measure_groups
            .iter()
            .map(|&mg| DimKey::new().with_measure_group(mg))
            .collect()
    }

    pub fn from_measures(measures: &[u32]) -> Vec<DimKey> {
        measures
            .iter()
            .map(|&m| DimKey::new().with_measure(m))
            .collect()
    }

    pub fn from_surveys(surveys: &[i64]) -> Vec<DimKey> {
        surveys
            .iter()
            .map(|&s| DimKey::new().with_survey(s))
            .collect()
    }

    pub fn from_groups(groups: &[i64]) -> Vec<DimKey> {
        groups.iter().map(|&g| DimKey::new().with_group(g)).collect()
    }

    pub fn from_cohorts(cohorts: &[i64]) -> Vec<DimKey> {
        cohorts
            .iter()
            .map(|&c| DimKey::new().with_cohort(c))
            .collect()
    }

    pub fn from_genotypes(genotypes: &[i64]) -> Vec<DimKey> {
        genotypes
            .iter()
            .map(|&gt| DimKey::new().with_genotype(gt))
            .collect()
    }

    pub fn from_files(files: &[usize]) -> Vec<DimKey> {
        files.iter().map(|&f| DimKey::new().with_file(f)).collect()
    }

    /// Describe the fields of `self` that differ from `base`
    ///
    /// Fragments are emitted in field order (measure, survey, group, cohort,
    /// genotype, file) and joined with `", "`. A key labelled against itself
    /// yields the empty string.
    pub fn label(&self, base: &DimKey, ctx: &LabelContext<'_>) -> Result<String> {
        let mut parts: Vec<String> = Vec::new();

        if self.measure != base.measure {
            let measure = self.measure.ok_or_else(|| {
                PlotError::DataConsistency(format!(
                    "cannot label key without a measure against base {}",
                    base
                ))
            })?;
            parts.push(ctx.catalog.label_for(
                self.measure_group,
                measure,
                ctx.append_measure_number,
            )?);
        }
        if self.survey != base.survey {
            parts.push(format!("survey {}", display_opt(self.survey)));
        }
        if self.group != base.group {
            parts.push(format!("group {}", display_opt(self.group)));
        }
        if self.cohort != base.cohort {
            parts.push(format!("cohort {}", display_opt(self.cohort)));
        }
        if self.genotype != base.genotype {
            parts.push(format!("genotype {}", display_opt(self.genotype)));
        }
        if self.file != base.file {
            let name = match self.file {
                Some(f) => ctx.store.file_name(f, ctx.short_file_names)?,
                None => "-".to_string(),
            };
            parts.push(format!("file {}", name));
        }

        Ok(parts.join(", "))
    }
}

fn display_opt<T: fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Raw field dump, for logs
impl fmt::Display for DimKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[mg={} m={} s={} g={} c={} gt={} f={}]",
            display_opt(self.measure_group),
            display_opt(self.measure),
            display_opt(self.survey),
            display_opt(self.group),
            display_opt(self.cohort),
            display_opt(self.genotype),
            display_opt(self.file)
        )
    }
}

/// Everything label derivation needs besides the keys themselves
pub struct LabelContext<'a> {
    pub catalog: &'a MeasureCatalog,
    pub store: &'a dyn ValueStore,
    /// Append " (id)" to measure labels
    pub append_measure_number: bool,
    /// Show files as their 1-based index instead of their path
    pub short_file_names: bool,
}
