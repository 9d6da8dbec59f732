//! Keyed value storage for survey output
//!
//! [`ValDict`] keeps the dimensions that take part in plotting and sums the
//! rest away as records are inserted. Lookups go through [`DimKey`]s produced
//! by the expander.

use super::error::{PlotError, Result};
use super::filter::Filter;
use super::key::{DimKey, Dimension};
use super::reader::{read_records, Record};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Query interface the expander and labeller rely on
pub trait ValueStore {
    /// Read one output file, keeping the records `filter` accepts
    fn read(&mut self, path: &Path, filter: &Filter, debug_filter: bool) -> Result<()>;

    /// Measures present, ascending
    fn measures(&self) -> Vec<u32>;

    fn surveys(&self, measure: u32) -> Vec<i64>;

    fn groups(&self, measure: u32) -> Vec<i64>;

    /// Axis label for the group dimension of `measure`
    fn group_label(&self, measure: u32) -> &'static str;

    fn cohorts(&self, measure: u32) -> Vec<i64>;

    fn genotypes(&self, measure: u32) -> Vec<i64>;

    /// Indices of the files read so far
    fn files(&self) -> Vec<usize>;

    /// Display name of one file: 1-based index when `short`, else its path
    fn file_name(&self, file: usize, short: bool) -> Result<String>;

    fn file_names(&self, short: bool) -> Vec<String> {
        self.files()
            .into_iter()
            .filter_map(|f| self.file_name(f, short).ok())
            .collect()
    }

    /// Value at a resolved key; absent combinations are an empty sum (0)
    fn get(&self, key: &DimKey) -> Result<f64>;
}

/// Storage cell: measure plus each kept dimension (None when aggregated)
type Cell = (
    u32,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<i64>,
    Option<usize>,
);

/// In-memory value store over one or more survey output files
#[derive(Debug, Clone, Default)]
pub struct ValDict {
    kept: BTreeSet<Dimension>,
    values: HashMap<Cell, f64>,
    surveys: BTreeMap<u32, BTreeSet<i64>>,
    groups: BTreeMap<u32, BTreeSet<i64>>,
    cohorts: BTreeMap<u32, BTreeSet<i64>>,
    genotypes: BTreeMap<u32, BTreeSet<i64>>,
    files: Vec<PathBuf>,
}

impl ValDict {
    /// Store that keeps the given dimensions and sums away the others
    ///
    /// The measure dimension is always kept.
    pub fn new(kept: BTreeSet<Dimension>) -> Self {
        Self {
            kept,
            ..Default::default()
        }
    }

    pub fn keeps(&self, dim: Dimension) -> bool {
        dim == Dimension::Measure || self.kept.contains(&dim)
    }

    /// Register a source file, returning its index
    pub fn add_file(&mut self, path: PathBuf) -> usize {
        self.files.push(path);
        self.files.len() - 1
    }

    /// Add one record's value into its cell
    pub fn insert(&mut self, record: &Record) {
        let m = record.measure;
        let cell: Cell = (
            m,
            self.kept_value(Dimension::Survey, record.survey),
            self.kept_value(Dimension::Group, record.group),
            self.kept_value(Dimension::Cohort, record.cohort),
            self.kept_value(Dimension::Genotype, record.genotype),
            self.keeps(Dimension::File).then_some(record.file),
        );
        *self.values.entry(cell).or_insert(0.0) += record.value;

        // Enumerations are always tracked per measure so a measure is known
        // even when every other dimension is aggregated.
        self.surveys.entry(m).or_default();
        if self.keeps(Dimension::Survey) {
            self.surveys.entry(m).or_default().insert(record.survey);
        }
        if self.keeps(Dimension::Group) {
            self.groups.entry(m).or_default().insert(record.group);
        }
        if self.keeps(Dimension::Cohort) {
            self.cohorts.entry(m).or_default().insert(record.cohort);
        }
        if self.keeps(Dimension::Genotype) {
            self.genotypes.entry(m).or_default().insert(record.genotype);
        }
    }

    fn kept_value(&self, dim: Dimension, value: i64) -> Option<i64> {
        self.keeps(dim).then_some(value)
    }

    fn lookup_field<T: Copy>(&self, dim: Dimension, value: Option<T>, key: &DimKey) -> Result<Option<T>> {
        if !self.keeps(dim) {
            return Ok(None);
        }
        value.map(Some).ok_or_else(|| {
            PlotError::DataConsistency(format!("lookup key {} has no {}", key, dim))
        })
    }
}

fn enumerate(map: &BTreeMap<u32, BTreeSet<i64>>, measure: u32) -> Vec<i64> {
    map.get(&measure)
        .map(|set| set.iter().copied().collect())
        .unwrap_or_default()
}

impl ValueStore for ValDict {
    fn read(&mut self, path: &Path, filter: &Filter, debug_filter: bool) -> Result<()> {
        let file = self.files.len();
        let records = read_records(path, file)?;
        self.add_file(path.to_path_buf());

        let total = records.len();
        let mut kept = 0usize;
        for record in &records {
            let accepted = filter.matches(record);
            if debug_filter {
                tracing::info!(
                    f = record.file,
                    m = record.measure,
                    s = record.survey,
                    g = record.group,
                    c = record.cohort,
                    gt = record.genotype,
                    accepted,
                    "filter '{}'",
                    filter
                );
            }
            if accepted {
                self.insert(record);
                kept += 1;
            }
        }

        tracing::info!(
            path = %path.display(),
            records = total,
            kept,
            measures = self.surveys.len(),
            "Read survey output"
        );

        if self.measures().is_empty() {
            return Err(PlotError::EmptyData);
        }
        Ok(())
    }

    fn measures(&self) -> Vec<u32> {
        self.surveys.keys().copied().collect()
    }

    fn surveys(&self, measure: u32) -> Vec<i64> {
        enumerate(&self.surveys, measure)
    }

    fn groups(&self, measure: u32) -> Vec<i64> {
        enumerate(&self.groups, measure)
    }

    fn group_label(&self, measure: u32) -> &'static str {
        match measure {
            31..=36 => "species",
            40 | 49 | 72 | 73 => "drug",
            _ => "age group",
        }
    }

    fn cohorts(&self, measure: u32) -> Vec<i64> {
        enumerate(&self.cohorts, measure)
    }

    fn genotypes(&self, measure: u32) -> Vec<i64> {
        enumerate(&self.genotypes, measure)
    }

    fn files(&self) -> Vec<usize> {
        (0..self.files.len()).collect()
    }

    fn file_name(&self, file: usize, short: bool) -> Result<String> {
        let path = self
            .files
            .get(file)
            .ok_or_else(|| PlotError::NotFound(format!("file index {}", file)))?;
        if short {
            Ok((file + 1).to_string())
        } else {
            Ok(path.display().to_string())
        }
    }

    fn get(&self, key: &DimKey) -> Result<f64> {
        let measure = key.measure.ok_or_else(|| {
            PlotError::DataConsistency(format!("lookup key {} has no measure", key))
        })?;
        let cell: Cell = (
            measure,
            self.lookup_field(Dimension::Survey, key.survey, key)?,
            self.lookup_field(Dimension::Group, key.group, key)?,
            self.lookup_field(Dimension::Cohort, key.cohort, key)?,
            self.lookup_field(Dimension::Genotype, key.genotype, key)?,
            self.lookup_field(Dimension::File, key.file, key)?,
        );
        Ok(self.values.get(&cell).copied().unwrap_or(0.0))
    }
}
