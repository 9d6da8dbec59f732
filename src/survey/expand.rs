//! Series expansion
//!
//! Turns role assignments into concrete keys: first the subplot keys, then
//! within each subplot the line (or bar) keys, then for each line the x-axis
//! sample keys. Each step is a fold of [`expand`] over one dimension.
//!
//! Measure groups are represented in later steps by one member measure: the
//! first member present in the data. Enumerations for the whole group (x
//! values, lines) are taken from that measure, so members whose surveys or
//! groups differ from it are sampled at the representative's positions.

use super::catalog::MeasureCatalog;
use super::error::{PlotError, Result};
use super::key::{DimKey, Dimension};
use super::store::ValueStore;
use crate::config::{PlotConfig, Role};
use std::collections::BTreeMap;

/// Combine every seed with every candidate, seed-major
///
/// Entry `i` of the result is `seeds[i / L].merge(&candidates[i % L])`.
/// Zero candidates is a caller bug and fails rather than returning nothing.
pub fn expand(seeds: &[DimKey], candidates: &[DimKey], dimension: &'static str) -> Result<Vec<DimKey>> {
    if candidates.is_empty() {
        return Err(PlotError::EmptyExpansion(dimension));
    }
    let mut out = Vec::with_capacity(seeds.len() * candidates.len());
    for seed in seeds {
        for candidate in candidates {
            out.push(seed.merge(candidate));
        }
    }
    Ok(out)
}

/// Like [`expand`], but candidates are queried separately for each seed
pub fn expand_per_seed<F>(seeds: &[DimKey], dimension: &'static str, mut candidates: F) -> Result<Vec<DimKey>>
where
    F: FnMut(&DimKey) -> Result<Vec<DimKey>>,
{
    let mut out = Vec::new();
    for seed in seeds {
        out.extend(expand(std::slice::from_ref(seed), &candidates(seed)?, dimension)?);
    }
    Ok(out)
}

/// Measures present in the data, by catalog group index
pub type MeasureGroups = BTreeMap<usize, Vec<u32>>;

/// Expands keys for one configuration over one value store
pub struct SeriesExpander<'a> {
    store: &'a dyn ValueStore,
    config: &'a PlotConfig,
    measure_groups: MeasureGroups,
    /// Measures outside every catalog group, when grouping is on
    ungrouped: Vec<u32>,
}

impl<'a> SeriesExpander<'a> {
    /// Index the measures present in `store`
    ///
    /// Every measure must have a catalog entry; an unknown id is a data
    /// consistency error rather than an unnamed subplot.
    pub fn new(
        store: &'a dyn ValueStore,
        catalog: &'a MeasureCatalog,
        config: &'a PlotConfig,
    ) -> Result<Self> {
        let mut measure_groups = MeasureGroups::new();
        let mut ungrouped = Vec::new();
        for m in store.measures() {
            catalog.name_of(m).map_err(|_| {
                PlotError::DataConsistency(format!("measure {} in data has no catalog entry", m))
            })?;
            if !config.auto_measures {
                continue;
            }
            match catalog.group_of(m) {
                Ok(mg) => measure_groups.entry(mg).or_default().push(m),
                Err(PlotError::NotFound(_)) => ungrouped.push(m),
                Err(e) => return Err(e),
            }
        }
        Ok(Self {
            store,
            config,
            measure_groups,
            ungrouped,
        })
    }

    /// Keys of the subplots, in drawing order
    ///
    /// With measure grouping, each group present gives one key carrying the
    /// group index, in catalog order; ungrouped measures follow with a key of
    /// their own. Without it, every measure is its own subplot. Dimensions
    /// with the `plot` role then multiply the keys in order survey, group,
    /// cohort, genotype, file.
    pub fn plot_keys(&self) -> Result<Vec<DimKey>> {
        let measure_keys = if self.config.auto_measures {
            let mut keys: Vec<DimKey> = self
                .measure_groups
                .keys()
                .map(|&mg| DimKey::new().with_measure_group(mg))
                .collect();
            keys.extend(DimKey::from_measures(&self.ungrouped));
            keys
        } else {
            DimKey::from_measures(&self.store.measures())
        };

        let mut plots = expand(&[DimKey::new()], &measure_keys, "measure")?;

        for dim in Dimension::ROLES {
            if self.config.roles.get(dim) != Role::Plot {
                continue;
            }
            plots = expand_per_seed(&plots, dim.name(), |seed| {
                let m = self.representative_measure(seed)?;
                Ok(self.candidates(dim, m))
            })?;
        }

        tracing::debug!(subplots = plots.len(), "Expanded subplot keys");
        Ok(plots)
    }

    /// Measures drawn in a subplot
    pub fn plot_measures(&self, plot: &DimKey) -> Result<Vec<u32>> {
        match (plot.measure_group, plot.measure) {
            (Some(mg), _) => self.measure_groups.get(&mg).cloned().ok_or_else(|| {
                PlotError::DataConsistency(format!("measure group {} has no measures in data", mg))
            }),
            (None, Some(m)) => Ok(vec![m]),
            (None, None) => Err(PlotError::DataConsistency(format!(
                "subplot key {} has neither measure nor measure group",
                plot
            ))),
        }
    }

    /// Measure used to enumerate values for a (possibly grouped) key
    pub fn representative_measure(&self, key: &DimKey) -> Result<u32> {
        if let Some(m) = key.measure {
            return Ok(m);
        }
        self.plot_measures(key)?
            .first()
            .copied()
            .ok_or_else(|| PlotError::DataConsistency(format!("key {} has no measure", key)))
    }

    /// Single-dimension keys for every value of `dim` recorded for `measure`
    pub fn candidates(&self, dim: Dimension, measure: u32) -> Vec<DimKey> {
        match dim {
            Dimension::Measure => DimKey::from_measures(&[measure]),
            Dimension::Survey => DimKey::from_surveys(&self.store.surveys(measure)),
            Dimension::Group => DimKey::from_groups(&self.store.groups(measure)),
            Dimension::Cohort => DimKey::from_cohorts(&self.store.cohorts(measure)),
            Dimension::Genotype => DimKey::from_genotypes(&self.store.genotypes(measure)),
            Dimension::File => DimKey::from_files(&self.store.files()),
        }
    }

    /// Line (or bar) keys within one subplot
    pub fn line_keys(&self, plot: &DimKey, measure: u32) -> Result<Vec<DimKey>> {
        let mut lines = vec![*plot];
        for dim in self.config.roles.lines() {
            lines = expand(&lines, &self.candidates(dim, measure), dim.name())?;
        }
        Ok(lines)
    }

    /// Split each line by the measures of its group, when grouping is on
    pub fn measure_blocks(&self, plot: &DimKey, line: &DimKey) -> Result<Vec<DimKey>> {
        if !self.config.auto_measures {
            return Ok(vec![*line]);
        }
        expand(
            std::slice::from_ref(line),
            &DimKey::from_measures(&self.plot_measures(plot)?),
            "measure",
        )
    }

    /// One key per x-axis position for a line
    pub fn x_keys(&self, line: &DimKey, x_axis: Dimension, measure: u32) -> Result<Vec<DimKey>> {
        expand(
            std::slice::from_ref(line),
            &self.candidates(x_axis, measure),
            x_axis.name(),
        )
    }

    /// Values at each x position of a line
    pub fn values(&self, x_keys: &[DimKey]) -> Result<Vec<f64>> {
        x_keys.iter().map(|k| self.store.get(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Roles;
    use crate::survey::{Record, ValDict};

    fn record(measure: u32, survey: i64, group: i64) -> Record {
        Record {
            file: 0,
            measure,
            survey,
            group,
            cohort: 0,
            genotype: 0,
            value: 1.0,
        }
    }

    /// Survey on the x-axis, age groups as subplots, a single file
    fn group_plot_config(auto_measures: bool) -> PlotConfig {
        let roles = Roles {
            survey: Role::XAxis,
            group: Role::Plot,
            file: Role::None,
            ..Roles::default()
        };
        let mut config = PlotConfig::with_roles(roles).unwrap();
        config.auto_measures = auto_measures;
        config
    }

    fn store_with(config: &PlotConfig, records: &[Record]) -> ValDict {
        let mut store = ValDict::new(config.roles.kept_dimensions());
        store.add_file("output.txt".into());
        for r in records {
            store.insert(r);
        }
        store
    }

    #[test]
    fn test_expand_length_and_order() {
        let seeds = DimKey::from_measures(&[1, 2, 3]);
        let candidates = DimKey::from_surveys(&[10, 20]);
        let out = expand(&seeds, &candidates, "survey").unwrap();

        assert_eq!(out.len(), 6);
        for (i, key) in out.iter().enumerate() {
            assert_eq!(key.measure, seeds[i / 2].measure);
            assert_eq!(key.survey, candidates[i % 2].survey);
        }
    }

    #[test]
    fn test_expand_from_single_empty_seed() {
        let out = expand(&[DimKey::new()], &DimKey::from_files(&[0, 1, 2]), "file").unwrap();
        assert_eq!(out, DimKey::from_files(&[0, 1, 2]));
    }

    #[test]
    fn test_expand_keeps_existing_fields() {
        let seeds = vec![DimKey::new().with_measure(5)];
        let out = expand(&seeds, &DimKey::from_measures(&[1, 2]), "measure").unwrap();
        assert!(out.iter().all(|k| k.measure == Some(5)));
    }

    #[test]
    fn test_expand_rejects_empty_candidates() {
        assert!(matches!(
            expand(&[DimKey::new()], &[], "group"),
            Err(PlotError::EmptyExpansion("group"))
        ));
    }

    #[test]
    fn test_expand_per_seed_varies_branching() {
        let seeds = DimKey::from_measures(&[1, 2]);
        let out = expand_per_seed(&seeds, "group", |seed| {
            let n = seed.measure.unwrap_or(0) as i64 + 1;
            Ok(DimKey::from_groups(&(0..n).collect::<Vec<_>>()))
        })
        .unwrap();
        assert_eq!(out.len(), 2 + 3);
        assert_eq!(out[1], DimKey::new().with_measure(1).with_group(1));
        assert_eq!(out[4], DimKey::new().with_measure(2).with_group(2));
    }

    #[test]
    fn test_group_plots_branch_per_measure() {
        let config = group_plot_config(false);
        let mut records = Vec::new();
        records.extend((1..=5).map(|g| record(13, 1, g)));
        records.extend((1..=3).map(|g| record(14, 1, g)));
        let store = store_with(&config, &records);
        let catalog = MeasureCatalog::builtin().unwrap();

        let plots = SeriesExpander::new(&store, catalog, &config)
            .unwrap()
            .plot_keys()
            .unwrap();

        assert_eq!(plots.len(), 8);
        for (i, key) in plots.iter().enumerate() {
            let (measure, group) = if i < 5 { (13, i as i64 + 1) } else { (14, i as i64 - 4) };
            assert_eq!(key, &DimKey::new().with_measure(measure).with_group(group));
        }
    }

    #[test]
    fn test_grouped_subplots_in_catalog_order() {
        let config = group_plot_config(true);
        let mut records = Vec::new();
        records.extend((1..=5).map(|g| record(13, 1, g)));
        records.extend((1..=3).map(|g| record(14, 1, g)));
        let store = store_with(&config, &records);
        let catalog = MeasureCatalog::builtin().unwrap();

        let plots = SeriesExpander::new(&store, catalog, &config)
            .unwrap()
            .plot_keys()
            .unwrap();

        // measure 14 ("uncomp cases", group 6) before measure 13 ("severe cases", group 7)
        assert_eq!(plots.len(), 8);
        assert!(plots[..3].iter().all(|k| k.measure_group == Some(6)));
        assert!(plots[3..].iter().all(|k| k.measure_group == Some(7)));
        assert_eq!(plots[2].group, Some(3));
        assert_eq!(plots[7].group, Some(5));
    }

    #[test]
    fn test_group_plots_follow_representative_measure() {
        // measures 1 and 3 share a group; measure 1 is present first and
        // decides the age groups even though measure 3 has more
        let config = group_plot_config(true);
        let mut records = Vec::new();
        records.extend((1..=2).map(|g| record(1, 1, g)));
        records.extend((1..=4).map(|g| record(3, 1, g)));
        let store = store_with(&config, &records);
        let catalog = MeasureCatalog::builtin().unwrap();

        let expander = SeriesExpander::new(&store, catalog, &config).unwrap();
        let plots = expander.plot_keys().unwrap();

        assert_eq!(plots.len(), 2);
        assert_eq!(expander.representative_measure(&plots[0]).unwrap(), 1);
        assert_eq!(expander.plot_measures(&plots[1]).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_ungrouped_measures_follow_groups() {
        let config = group_plot_config(true);
        let store = store_with(&config, &[record(9, 1, 1), record(13, 1, 1)]);
        let catalog = MeasureCatalog::builtin().unwrap();

        let plots = SeriesExpander::new(&store, catalog, &config)
            .unwrap()
            .plot_keys()
            .unwrap();

        assert_eq!(plots[0].measure_group, Some(7));
        assert_eq!(plots[1].measure, Some(9));
        assert_eq!(plots[1].measure_group, None);
    }

    #[test]
    fn test_uncatalogued_measure_rejected() {
        for auto_measures in [true, false] {
            let config = group_plot_config(auto_measures);
            let store = store_with(&config, &[record(37, 1, 1)]);
            let catalog = MeasureCatalog::builtin().unwrap();

            match SeriesExpander::new(&store, catalog, &config) {
                Err(PlotError::DataConsistency(msg)) => assert!(msg.contains("37")),
                Err(other) => panic!("expected data consistency error, got {:?}", other),
                Ok(_) => panic!("measure 37 accepted"),
            }
        }
    }
}
