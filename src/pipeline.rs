//! Shared plot generation pipeline
//!
//! The pipeline:
//! 1. Reads every output file into the value store (filtered, aggregated)
//! 2. Expands subplot keys, then line and x-axis keys per subplot
//! 3. Builds a [`Figure`] with labels, colours, bars or lines and legends
//! 4. Hands the figure to a [`ChartRenderer`]

use crate::config::{BarLayout, PlotConfig};
use crate::render::{
    Annotation, ChartRenderer, DrawCall, Figure, Legend, LegendEntry, Subplot, XTicks,
};
use crate::survey::{
    ColorRegistry, DimKey, Dimension, LabelContext, MeasureCatalog, Result, SeriesExpander,
    UsedColors, ValDict, ValueStore,
};
use std::path::Path;

/// Share of each x slot used by the bars of all lines
const PLOT_USE: f64 = 0.95;

/// Share of one line's slot used by its blocks
const BAR_USE: f64 = 0.8;

/// Gap between a bar top and its annotation, as a share of the tallest bar
const ANNOTATION_GAP: f64 = 0.02;

/// X positions of one subplot
#[derive(Debug, Clone, PartialEq)]
enum XValues {
    Numeric(Vec<i64>),
    Named(Vec<String>),
}

impl XValues {
    fn len(&self) -> usize {
        match self {
            XValues::Numeric(v) => v.len(),
            XValues::Named(v) => v.len(),
        }
    }

    fn labels(&self) -> Vec<String> {
        match self {
            XValues::Numeric(v) => v.iter().map(i64::to_string).collect(),
            XValues::Named(v) => v.clone(),
        }
    }
}

/// Bar stack annotation waiting for the subplot's height range
struct PendingLabel {
    x: f64,
    top: f64,
    bracket: bool,
    text: String,
}

/// Reads survey output and turns it into figures
pub struct Plotter<S = ValDict> {
    store: S,
    config: PlotConfig,
    catalog: &'static MeasureCatalog,
    palette: &'static ColorRegistry,
}

impl Plotter<ValDict> {
    /// Plotter over an empty store keeping the dimensions `config` uses
    pub fn new(config: PlotConfig) -> Result<Self> {
        let store = ValDict::new(config.roles.kept_dimensions());
        Self::with_store(store, config)
    }
}

impl<S: ValueStore> Plotter<S> {
    pub fn with_store(store: S, config: PlotConfig) -> Result<Self> {
        Ok(Self {
            store,
            config,
            catalog: MeasureCatalog::builtin()?,
            palette: ColorRegistry::builtin()?,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Read one output file through the configured filter
    pub fn read(&mut self, path: &Path) -> Result<()> {
        self.store
            .read(path, &self.config.filter, self.config.debug_filter)
    }

    /// Build the figure and hand it to `renderer`
    pub fn plot(&self, renderer: &mut dyn ChartRenderer) -> Result<()> {
        let figure = self.build_figure()?;
        tracing::info!(
            subplots = figure.subplots.len(),
            rows = figure.rows,
            cols = figure.cols,
            series = figure.draw_count(),
            "Rendering figure"
        );
        renderer.render(&figure)
    }

    /// Assemble every subplot of the figure
    pub fn build_figure(&self) -> Result<Figure> {
        let expander = SeriesExpander::new(&self.store, self.catalog, &self.config)?;
        let ctx = LabelContext {
            catalog: self.catalog,
            store: &self.store,
            append_measure_number: self.config.append_measure_number,
            short_file_names: self.config.short_file_names,
        };

        let plots = expander.plot_keys()?;
        let (_, cols) = Figure::grid(plots.len());

        let mut subplots = Vec::with_capacity(plots.len());
        for (index, plot) in plots.iter().enumerate() {
            subplots.push(self.build_subplot(&expander, &ctx, index, cols, plot)?);
        }
        Ok(Figure::new(subplots))
    }

    fn build_subplot(
        &self,
        expander: &SeriesExpander<'_>,
        ctx: &LabelContext<'_>,
        index: usize,
        cols: usize,
        plot: &DimKey,
    ) -> Result<Subplot> {
        let m = expander.representative_measure(plot)?;
        let x_axis = self.config.x_axis;
        let x = self.x_values(x_axis, m);
        let lines = expander.line_keys(plot, m)?;

        tracing::debug!(plot = %plot, measure = m, lines = lines.len(), "Building subplot");

        let mut subplot = Subplot::new(index, cols, self.config.y_scale);
        let labels = self.config.labels;
        if labels.title {
            subplot.title = Some(self.title(expander, plot)?);
        }
        if labels.x_label {
            subplot.x_label = Some(match x_axis {
                Dimension::Group => self.store.group_label(m).to_string(),
                other => other.name().to_string(),
            });
        }
        if labels.y_label {
            subplot.y_label = Some(match plot.measure_group {
                Some(mg) => self.catalog.group_name(mg)?.to_string(),
                None => self.catalog.label_for(None, m, ctx.append_measure_number)?,
            });
        }

        match &x {
            XValues::Numeric(values) if values.len() > 1 => {
                let xs: Vec<f64> = values.iter().map(|&v| v as f64).collect();
                self.draw_lines(expander, ctx, &mut subplot, plot, &lines, &xs, m)?;
            }
            _ => self.draw_bars(expander, ctx, &mut subplot, plot, &lines, &x, m)?,
        }

        Ok(subplot)
    }

    fn title(&self, expander: &SeriesExpander<'_>, plot: &DimKey) -> Result<String> {
        match plot.measure_group {
            Some(_) => {
                let measures = expander.plot_measures(plot)?;
                let list: Vec<String> = measures.iter().map(u32::to_string).collect();
                Ok(format!("Measures {}", list.join(", ")))
            }
            None => Ok(format!(
                "Measure {}",
                expander.representative_measure(plot)?
            )),
        }
    }

    fn x_values(&self, x_axis: Dimension, m: u32) -> XValues {
        match x_axis {
            Dimension::Survey => XValues::Numeric(self.store.surveys(m)),
            Dimension::Group => XValues::Numeric(self.store.groups(m)),
            Dimension::Cohort => XValues::Numeric(self.store.cohorts(m)),
            Dimension::Genotype => XValues::Numeric(self.store.genotypes(m)),
            Dimension::File | Dimension::Measure => {
                XValues::Named(self.store.file_names(self.config.short_file_names))
            }
        }
    }

    /// Show a legend when grouping measures or drawing more than one series
    fn wants_legend(&self, drawn: usize) -> bool {
        self.config.show_legends && (self.config.auto_measures || drawn > 1)
    }

    /// XY line chart: one line per line key (and per measure when grouping)
    #[allow(clippy::too_many_arguments)]
    fn draw_lines(
        &self,
        expander: &SeriesExpander<'_>,
        ctx: &LabelContext<'_>,
        subplot: &mut Subplot,
        plot: &DimKey,
        lines: &[DimKey],
        xs: &[f64],
        m: u32,
    ) -> Result<()> {
        let mut series = Vec::new();
        for line in lines {
            series.extend(expander.measure_blocks(plot, line)?);
        }

        let mut used = UsedColors::new();
        let mut entries = Vec::new();
        for line in &series {
            let x_keys = expander.x_keys(line, self.config.x_axis, m)?;
            let y = expander.values(&x_keys)?;
            let base = self
                .catalog
                .color_for(line.measure_group, line.measure.unwrap_or(m))?;
            let color = self.palette.ensure_unique(base, &mut used)?;

            let draw = DrawCall::Line {
                x: xs.to_vec(),
                y,
                color: color.clone(),
            };
            if let Err(e) = draw.validate() {
                tracing::warn!(draw = ?draw, "{}; series skipped", e);
                continue;
            }
            subplot.draws.push(draw);
            entries.push(LegendEntry {
                label: line.label(plot, ctx)?,
                color,
            });
        }

        if self.wants_legend(subplot.draws.len()) {
            subplot.legend = Some(Legend { entries });
        }
        Ok(())
    }

    /// Bar chart: one bar (or stack of blocks) per line at each x position
    #[allow(clippy::too_many_arguments)]
    fn draw_bars(
        &self,
        expander: &SeriesExpander<'_>,
        ctx: &LabelContext<'_>,
        subplot: &mut Subplot,
        plot: &DimKey,
        lines: &[DimKey],
        x: &XValues,
        m: u32,
    ) -> Result<()> {
        let n = x.len();
        let slots: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let width = PLOT_USE / lines.len() as f64;
        let mut xincr = 0.5 * (1.0 - PLOT_USE);

        let mut used = UsedColors::new();
        let mut first_stack: Option<Vec<LegendEntry>> = None;
        let mut pending = Vec::new();
        let mut drawn = 0usize;

        for line in lines {
            let stack = expander.measure_blocks(plot, line)?;
            let subwidth = width * BAR_USE / stack.len() as f64;
            let mut xsubincr = width * 0.5 * (1.0 - BAR_USE);
            let mut ytop = vec![0.0; n];
            let mut stack_entries = Vec::with_capacity(stack.len());

            for block in &stack {
                let x_keys = expander.x_keys(block, self.config.x_axis, m)?;
                let y = expander.values(&x_keys)?;
                let base = self
                    .catalog
                    .color_for(block.measure_group, block.measure.unwrap_or(m))?;
                // grouped measures keep their catalog colours across lines
                let color = if self.config.auto_measures {
                    base.to_string()
                } else {
                    self.palette.ensure_unique(base, &mut used)?
                };

                let draw = match self.config.bar_layout {
                    BarLayout::SideBySide => DrawCall::Bar {
                        x: slots.iter().map(|s| s + xincr + xsubincr).collect(),
                        bottom: vec![0.0; y.len()],
                        heights: y.clone(),
                        width: subwidth,
                        color: color.clone(),
                    },
                    BarLayout::Stacked => DrawCall::Bar {
                        x: slots.iter().map(|s| s + xincr).collect(),
                        bottom: ytop.clone(),
                        heights: y.clone(),
                        width,
                        color: color.clone(),
                    },
                };
                xsubincr += subwidth;

                if let Err(e) = draw.validate() {
                    tracing::warn!(draw = ?draw, ytop = ?ytop, "{}; series skipped", e);
                    continue;
                }
                for (top, value) in ytop.iter_mut().zip(&y) {
                    match self.config.bar_layout {
                        BarLayout::SideBySide => *top = top.max(*value),
                        BarLayout::Stacked => *top += value,
                    }
                }
                subplot.draws.push(draw);
                drawn += 1;
                stack_entries.push(LegendEntry {
                    label: block.label(line, ctx)?,
                    color,
                });
            }

            if first_stack.is_none() {
                first_stack = Some(stack_entries);
            }

            if self.config.auto_measures {
                let text = line.label(plot, ctx)?;
                for (slot, top) in slots.iter().zip(&ytop) {
                    pending.push(PendingLabel {
                        x: slot + xincr + width / 2.0,
                        top: *top,
                        bracket: stack.len() > 1,
                        text: text.clone(),
                    });
                }
            }
            xincr += width;
        }

        let y_max = pending.iter().map(|p| p.top).fold(0.0, f64::max);
        let gap = if y_max > 0.0 { y_max * ANNOTATION_GAP } else { ANNOTATION_GAP };
        for label in pending {
            let mut y = label.top + gap;
            if label.bracket {
                subplot.annotations.push(Annotation::Bracket {
                    x: label.x,
                    y,
                    half_width: width * BAR_USE * 0.5,
                });
                y += gap;
            }
            if !label.text.is_empty() {
                subplot.annotations.push(Annotation::Text {
                    x: label.x,
                    y,
                    text: label.text,
                });
            }
        }

        subplot.x_ticks = Some(XTicks {
            positions: slots.iter().map(|s| s + 0.5).collect(),
            labels: x.labels(),
            limits: (0.0, n as f64),
        });

        if self.wants_legend(drawn) {
            subplot.legend = Some(Legend {
                entries: first_stack.unwrap_or_default(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Role, Roles};
    use crate::render::RecordingRenderer;
    use crate::survey::Record;

    fn record(file: usize, measure: u32, survey: i64, group: i64, value: f64) -> Record {
        Record {
            file,
            measure,
            survey,
            group,
            cohort: 0,
            genotype: 0,
            value,
        }
    }

    fn plotter(roles: Roles, records: &[Record], files: usize) -> Plotter {
        let config = PlotConfig::with_roles(roles).unwrap();
        let mut store = ValDict::new(config.roles.kept_dimensions());
        for f in 0..files {
            store.add_file(format!("run{}.txt", f).into());
        }
        for r in records {
            store.insert(r);
        }
        Plotter::with_store(store, config).unwrap()
    }

    fn survey_x() -> Roles {
        Roles {
            survey: Role::XAxis,
            ..Roles::default()
        }
    }

    #[test]
    fn test_grouped_measures_share_subplot() {
        let records = [
            record(0, 1, 1, 1, 10.0),
            record(0, 1, 2, 1, 12.0),
            record(0, 3, 1, 1, 4.0),
            record(0, 3, 2, 1, 5.0),
        ];
        let figure = plotter(survey_x(), &records, 1).build_figure().unwrap();

        assert_eq!(figure.subplots.len(), 1);
        let subplot = &figure.subplots[0];
        assert_eq!(subplot.title.as_deref(), Some("Measures 1, 3"));
        assert_eq!(subplot.y_label.as_deref(), Some("infected hosts"));
        assert_eq!(subplot.x_label.as_deref(), Some("survey"));
        assert_eq!(subplot.draws.len(), 2);
        assert_eq!(
            subplot.draws[0],
            DrawCall::Line {
                x: vec![1.0, 2.0],
                y: vec![10.0, 12.0],
                color: "red".into(),
            }
        );
        assert_eq!(subplot.draws[1].color(), "blue");

        let legend = subplot.legend.as_ref().unwrap();
        assert_eq!(legend.entries.len(), 2);
        assert_eq!(legend.entries[0].label, "all");
        assert_eq!(legend.entries[1].label, "patent");
    }

    #[test]
    fn test_single_ungrouped_series_has_no_legend() {
        let records = [record(0, 1, 1, 1, 1.0), record(0, 1, 2, 1, 2.0)];
        let mut p = plotter(survey_x(), &records, 1);
        p.config.auto_measures = false;
        let figure = p.build_figure().unwrap();

        let subplot = &figure.subplots[0];
        assert_eq!(subplot.title.as_deref(), Some("Measure 1"));
        assert_eq!(subplot.y_label.as_deref(), Some("nInfect"));
        assert_eq!(subplot.draws[0].color(), "blue");
        assert!(subplot.legend.is_none());
    }

    #[test]
    fn test_line_colors_are_unique() {
        let roles = Roles {
            survey: Role::XAxis,
            group: Role::Line,
            ..Roles::default()
        };
        let records = [
            record(0, 1, 1, 1, 1.0),
            record(0, 1, 2, 1, 2.0),
            record(0, 1, 1, 2, 3.0),
            record(0, 1, 2, 2, 4.0),
        ];
        let mut p = plotter(roles, &records, 1);
        p.config.auto_measures = false;
        let figure = p.build_figure().unwrap();

        let colors: Vec<&str> = figure.subplots[0].draws.iter().map(DrawCall::color).collect();
        assert_eq!(colors, vec!["blue", "blueviolet"]);
        let legend = figure.subplots[0].legend.as_ref().unwrap();
        assert_eq!(legend.entries[0].label, "group 1");
        assert_eq!(legend.entries[1].label, "group 2");
    }

    #[test]
    fn test_single_survey_draws_bars() {
        let records = [record(0, 1, 1, 1, 6.0), record(0, 3, 1, 1, 2.0)];
        let figure = plotter(survey_x(), &records, 1).build_figure().unwrap();

        let subplot = &figure.subplots[0];
        assert_eq!(subplot.draws.len(), 2);
        match &subplot.draws[0] {
            DrawCall::Bar { x, width, heights, .. } => {
                let subwidth = 0.95 * 0.8 / 2.0;
                assert!((width - subwidth).abs() < 1e-12);
                assert!((x[0] - (0.025 + 0.95 * 0.1)).abs() < 1e-12);
                assert_eq!(heights, &vec![6.0]);
            }
            other => panic!("expected bar, got {:?}", other),
        }

        let ticks = subplot.x_ticks.as_ref().unwrap();
        assert_eq!(ticks.positions, vec![0.5]);
        assert_eq!(ticks.labels, vec!["1"]);
        assert_eq!(ticks.limits, (0.0, 1.0));

        // two blocks in the stack: bracket, no text for the subplot's own line
        assert!(matches!(subplot.annotations[0], Annotation::Bracket { .. }));
        assert_eq!(subplot.annotations.len(), 1);
        assert_eq!(subplot.legend.as_ref().unwrap().entries.len(), 2);
    }

    #[test]
    fn test_stacked_bars_accumulate() {
        let roles = Roles {
            file: Role::XAxis,
            ..Roles::default()
        };
        let records = [
            record(0, 1, 1, 1, 6.0),
            record(0, 3, 1, 1, 2.0),
            record(1, 1, 1, 1, 5.0),
            record(1, 3, 1, 1, 1.0),
        ];
        let mut p = plotter(roles, &records, 2);
        p.config.bar_layout = BarLayout::Stacked;
        let figure = p.build_figure().unwrap();

        let subplot = &figure.subplots[0];
        assert_eq!(subplot.x_label.as_deref(), Some("file"));
        match &subplot.draws[1] {
            DrawCall::Bar { bottom, heights, width, .. } => {
                assert_eq!(bottom, &vec![6.0, 5.0]);
                assert_eq!(heights, &vec![2.0, 1.0]);
                assert!((width - 0.95).abs() < 1e-12);
            }
            other => panic!("expected bar, got {:?}", other),
        }
        let ticks = subplot.x_ticks.as_ref().unwrap();
        assert_eq!(ticks.labels, vec!["1", "2"]);
    }

    #[test]
    fn test_group_axis_label() {
        let roles = Roles {
            group: Role::XAxis,
            ..Roles::default()
        };
        let records = [record(0, 32, 1, 1, 1.0), record(0, 32, 1, 2, 2.0)];
        let mut p = plotter(roles, &records, 1);
        p.config.auto_measures = false;
        let figure = p.build_figure().unwrap();
        assert_eq!(figure.subplots[0].x_label.as_deref(), Some("species"));
    }

    #[test]
    fn test_hidden_title_appends_measure_number() {
        let records = [record(0, 1, 1, 1, 1.0), record(0, 1, 2, 1, 2.0)];
        let mut p = plotter(survey_x(), &records, 1);
        p.config.auto_measures = false;
        p.config.labels.title = false;
        p.config.append_measure_number = true;
        let figure = p.build_figure().unwrap();
        assert!(figure.subplots[0].title.is_none());
        assert_eq!(figure.subplots[0].y_label.as_deref(), Some("nInfect (1)"));
    }

    #[test]
    fn test_invalid_series_is_skipped() {
        let records = [
            record(0, 1, 1, 1, f64::NAN),
            record(0, 1, 2, 1, 12.0),
            record(0, 3, 1, 1, 4.0),
            record(0, 3, 2, 1, 5.0),
        ];
        let figure = plotter(survey_x(), &records, 1).build_figure().unwrap();

        let subplot = &figure.subplots[0];
        assert_eq!(subplot.draws.len(), 1);
        assert_eq!(subplot.draws[0].color(), "blue");
        let legend = subplot.legend.as_ref().unwrap();
        assert_eq!(legend.entries.len(), 1);
        assert_eq!(legend.entries[0].label, "patent");
    }

    #[test]
    fn test_invalid_bar_block_is_skipped() {
        let records = [record(0, 1, 1, 1, f64::NAN), record(0, 3, 1, 1, 2.0)];
        let figure = plotter(survey_x(), &records, 1).build_figure().unwrap();

        let subplot = &figure.subplots[0];
        assert_eq!(subplot.draws.len(), 1);
        let legend = subplot.legend.as_ref().unwrap();
        assert_eq!(legend.entries.len(), 1);
        assert_eq!(legend.entries[0].color, "blue");
    }

    #[test]
    fn test_plot_hands_figure_to_renderer() {
        let records = [record(0, 1, 1, 1, 1.0)];
        let p = plotter(survey_x(), &records, 1);
        let mut renderer = RecordingRenderer::new();
        p.plot(&mut renderer).unwrap();
        assert_eq!(renderer.figures.len(), 1);
        assert_eq!(renderer.last().unwrap().rows, 1);
    }
}
