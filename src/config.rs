//! Plot configuration from command-line options
//!
//! Options are parsed by clap into [`Cli`](crate::cli::Cli) and validated
//! here into a [`PlotConfig`]. Role assignment is resolved once: the x-axis
//! fallback is applied and a dual x-axis assignment is rejected before any
//! data is read.

use crate::cli::Cli;
use crate::survey::{Dimension, Filter, PlotError, Result};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Plotting purpose of one dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Role {
    /// Aggregated away (values are summed)
    #[default]
    None,
    /// Positions along the x-axis
    XAxis,
    /// One subplot per value
    Plot,
    /// One line (or bar) per value within a subplot
    Line,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::None => "none",
            Role::XAxis => "x-axis",
            Role::Plot => "plot",
            Role::Line => "line",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of each role-taking dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roles {
    pub survey: Role,
    pub group: Role,
    pub cohort: Role,
    pub genotype: Role,
    pub file: Role,
}

impl Default for Roles {
    /// Files become subplots; everything else is aggregated
    fn default() -> Self {
        Self {
            survey: Role::None,
            group: Role::None,
            cohort: Role::None,
            genotype: Role::None,
            file: Role::Plot,
        }
    }
}

impl Roles {
    pub fn get(&self, dim: Dimension) -> Role {
        match dim {
            Dimension::Survey => self.survey,
            Dimension::Group => self.group,
            Dimension::Cohort => self.cohort,
            Dimension::Genotype => self.genotype,
            Dimension::File => self.file,
            // measures are never aggregated away
            Dimension::Measure => Role::Plot,
        }
    }

    pub fn set(&mut self, dim: Dimension, role: Role) {
        match dim {
            Dimension::Survey => self.survey = role,
            Dimension::Group => self.group = role,
            Dimension::Cohort => self.cohort = role,
            Dimension::Genotype => self.genotype = role,
            Dimension::File => self.file = role,
            Dimension::Measure => {}
        }
    }

    /// Dimensions holding `role`, in precedence order
    pub fn with_role(&self, role: Role) -> Vec<Dimension> {
        Dimension::ROLES
            .into_iter()
            .filter(|&d| self.get(d) == role)
            .collect()
    }

    /// Dimensions drawn as separate lines within a subplot
    pub fn lines(&self) -> Vec<Dimension> {
        self.with_role(Role::Line)
    }

    /// The single x-axis dimension
    pub fn x_axis(&self) -> Result<Dimension> {
        match self.with_role(Role::XAxis).as_slice() {
            [dim] => Ok(*dim),
            [] => Err(PlotError::Configuration(
                "nothing assigned to x-axis".to_string(),
            )),
            many => Err(PlotError::Configuration(format!(
                "dual assignment to x-axis: {}",
                many.iter().map(|d| d.name()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }

    /// Validate, moving the first aggregated dimension to the x-axis if none is there
    pub fn resolve(mut self) -> Result<Self> {
        match self.with_role(Role::XAxis).len() {
            1 => Ok(self),
            0 => {
                let free = self.with_role(Role::None).first().copied().ok_or_else(|| {
                    PlotError::Configuration("nothing assigned to x-axis!".to_string())
                })?;
                tracing::debug!(dimension = %free, "No x-axis given, using first free dimension");
                self.set(free, Role::XAxis);
                Ok(self)
            }
            _ => self.x_axis().map(|_| self),
        }
    }

    /// Dimensions the value store must keep; others are summed away
    pub fn kept_dimensions(&self) -> BTreeSet<Dimension> {
        let mut kept: BTreeSet<Dimension> = Dimension::ROLES
            .into_iter()
            .filter(|&d| self.get(d) != Role::None)
            .collect();
        kept.insert(Dimension::Measure);
        kept
    }
}

/// Which of title, x label and y label are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelFlags {
    pub title: bool,
    pub x_label: bool,
    pub y_label: bool,
}

impl LabelFlags {
    /// Parse a subset of "txy" (empty string shows nothing)
    pub fn parse(s: &str) -> Result<Self> {
        if let Some(bad) = s.chars().find(|c| !matches!(c, 't' | 'x' | 'y')) {
            return Err(PlotError::Configuration(format!(
                "invalid label flag '{}' in '{}' (expected a subset of 'txy')",
                bad, s
            )));
        }
        Ok(Self {
            title: s.contains('t'),
            x_label: s.contains('x'),
            y_label: s.contains('y'),
        })
    }
}

impl Default for LabelFlags {
    fn default() -> Self {
        Self {
            title: true,
            x_label: true,
            y_label: true,
        }
    }
}

/// Y-axis scale handed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum YScale {
    /// Left to the renderer
    #[default]
    Auto,
    Linear,
    Log,
}

impl fmt::Display for YScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            YScale::Auto => "auto",
            YScale::Linear => "linear",
            YScale::Log => "log",
        })
    }
}

/// How subdivided bars are laid out within one x position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BarLayout {
    /// Narrow bars next to each other
    #[default]
    SideBySide,
    /// Blocks stacked vertically
    Stacked,
}

#[derive(Debug, Clone)]
pub struct PlotConfig {
    /// Put measures of one catalog group on the same subplot
    pub auto_measures: bool,

    /// Resolved roles; exactly one dimension is on the x-axis
    pub roles: Roles,

    /// Cached `roles.x_axis()`
    pub x_axis: Dimension,

    pub labels: LabelFlags,

    /// Show legends (single ungrouped series never get one)
    pub show_legends: bool,

    pub bar_layout: BarLayout,

    pub y_scale: YScale,

    /// Append " (id)" to measure labels; on when titles are hidden
    pub append_measure_number: bool,

    /// Show files as their 1-based index instead of their path
    pub short_file_names: bool,

    /// Predicate applied to every record read
    pub filter: Filter,

    /// Log every filter evaluation
    pub debug_filter: bool,
}

impl PlotConfig {
    /// Default options with the given role assignment
    pub fn with_roles(roles: Roles) -> Result<Self> {
        let roles = roles.resolve()?;
        let labels = LabelFlags::default();
        Ok(Self {
            auto_measures: true,
            x_axis: roles.x_axis()?,
            roles,
            labels,
            show_legends: true,
            bar_layout: BarLayout::SideBySide,
            y_scale: YScale::Auto,
            append_measure_number: !labels.title,
            short_file_names: true,
            filter: Filter::default(),
            debug_filter: false,
        })
    }

    /// Create config from parsed command-line options
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let roles = Roles {
            survey: cli.survey,
            group: cli.group,
            cohort: cli.cohort,
            genotype: cli.genotype,
            file: cli.file,
        };
        let mut config = Self::with_roles(roles)?;

        config.labels = LabelFlags::parse(&cli.labels)?;
        config.append_measure_number = !config.labels.title;
        config.auto_measures = !cli.no_auto_measures;
        config.show_legends = !cli.no_legends;
        config.bar_layout = if cli.vertical_stack {
            BarLayout::Stacked
        } else {
            BarLayout::SideBySide
        };
        config.y_scale = cli.scale;
        config.short_file_names = !cli.full_names;
        config.filter = Filter::parse(&cli.filter)?;
        config.debug_filter = cli.debug_filter;

        Ok(config)
    }
}
