use super::{ChartRenderer, Figure};
use crate::survey::Result;

/// Keeps every rendered figure in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    pub figures: Vec<Figure>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently rendered figure
    pub fn last(&self) -> Option<&Figure> {
        self.figures.last()
    }
}

impl ChartRenderer for RecordingRenderer {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        self.figures.push(figure.clone());
        Ok(())
    }
}
