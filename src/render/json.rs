//! JSON figure output

use super::{ChartRenderer, Figure};
use crate::survey::Result;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// Writes each figure as pretty-printed JSON to a file or stdout
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    output: Option<PathBuf>,
}

impl JsonRenderer {
    /// Renderer writing to `output`, or stdout when `None`
    pub fn new(output: Option<PathBuf>) -> Self {
        Self { output }
    }

    fn write_to<W: Write>(mut writer: W, figure: &Figure) -> Result<()> {
        serde_json::to_writer_pretty(&mut writer, figure)?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }
}

impl ChartRenderer for JsonRenderer {
    fn render(&mut self, figure: &Figure) -> Result<()> {
        match &self.output {
            Some(path) => {
                Self::write_to(BufWriter::new(File::create(path)?), figure)?;
                tracing::info!(
                    path = %path.display(),
                    subplots = figure.subplots.len(),
                    "Figure written"
                );
                Ok(())
            }
            None => Self::write_to(io::stdout().lock(), figure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::YScale;
    use crate::render::{DrawCall, Subplot};

    #[test]
    fn test_render_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure.json");

        let mut subplot = Subplot::new(0, 1, YScale::Log);
        subplot.title = Some("Measure 3".into());
        subplot.draws.push(DrawCall::Line {
            x: vec![1.0, 2.0],
            y: vec![5.0, 6.0],
            color: "blue".into(),
        });
        let figure = Figure::new(vec![subplot]);

        JsonRenderer::new(Some(path.clone())).render(&figure).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["rows"], 1);
        assert_eq!(written["subplots"][0]["title"], "Measure 3");
        assert_eq!(written["subplots"][0]["y_scale"], "log");
        assert_eq!(written["subplots"][0]["draws"][0]["y"][1], 6.0);
        assert!(written["subplots"][0].get("legend").is_none());
    }
}
