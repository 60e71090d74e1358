use std::io::Write;

use crate::error::{AppError, AppResult};

use super::traits::{PlotBackend, SubplotsRequest};

/// Writes each request as a JSON document for an external plotting tool.
#[derive(Debug)]
pub struct JsonBackend<W> {
    writer: W,
}

impl<W: Write> JsonBackend<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PlotBackend for JsonBackend<W> {
    type Figure = ();

    fn subplots(&mut self, request: SubplotsRequest) -> AppResult<()> {
        serde_json::to_writer_pretty(&mut self.writer, &request).map_err(|source| {
            AppError::io_with_context(source.into(), "failed to write subplots request")
        })?;
        writeln!(self.writer).map_err(|source| {
            AppError::io_with_context(source, "failed to write subplots request")
        })
    }
}
