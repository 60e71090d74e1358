use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::AppResult;
use crate::figsize::FigureSize;

/// A caller-supplied option forwarded to the plotting backend untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Numbers(Vec<f64>),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<f64>> for OptionValue {
    fn from(value: Vec<f64>) -> Self {
        Self::Numbers(value)
    }
}

pub type Options = BTreeMap<String, OptionValue>;

/// Fully resolved "create a figure with an `nrows x ncols` grid" call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubplotsRequest {
    pub nrows: usize,
    pub ncols: usize,
    pub width_ratios: Vec<f64>,
    pub height_ratios: Vec<f64>,
    pub figsize: FigureSize,
    /// Grid-spec options other than the ratios.
    pub grid_spec: Options,
    pub options: Options,
}

pub trait PlotBackend {
    type Figure;

    fn subplots(&mut self, request: SubplotsRequest) -> AppResult<Self::Figure>;
}
