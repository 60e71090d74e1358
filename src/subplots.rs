use std::fmt;

use crate::backend::{OptionValue, Options, PlotBackend, SubplotsRequest};
use crate::error::{AppError, AppResult};
use crate::figsize::{Aspect, FigsizeParams, FigureSize, figsize};
use crate::page::PageBoxConfig;

/// Options that would normally go to the plotting library's grid spec.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridSpecOptions {
    pub width_ratios: Option<Vec<f64>>,
    pub height_ratios: Option<Vec<f64>>,
    pub extra: Options,
}

/// Non-fatal problems found while resolving a [`SubplotsArgs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsageWarning {
    DeprecatedKeyword {
        old: &'static str,
        new: &'static str,
    },
    IgnoredFigsize,
}

impl fmt::Display for UsageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeprecatedKeyword { old, new } => {
                write!(f, "keyword '{old}' is deprecated; use '{new}' instead")
            }
            Self::IgnoredFigsize => {
                f.write_str("keyword 'figsize' is ignored and its value discarded")
            }
        }
    }
}

/// Arguments for [`subplots`], accepted in the same loose forms the
/// plotting library's own call takes: the grid shape positionally or by
/// name, ratios directly or inside a grid spec.
#[derive(Debug, Clone, Default)]
pub struct SubplotsArgs {
    positional: Vec<usize>,
    nrows: Option<usize>,
    ncols: Option<usize>,
    scale: Option<f64>,
    aspect: Option<Aspect>,
    fraction: Option<f64>,
    ratio: Option<Aspect>,
    width_ratios: Option<Vec<f64>>,
    height_ratios: Option<Vec<f64>>,
    grid_spec: Option<GridSpecOptions>,
    figsize: Option<(f64, f64)>,
    options: Options,
}

impl SubplotsArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(nrows: usize, ncols: usize) -> Self {
        Self::positional(&[nrows, ncols])
    }

    pub fn positional(shape: &[usize]) -> Self {
        Self {
            positional: shape.to_vec(),
            ..Self::default()
        }
    }

    pub fn nrows(mut self, nrows: usize) -> Self {
        self.nrows = Some(nrows);
        self
    }

    pub fn ncols(mut self, ncols: usize) -> Self {
        self.ncols = Some(ncols);
        self
    }

    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn aspect(mut self, aspect: impl Into<Aspect>) -> Self {
        self.aspect = Some(aspect.into());
        self
    }

    #[deprecated(note = "use `scale` instead")]
    pub fn fraction(mut self, fraction: f64) -> Self {
        self.fraction = Some(fraction);
        self
    }

    #[deprecated(note = "use `aspect` instead")]
    pub fn ratio(mut self, ratio: impl Into<Aspect>) -> Self {
        self.ratio = Some(ratio.into());
        self
    }

    pub fn width_ratios(mut self, ratios: impl Into<Vec<f64>>) -> Self {
        self.width_ratios = Some(ratios.into());
        self
    }

    pub fn height_ratios(mut self, ratios: impl Into<Vec<f64>>) -> Self {
        self.height_ratios = Some(ratios.into());
        self
    }

    pub fn grid_spec(mut self, grid_spec: GridSpecOptions) -> Self {
        self.grid_spec = Some(grid_spec);
        self
    }

    /// Accepted for call-site compatibility; the computed size always wins.
    pub fn figsize(mut self, width_in: f64, height_in: f64) -> Self {
        self.figsize = Some((width_in, height_in));
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Normalizes the arguments without computing anything.
    pub fn resolve(self) -> AppResult<ResolvedSubplots> {
        let mut warnings = Vec::new();

        if self.positional.len() > 2 {
            return Err(AppError::invalid_argument(format!(
                "expected at most 2 positional grid dimensions, got {}",
                self.positional.len()
            )));
        }
        let nrows = pick_dimension("nrows", self.positional.first().copied(), self.nrows)?;
        let ncols = pick_dimension("ncols", self.positional.get(1).copied(), self.ncols)?;

        let scale = pick_alias("scale", self.scale, "fraction", self.fraction, &mut warnings)?;
        let aspect = pick_alias("aspect", self.aspect, "ratio", self.ratio, &mut warnings)?;

        let GridSpecOptions {
            width_ratios: nested_width,
            height_ratios: nested_height,
            extra: grid_spec,
        } = self.grid_spec.unwrap_or_default();
        let width_ratios = pick_ratios("width_ratios", self.width_ratios, nested_width)?;
        let height_ratios = pick_ratios("height_ratios", self.height_ratios, nested_height)?;

        if self.figsize.is_some() {
            warnings.push(UsageWarning::IgnoredFigsize);
        }

        Ok(ResolvedSubplots {
            params: FigsizeParams {
                nrows,
                ncols,
                scale: scale.unwrap_or(1.0),
                aspect: aspect.unwrap_or_default(),
                height_ratios,
                width_ratios,
            },
            grid_spec,
            options: self.options,
            warnings,
        })
    }
}

fn pick_dimension(
    name: &str,
    positional: Option<usize>,
    keyword: Option<usize>,
) -> AppResult<usize> {
    match (positional, keyword) {
        (Some(_), Some(_)) => Err(AppError::invalid_argument(format!(
            "got multiple values for '{name}'"
        ))),
        (Some(value), None) | (None, Some(value)) => Ok(value),
        (None, None) => Ok(1),
    }
}

fn pick_alias<T>(
    name: &'static str,
    current: Option<T>,
    legacy_name: &'static str,
    legacy: Option<T>,
    warnings: &mut Vec<UsageWarning>,
) -> AppResult<Option<T>> {
    match (current, legacy) {
        (Some(_), Some(_)) => Err(AppError::invalid_argument(format!(
            "'{legacy_name}' and '{name}' must not both be given"
        ))),
        (None, Some(value)) => {
            warnings.push(UsageWarning::DeprecatedKeyword {
                old: legacy_name,
                new: name,
            });
            Ok(Some(value))
        }
        (current, None) => Ok(current),
    }
}

fn pick_ratios(
    name: &str,
    direct: Option<Vec<f64>>,
    nested: Option<Vec<f64>>,
) -> AppResult<Option<Vec<f64>>> {
    match (direct, nested) {
        (Some(_), Some(_)) => Err(AppError::invalid_argument(format!(
            "'{name}' must not be defined both as a direct parameter and inside the grid spec"
        ))),
        (direct, nested) => Ok(direct.or(nested)),
    }
}

/// The normalized form of a [`SubplotsArgs`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSubplots {
    pub params: FigsizeParams,
    pub grid_spec: Options,
    pub options: Options,
    pub warnings: Vec<UsageWarning>,
}

impl ResolvedSubplots {
    pub fn into_request(self, figsize: FigureSize) -> SubplotsRequest {
        let (width_ratios, height_ratios) = self.params.resolved_ratios();
        SubplotsRequest {
            nrows: self.params.nrows,
            ncols: self.params.ncols,
            width_ratios,
            height_ratios,
            figsize,
            grid_spec: self.grid_spec,
            options: self.options,
        }
    }
}

/// Sizes a figure for the current page box and asks `backend` to create it.
/// Whatever the backend returns is handed back unchanged.
pub fn subplots<B: PlotBackend>(
    page: &PageBoxConfig,
    backend: &mut B,
    args: SubplotsArgs,
) -> AppResult<B::Figure> {
    let resolved = args.resolve()?;
    for warning in &resolved.warnings {
        tracing::warn!("{warning}");
    }

    let size = figsize(page.get(), &resolved.params)?;
    tracing::debug!(
        nrows = resolved.params.nrows,
        ncols = resolved.params.ncols,
        width_in = size.width_in,
        height_in = size.height_in,
        "creating subplots"
    );
    backend.subplots(resolved.into_request(size))
}
