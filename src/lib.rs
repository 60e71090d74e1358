//! Figure sizes for plots embedded in a typeset page.
//!
//! The page box (usable width and height in TeX points) comes from a
//! [`PageBoxConfig`]; [`figsize()`] turns it into a figure size in inches for a
//! grid of axes, and [`subplots()`] hands that size to a [`PlotBackend`].

pub mod backend;
pub mod config;
pub mod error;
pub mod figsize;
pub mod page;
pub mod subplots;

pub use backend::{JsonBackend, OptionValue, PlotBackend, SubplotsRequest};
pub use figsize::{
    Aspect, FigsizeParams, FigureSize, GOLDEN_RATIO, convert_inches_to_pt, convert_pt_to_inches,
    figsize,
};
pub use page::{PageBox, PageBoxConfig, PageBoxOverride};
pub use subplots::{GridSpecOptions, SubplotsArgs, UsageWarning, subplots};
