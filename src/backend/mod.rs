mod json;
mod traits;

pub use json::JsonBackend;
pub use traits::{OptionValue, Options, PlotBackend, SubplotsRequest};
