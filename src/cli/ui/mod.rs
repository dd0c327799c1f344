pub mod output;
pub mod report;

pub use output::Output;
pub use report::{OutputFormat, render_json, render_text};
