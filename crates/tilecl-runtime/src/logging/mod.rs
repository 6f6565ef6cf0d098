mod pipeline;
mod profiled;

pub use pipeline::*;
pub use profiled::*;
