pub mod pipelines;

pub use self::pipelines::{parse, Limits, Pipeline, PipelineParsingError, Stage};
