#![allow(unknown_lints)]

pub mod builtins;
pub mod parser;
pub mod shell;
mod sys;

pub use crate::{
    builtins::{BuiltinFunction, BuiltinMap, Status, BUILTINS},
    parser::{Limits, Pipeline, PipelineParsingError},
    shell::{History, Options, PipelineError, Shell, ShellError},
};

pub fn version() -> &'static str { include!(concat!(env!("OUT_DIR"), "/version_string")) }
