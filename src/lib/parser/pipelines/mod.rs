//! Pipelines are the only statement this shell understands: a chain of simple commands
//! joined by `|`, each of which may carry its own input and output redirection, and a
//! trailing `&` on the final command that sends the whole chain to the background.

mod collector;

pub use self::collector::{Collector, PipelineParsingError};
use itertools::Itertools;
use smallvec::SmallVec;
use std::{borrow::Cow, fmt};

/// The argument vector of a single stage. The first element names the program or builtin.
pub type Args = SmallVec<[String; 4]>;

/// Caller-visible capacity limits that are checked while a line is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Limits {
    /// The most arguments, command name included, that a single stage may carry.
    pub max_args: usize,
    /// The most stages that a single pipeline may carry.
    pub max_stages: usize,
}

impl Limits {
    pub const DEFAULT_MAX_ARGS: usize = 255;
    pub const DEFAULT_MAX_STAGES: usize = 64;
}

impl Default for Limits {
    fn default() -> Self {
        Limits { max_args: Self::DEFAULT_MAX_ARGS, max_stages: Self::DEFAULT_MAX_STAGES }
    }
}

/// Where a stage reads from and writes to, when that is not its pipeline neighbor or the
/// terminal.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Redirection {
    pub infile:     Option<String>,
    pub outfile:    Option<String>,
    pub append:     bool,
    pub background: bool,
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Stage {
    pub args:        Args,
    pub redirection: Redirection,
}

impl Stage {
    pub fn new(args: Args, redirection: Redirection) -> Self { Stage { args, redirection } }

    /// The program or builtin this stage invokes, if it has any arguments at all.
    pub fn command(&self) -> Option<&str> { self.args.first().map(String::as_str) }
}

fn needs_quotes(arg: &str) -> bool {
    arg.is_empty()
        || arg.bytes().any(|b| matches!(b, b' ' | b'\t' | b'|' | b'<' | b'>' | b'&' | b'\'' | b'"'))
}

fn quoted(word: &str) -> Cow<'_, str> {
    if !needs_quotes(word) {
        Cow::Borrowed(word)
    } else if word.contains('\'') {
        Cow::Owned(format!("\"{}\"", word))
    } else {
        Cow::Owned(format!("'{}'", word))
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args.iter().map(|arg| quoted(arg)).format(" "))?;

        let Redirection { ref infile, ref outfile, append, background } = self.redirection;
        if let Some(ref infile) = infile {
            write!(f, " < {}", quoted(infile))?;
        }
        if let Some(ref outfile) = outfile {
            write!(f, " {} {}", if append { ">>" } else { ">" }, quoted(outfile))?;
        }
        if background {
            f.write_str(" &")?;
        }
        Ok(())
    }
}

/// An ordered, non-empty chain of stages parsed from a single line of input.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline {
    pub stages: SmallVec<[Stage; 16]>,
}

impl Pipeline {
    /// Only the background marker of the final stage decides for the whole pipeline.
    pub fn is_background(&self) -> bool {
        self.stages.last().map_or(false, |stage| stage.redirection.background)
    }

    pub fn len(&self) -> usize { self.stages.len() }

    pub fn is_empty(&self) -> bool { self.stages.is_empty() }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stages.iter().format(" | "))
    }
}

/// Splits a line on `|` into the text of each stage. A `|` inside a quoted word does not
/// split; an unterminated quote simply extends its segment to the end of the line and is
/// reported when that segment is tokenized.
#[derive(Debug, Clone)]
pub struct StageSplitter<'a> {
    data:  &'a str,
    start: usize,
    done:  bool,
}

impl<'a> StageSplitter<'a> {
    pub fn new(data: &'a str) -> Self { StageSplitter { data, start: 0, done: false } }
}

impl<'a> Iterator for StageSplitter<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.done {
            return None;
        }

        let bytes = self.data.as_bytes();
        let mut quote = None;
        // Quotes only open a word at its start, matching the tokenizer.
        let mut word_start = true;
        for i in self.start..bytes.len() {
            match (quote, bytes[i]) {
                (None, b'|') => {
                    let segment = &self.data[self.start..i];
                    self.start = i + 1;
                    return Some(segment);
                }
                (None, q @ b'"') | (None, q @ b'\'') if word_start => quote = Some(q),
                (None, b' ') | (None, b'\t') | (None, b'<') | (None, b'>') | (None, b'&') => {
                    word_start = true;
                    continue;
                }
                (Some(q), b) if q == b => {
                    quote = None;
                    word_start = true;
                    continue;
                }
                _ => (),
            }
            word_start = false;
        }

        self.done = true;
        Some(&self.data[self.start..])
    }
}

fn trim_stage(segment: &str) -> &str { segment.trim_matches(&[' ', '\t', '\n'][..]) }

/// Parses one line of input into a pipeline.
///
/// Returns `Ok(None)` when the line holds nothing but whitespace. Every stage is tokenized
/// before this returns, so a syntax error anywhere in the line is reported before any
/// process could be spawned for it.
pub fn parse(line: &str, limits: &Limits) -> Result<Option<Pipeline>, PipelineParsingError> {
    if trim_stage(line).is_empty() {
        return Ok(None);
    }

    let mut stages = SmallVec::new();
    for segment in StageSplitter::new(line) {
        if stages.len() == limits.max_stages {
            return Err(PipelineParsingError::TooManyStages(limits.max_stages));
        }
        stages.push(Collector::new(trim_stage(segment)).parse(limits)?);
    }

    Ok(Some(Pipeline { stages }))
}
