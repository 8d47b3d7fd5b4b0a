use std::iter::Peekable;
use thiserror::Error;

use super::{Args, Limits, Redirection, Stage};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PipelineParsingError {
    // syntax
    #[error("unmatched quote")]
    UnmatchedQuote,
    #[error("expected infile")]
    NoRedirectionArg,
    #[error("expected outfile")]
    NoRedirection,
    #[error("expected command")]
    EmptyStage,

    // resources
    #[error("too many args (limit is {0})")]
    TooManyArgs(usize),
    #[error("too many stages (limit is {0})")]
    TooManyStages(usize),
}

impl PipelineParsingError {
    /// True when the line was well formed but exceeded one of the configured `Limits`.
    pub fn is_resource_exhausted(&self) -> bool {
        match self {
            PipelineParsingError::TooManyArgs(_) | PipelineParsingError::TooManyStages(_) => true,
            _ => false,
        }
    }
}

/// Tokenizes the text of a single stage into its arguments and redirections.
#[derive(Debug)]
pub struct Collector<'a> {
    data: &'a str,
}

impl<'a> Collector<'a> {
    pub fn new(data: &'a str) -> Self { Collector { data } }

    fn push_arg<I>(
        &self,
        args: &mut Args,
        bytes: &mut Peekable<I>,
        limits: &Limits,
    ) -> Result<(), PipelineParsingError>
    where
        I: Iterator<Item = (usize, u8)>,
    {
        if let Some(v) = self.arg(bytes)? {
            if args.len() == limits.max_args {
                return Err(PipelineParsingError::TooManyArgs(limits.max_args));
            }
            args.push(v.into());
        }
        Ok(())
    }

    fn push_redir_to_output<I>(
        &self,
        redirection: &mut Redirection,
        bytes: &mut Peekable<I>,
    ) -> Result<(), PipelineParsingError>
    where
        I: Iterator<Item = (usize, u8)>,
    {
        let append = if let Some(&(_, b'>')) = bytes.peek() {
            bytes.next();
            true
        } else {
            false
        };
        let file = self.arg(bytes)?.ok_or(PipelineParsingError::NoRedirection)?;
        redirection.outfile = Some(file.into());
        redirection.append = append;
        Ok(())
    }

    pub fn parse(&self, limits: &Limits) -> Result<Stage, PipelineParsingError> {
        let mut bytes = self.data.bytes().enumerate().peekable();
        let mut args = Args::new();
        let mut redirection = Redirection::default();

        while let Some(&(_, b)) = bytes.peek() {
            match b {
                b'&' => {
                    bytes.next();
                    redirection.background = true;
                }
                b'>' => {
                    bytes.next();
                    self.push_redir_to_output(&mut redirection, &mut bytes)?;
                }
                b'<' => {
                    bytes.next();
                    let file =
                        self.arg(&mut bytes)?.ok_or(PipelineParsingError::NoRedirectionArg)?;
                    redirection.infile = Some(file.into());
                }
                b' ' | b'\t' => {
                    bytes.next();
                }
                _ => self.push_arg(&mut args, &mut bytes, limits)?,
            }
        }

        if args.is_empty() {
            return Err(PipelineParsingError::EmptyStage);
        }
        Ok(Stage::new(args, redirection))
    }

    /// Reads the next word, skipping leading whitespace. A word opened by a quote runs to the
    /// matching quote, which is stripped. Any other word stops at whitespace or an operator.
    fn arg<I>(&self, bytes: &mut Peekable<I>) -> Result<Option<&'a str>, PipelineParsingError>
    where
        I: Iterator<Item = (usize, u8)>,
    {
        while let Some(&(_, b' ')) | Some(&(_, b'\t')) = bytes.peek() {
            bytes.next();
        }

        let (start, first) = match bytes.peek() {
            Some(&(i, b)) => (i, b),
            None => return Ok(None),
        };

        match first {
            b'"' | b'\'' => {
                bytes.next();
                for (i, b) in bytes {
                    if b == first {
                        return Ok(Some(&self.data[start + 1..i]));
                    }
                }
                Err(PipelineParsingError::UnmatchedQuote)
            }
            b'<' | b'>' | b'&' => Ok(None),
            _ => {
                let mut end = self.data.len();
                while let Some(&(i, b)) = bytes.peek() {
                    if let b' ' | b'\t' | b'<' | b'>' | b'&' = b {
                        end = i;
                        break;
                    }
                    bytes.next();
                }
                Ok(Some(&self.data[start..end]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(input: &str) -> Stage { Collector::new(input).parse(&Limits::default()).unwrap() }

    fn error(input: &str) -> PipelineParsingError {
        Collector::new(input).parse(&Limits::default()).unwrap_err()
    }

    #[test]
    fn whitespace_separates_words() {
        let stage = stage("ls  -l\t-a");
        assert_eq!(&["ls", "-l", "-a"], &stage.args[..]);
        assert_eq!(Redirection::default(), stage.redirection);
    }

    #[test]
    fn quotes_are_stripped() {
        let stage = stage("echo \"hello world\" 'single | quoted' \"\" ''");
        assert_eq!(&["echo", "hello world", "single | quoted", "", ""], &stage.args[..]);
    }

    #[test]
    fn quotes_mid_word_are_literal() {
        assert_eq!(&["echo", "it's"], &stage("echo it's").args[..]);
    }

    #[test]
    fn unmatched_quotes() {
        assert_eq!(PipelineParsingError::UnmatchedQuote, error("echo \"hello"));
        assert_eq!(PipelineParsingError::UnmatchedQuote, error("echo 'hello"));
        assert_eq!(PipelineParsingError::UnmatchedQuote, error("cat < 'file"));
    }

    #[test]
    fn input_redirection() {
        let stage = stage("sort <input.txt -r");
        assert_eq!(&["sort", "-r"], &stage.args[..]);
        assert_eq!(Some("input.txt".to_string()), stage.redirection.infile);
        assert_eq!(None, stage.redirection.outfile);
    }

    #[test]
    fn output_redirection() {
        let truncate = stage("echo hi > out");
        assert_eq!(&["echo", "hi"], &truncate.args[..]);
        assert_eq!(Some("out".to_string()), truncate.redirection.outfile);
        assert!(!truncate.redirection.append);

        let append = stage("echo hi>>out");
        assert_eq!(&["echo", "hi"], &append.args[..]);
        assert_eq!(Some("out".to_string()), append.redirection.outfile);
        assert!(append.redirection.append);
    }

    #[test]
    fn quoted_redirection_target() {
        let stage = stage("cat > \"my file\"");
        assert_eq!(Some("my file".to_string()), stage.redirection.outfile);
    }

    #[test]
    fn both_redirections() {
        let stage = stage("tr a b < in > out");
        assert_eq!(&["tr", "a", "b"], &stage.args[..]);
        assert_eq!(Some("in".to_string()), stage.redirection.infile);
        assert_eq!(Some("out".to_string()), stage.redirection.outfile);
    }

    #[test]
    fn last_redirection_wins() {
        let stage = stage("echo a > first >> second < one < two");
        assert_eq!(Some("second".to_string()), stage.redirection.outfile);
        assert!(stage.redirection.append);
        assert_eq!(Some("two".to_string()), stage.redirection.infile);
    }

    #[test]
    fn missing_redirection_targets() {
        assert_eq!(PipelineParsingError::NoRedirectionArg, error("cat <"));
        assert_eq!(PipelineParsingError::NoRedirectionArg, error("cat < > out"));
        assert_eq!(PipelineParsingError::NoRedirection, error("echo >"));
        assert_eq!(PipelineParsingError::NoRedirection, error("echo >> &"));
    }

    #[test]
    fn background_marker() {
        let trailing = stage("sleep 10&");
        assert_eq!(&["sleep", "10"], &trailing.args[..]);
        assert!(trailing.redirection.background);

        let inner = stage("sleep & 10");
        assert_eq!(&["sleep", "10"], &inner.args[..]);
        assert!(inner.redirection.background);
    }

    #[test]
    fn empty_argv() {
        assert_eq!(PipelineParsingError::EmptyStage, error(""));
        assert_eq!(PipelineParsingError::EmptyStage, error("> out"));
        assert_eq!(PipelineParsingError::EmptyStage, error("&"));
    }

    #[test]
    fn argument_limit() {
        let limits = Limits { max_args: 3, ..Limits::default() };
        assert!(Collector::new("a b c").parse(&limits).is_ok());
        let err = Collector::new("a b c d").parse(&limits).unwrap_err();
        assert_eq!(PipelineParsingError::TooManyArgs(3), err);
        assert!(err.is_resource_exhausted());
        assert!(!PipelineParsingError::EmptyStage.is_resource_exhausted());
    }
}
