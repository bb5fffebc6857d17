//! Output and error redirection.
//!
//! Redirection operators are ordinary words produced by the lexer; they are only
//! recognised when they stand alone (`> out.txt`, not `>out.txt`).

use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// How a redirect target is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `>`: create or truncate.
    Truncate,
    /// `>>`: create or append.
    Append,
}

/// A file that one standard stream is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: PathBuf,
    pub mode: RedirectMode,
}

impl RedirectTarget {
    pub fn new(path: impl Into<PathBuf>, mode: RedirectMode) -> Self {
        Self {
            path: path.into(),
            mode,
        }
    }

    /// Open the target for writing, creating it when missing.
    ///
    /// Relative paths are resolved against `current_dir`. New files get mode `0644`.
    pub fn open(&self, current_dir: &Path) -> std::io::Result<File> {
        let mut options = OpenOptions::new();
        options.write(true).create(true);
        match self.mode {
            RedirectMode::Truncate => options.truncate(true),
            RedirectMode::Append => options.append(true),
        };
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        options.open(current_dir.join(&self.path))
    }
}

/// Where standard output and standard error of one command invocation go.
///
/// An empty spec leaves both streams attached to the shell's own.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedirectionSpec {
    pub stdout: Option<RedirectTarget>,
    pub stderr: Option<RedirectTarget>,
}

impl RedirectionSpec {
    pub fn is_empty(&self) -> bool {
        self.stdout.is_none() && self.stderr.is_none()
    }
}

/// Failure to split redirections out of an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectError {
    /// `operator` was the last word, so it has no file name.
    ///
    /// `args` is the untouched argument list the extraction started from.
    MissingOperand { operator: String, args: Vec<String> },
}

impl RedirectError {
    /// Give back the original arguments so the command can still run unredirected.
    pub fn into_args(self) -> Vec<String> {
        match self {
            RedirectError::MissingOperand { args, .. } => args,
        }
    }
}

impl fmt::Display for RedirectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RedirectError::MissingOperand { operator, .. } => {
                write!(f, "redirect: no file specified after '{operator}'")
            }
        }
    }
}

impl std::error::Error for RedirectError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

fn parse_operator(word: &str) -> Option<(Stream, RedirectMode)> {
    match word {
        ">" | "1>" => Some((Stream::Stdout, RedirectMode::Truncate)),
        ">>" | "1>>" => Some((Stream::Stdout, RedirectMode::Append)),
        "2>" => Some((Stream::Stderr, RedirectMode::Truncate)),
        "2>>" => Some((Stream::Stderr, RedirectMode::Append)),
        _ => None,
    }
}

/// Remove redirection operators and their file names from `args`.
///
/// Every operator consumes exactly the next word. When the same stream is
/// redirected more than once the last operator wins.
///
/// Returns the remaining arguments together with the collected spec, or
/// [`RedirectError::MissingOperand`] holding the unmodified `args` when an
/// operator is the last word.
pub fn extract_redirection(
    args: Vec<String>,
) -> Result<(Vec<String>, RedirectionSpec), RedirectError> {
    let mut clean = Vec::with_capacity(args.len());
    let mut spec = RedirectionSpec::default();

    let mut i = 0;
    while i < args.len() {
        let word = &args[i];
        let Some((stream, mode)) = parse_operator(word) else {
            clean.push(word.clone());
            i += 1;
            continue;
        };

        let Some(operand) = args.get(i + 1) else {
            return Err(RedirectError::MissingOperand {
                operator: word.clone(),
                args,
            });
        };

        let target = Some(RedirectTarget::new(operand, mode));
        match stream {
            Stream::Stdout => spec.stdout = target,
            Stream::Stderr => spec.stderr = target,
        }
        i += 2;
    }

    Ok((clean, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_no_operators_leaves_args_untouched() {
        let (clean, spec) = extract_redirection(strings(&["a", "b"])).unwrap();
        assert_eq!(clean, vec!["a", "b"]);
        assert!(spec.is_empty());
    }

    #[test]
    fn test_all_operator_spellings() {
        let cases = [
            (">", Stream::Stdout, RedirectMode::Truncate),
            ("1>", Stream::Stdout, RedirectMode::Truncate),
            (">>", Stream::Stdout, RedirectMode::Append),
            ("1>>", Stream::Stdout, RedirectMode::Append),
            ("2>", Stream::Stderr, RedirectMode::Truncate),
            ("2>>", Stream::Stderr, RedirectMode::Append),
        ];
        for (op, stream, mode) in cases {
            let (clean, spec) = extract_redirection(strings(&["x", op, "f.txt", "y"])).unwrap();
            assert_eq!(clean, vec!["x", "y"], "operator {op}");
            let expected = Some(RedirectTarget::new("f.txt", mode));
            match stream {
                Stream::Stdout => {
                    assert_eq!(spec.stdout, expected, "operator {op}");
                    assert_eq!(spec.stderr, None);
                }
                Stream::Stderr => {
                    assert_eq!(spec.stderr, expected, "operator {op}");
                    assert_eq!(spec.stdout, None);
                }
            }
        }
    }

    #[test]
    fn test_both_streams_at_once() {
        let (clean, spec) =
            extract_redirection(strings(&["hello", "2>>", "err.log", ">", "out.log"])).unwrap();
        assert_eq!(clean, vec!["hello"]);
        assert_eq!(
            spec.stdout,
            Some(RedirectTarget::new("out.log", RedirectMode::Truncate))
        );
        assert_eq!(
            spec.stderr,
            Some(RedirectTarget::new("err.log", RedirectMode::Append))
        );
    }

    #[test]
    fn test_last_operator_for_a_stream_wins() {
        let (clean, spec) =
            extract_redirection(strings(&[">", "first", "a", "1>>", "second"])).unwrap();
        assert_eq!(clean, vec!["a"]);
        assert_eq!(
            spec.stdout,
            Some(RedirectTarget::new("second", RedirectMode::Append))
        );
    }

    #[test]
    fn test_trailing_operator_returns_original_args() {
        let err = extract_redirection(strings(&["a", ">"])).unwrap_err();
        assert_eq!(
            err,
            RedirectError::MissingOperand {
                operator: ">".to_string(),
                args: strings(&["a", ">"]),
            }
        );
        assert_eq!(err.into_args(), vec!["a", ">"]);
    }

    #[test]
    fn test_trailing_operator_after_valid_redirect_still_fails() {
        let err = extract_redirection(strings(&["2>", "e.txt", "b", "2>>"])).unwrap_err();
        assert_eq!(err.into_args(), vec!["2>", "e.txt", "b", "2>>"]);
    }

    #[test]
    fn test_operators_glued_to_words_are_not_recognised() {
        let (clean, spec) = extract_redirection(strings(&[">out", "2>&1"])).unwrap();
        assert_eq!(clean, vec![">out", "2>&1"]);
        assert!(spec.is_empty());
    }

    #[test]
    fn test_open_truncates_and_appends() {
        let dir = std::env::temp_dir().join(format!("redirect_open_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let truncate = RedirectTarget::new("out.txt", RedirectMode::Truncate);
        let append = RedirectTarget::new("out.txt", RedirectMode::Append);

        use std::io::Write;
        writeln!(truncate.open(&dir).unwrap(), "one").unwrap();
        writeln!(append.open(&dir).unwrap(), "two").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("out.txt")).unwrap(),
            "one\ntwo\n"
        );

        writeln!(truncate.open(&dir).unwrap(), "three").unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("out.txt")).unwrap(),
            "three\n"
        );

        let _ = std::fs::remove_dir_all(dir);
    }
}
