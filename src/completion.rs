//! Tab completion of command names.
//!
//! [`CompletionSession`] holds the press-counting rules, [`CompletionEngine`] adds
//! candidate discovery (builtins and `PATH` executables) and [`ShellHelper`] plugs
//! the engine into the line editor.

use crate::external::executables_in_path;
use crate::trie::Trie;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{Context, Helper};
use std::cell::RefCell;
use std::ffi::OsString;
use std::io::{self, Write};

/// Terminal bell.
pub const BELL: &str = "\x07";

/// What a single completion request results in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Suggestion {
    /// Ring the bell and leave the input alone.
    Bell,
    /// Replace the whole input with this text.
    Replace(String),
    /// Print these candidates under the prompt and leave the input alone.
    List(Vec<String>),
}

/// Press-counting state shared by successive requests on one line.
#[derive(Debug, Default)]
pub struct CompletionSession {
    last_prefix: String,
    tab_presses: u32,
}

impl CompletionSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times in a row the current prefix has been completed.
    pub fn tab_presses(&self) -> u32 {
        self.tab_presses
    }

    /// Decide what to do with `input` given every name that starts with it.
    ///
    /// A unique match is completed with a trailing space. Several matches sharing
    /// a longer prefix complete to that prefix. Otherwise the first press rings the
    /// bell and the second lists all matches, after which counting starts over.
    pub fn suggest(&mut self, input: &str, mut candidates: Vec<String>) -> Suggestion {
        if candidates.is_empty() {
            return Suggestion::Bell;
        }

        if input == self.last_prefix {
            self.tab_presses += 1;
        } else {
            self.last_prefix = input.to_string();
            self.tab_presses = 1;
        }

        candidates.sort();
        candidates.dedup();

        if let [only] = candidates.as_slice() {
            return Suggestion::Replace(format!("{only} "));
        }

        let common = longest_common_prefix(&candidates);
        if common != input {
            return Suggestion::Replace(common.to_string());
        }

        if self.tab_presses == 1 {
            return Suggestion::Bell;
        }

        self.tab_presses = 0;
        Suggestion::List(candidates)
    }
}

/// Longest prefix shared by all `words`; empty when `words` is empty.
pub fn longest_common_prefix(words: &[String]) -> &str {
    let Some((first, rest)) = words.split_first() else {
        return "";
    };
    let mut len = first.len();
    for word in rest {
        len = len.min(common_len(first, word));
    }
    &first[..len]
}

/// Byte length of the common prefix of `a` and `b`, on a char boundary of both.
fn common_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, x), y)| x != y)
        .map_or_else(|| a.len().min(b.len()), |((i, _), _)| i)
}

/// Completion over builtin names and the executables found on `PATH`.
///
/// The `PATH` directories are rescanned on every request, so programs installed
/// while the shell runs show up immediately.
pub struct CompletionEngine {
    builtins: Vec<String>,
    search_paths: Option<OsString>,
    session: CompletionSession,
}

impl CompletionEngine {
    pub fn new<I, S>(builtins: I, search_paths: Option<OsString>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            builtins: builtins.into_iter().map(Into::into).collect(),
            search_paths,
            session: CompletionSession::new(),
        }
    }

    /// Every known command name starting with `prefix`, sorted.
    pub fn candidates(&self, prefix: &str) -> Vec<String> {
        let mut trie: Trie = self.builtins.iter().collect();
        if let Some(paths) = &self.search_paths {
            for name in executables_in_path(paths) {
                trie.insert(&name);
            }
        }
        trie.words_with_prefix(prefix)
    }

    pub fn complete(&mut self, input: &str) -> Suggestion {
        let candidates = self.candidates(input);
        let suggestion = self.session.suggest(input, candidates);
        log::debug!(
            "completion for {input:?} (press {}): {suggestion:?}",
            self.session.tab_presses()
        );
        suggestion
    }
}

/// Print a candidate listing below the current line and redraw the prompt.
pub fn render_listing(
    out: &mut dyn Write,
    candidates: &[String],
    prompt: &str,
    input: &str,
) -> io::Result<()> {
    write!(out, "\n{}\n{prompt}{input}", candidates.join("  "))?;
    out.flush()
}

/// Line-editor hook driving a [`CompletionEngine`].
///
/// The editor's own bell should be disabled: this helper rings it itself, on the
/// terminal by default or on the writer given to [`ShellHelper::with_output`].
pub struct ShellHelper {
    engine: RefCell<CompletionEngine>,
    prompt: String,
    out: RefCell<Box<dyn Write>>,
}

impl ShellHelper {
    pub fn new(engine: CompletionEngine, prompt: impl Into<String>) -> Self {
        Self::with_output(engine, prompt, Box::new(io::stdout()))
    }

    pub fn with_output(
        engine: CompletionEngine,
        prompt: impl Into<String>,
        out: Box<dyn Write>,
    ) -> Self {
        Self {
            engine: RefCell::new(engine),
            prompt: prompt.into(),
            out: RefCell::new(out),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let input = &line[..pos];
        let suggestion = self.engine.borrow_mut().complete(input);

        let mut out = self.out.borrow_mut();
        match suggestion {
            Suggestion::Bell => {
                write!(out, "{BELL}")?;
                out.flush()?;
                Ok((0, Vec::new()))
            }
            Suggestion::Replace(text) => Ok((
                0,
                vec![Pair {
                    display: text.clone(),
                    replacement: text,
                }],
            )),
            Suggestion::List(candidates) => {
                render_listing(&mut **out, &candidates, &self.prompt, input)?;
                Ok((0, Vec::new()))
            }
        }
    }
}

impl Hinter for ShellHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {
    fn validate(&self, _ctx: &mut ValidationContext) -> rustyline::Result<ValidationResult> {
        Ok(ValidationResult::Valid(None))
    }
}

impl Helper for ShellHelper {}
