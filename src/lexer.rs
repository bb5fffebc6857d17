//! Lexical analysis of a single input line.
//!
//! The lexer turns a raw line into the command name and its positional arguments,
//! resolving single quotes, double quotes and backslash escapes along the way.
//! It never fails: an unclosed quote is reported as a [`LexingWarning`] next to the
//! words collected so far.

use std::fmt;

/// Non-fatal conditions detected while splitting a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexingWarning {
    /// The line ended while a single or double quote was still open.
    UnclosedQuote,
}

impl fmt::Display for LexingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexingWarning::UnclosedQuote => write!(f, "Unclosed quotes in command"),
        }
    }
}

impl std::error::Error for LexingWarning {}

/// Result of splitting a line: the first word and the remaining words.
///
/// `command` is empty exactly when the line contained nothing but spaces and
/// quote delimiters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokenized {
    pub command: String,
    pub args: Vec<String>,
    pub warning: Option<LexingWarning>,
}

impl Tokenized {
    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Unquoted,
    SingleQuote,
    DoubleQuote,
}

/// Characters a backslash may escape inside double quotes.
const DOUBLE_QUOTE_ESCAPABLE: [char; 5] = ['"', '\\', '$', '`', '\n'];

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    /// The previous character was an escaping backslash.
    escaped: bool,
    buffer: String,
    words: Vec<String>,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Unquoted,
            escaped: false,
            buffer: String::new(),
            words: Vec::new(),
        }
    }

    fn make_words(mut self) -> Tokenized {
        while let Some(ch) = self.read_char() {
            if self.escaped {
                self.buffer.push(ch);
                self.escaped = false;
                continue;
            }
            match self.state {
                LexingState::Unquoted => self.handle_unquoted(ch),
                LexingState::SingleQuote => self.handle_single_quote(ch),
                LexingState::DoubleQuote => self.handle_double_quote(ch),
            }
        }

        // A backslash with nothing after it stays literal.
        if self.escaped {
            self.buffer.push('\\');
        }
        self.finish_word();

        let warning = match self.state {
            LexingState::Unquoted => None,
            LexingState::SingleQuote | LexingState::DoubleQuote => {
                Some(LexingWarning::UnclosedQuote)
            }
        };

        let mut words = self.words.into_iter();
        Tokenized {
            command: words.next().unwrap_or_default(),
            args: words.collect(),
            warning,
        }
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_unquoted(&mut self, ch: char) {
        match ch {
            '\\' => self.escaped = true,
            '\'' => self.state = LexingState::SingleQuote,
            '"' => self.state = LexingState::DoubleQuote,
            ' ' => self.finish_word(),
            c => self.buffer.push(c),
        }
    }

    fn handle_single_quote(&mut self, ch: char) {
        match ch {
            '\'' => self.state = LexingState::Unquoted,
            c => self.buffer.push(c),
        }
    }

    fn handle_double_quote(&mut self, ch: char) {
        match ch {
            '"' => self.state = LexingState::Unquoted,
            '\\' => match self.peek_char() {
                Some(next) if DOUBLE_QUOTE_ESCAPABLE.contains(&next) => self.escaped = true,
                // Nothing special follows: the backslash is an ordinary character.
                _ => self.buffer.push('\\'),
            },
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self) {
        if !self.buffer.is_empty() {
            self.words.push(std::mem::take(&mut self.buffer));
        }
    }
}

/// Split `line` into a command name and its arguments.
///
/// Words are separated by runs of unquoted, unescaped spaces. Quotes only group
/// characters, so `a'b c'd` is the single word `ab cd`, and an empty pair of quotes
/// produces no word at all.
pub fn tokenize(line: &str) -> Tokenized {
    LexingFSM::new(line).make_words()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> (String, Vec<String>) {
        let t = tokenize(line);
        assert_eq!(t.warning, None, "unexpected warning for {line:?}");
        (t.command, t.args)
    }

    #[test]
    fn test_plain_words_split_on_space_runs() {
        let (command, args) = words("  a   b ");
        assert_eq!(command, "a");
        assert_eq!(args, vec!["b"]);
    }

    #[test]
    fn test_single_quotes_group_words() {
        let (command, args) = words("'a b' c");
        assert_eq!(command, "a b");
        assert_eq!(args, vec!["c"]);
    }

    #[test]
    fn test_single_quotes_disable_backslash_and_double_quote() {
        let (command, args) = words(r#"echo 'x\y "z"'"#);
        assert_eq!(command, "echo");
        assert_eq!(args, vec![r#"x\y "z""#]);
    }

    #[test]
    fn test_escaped_double_quote_inside_double_quotes() {
        let (command, args) = words("\"a\\\"b\" c");
        assert_eq!(command, "a\"b");
        assert_eq!(args, vec!["c"]);
    }

    #[test]
    fn test_backslash_escapes_space_outside_quotes() {
        let (command, args) = words("a\\ b");
        assert_eq!(command, "a b");
        assert!(args.is_empty());
    }

    #[test]
    fn test_backslash_escapes_quote_outside_quotes() {
        let (_, args) = words(r#"echo \'hi\' \"there\""#);
        assert_eq!(args, vec!["'hi'", "\"there\""]);
    }

    #[test]
    fn test_backslash_before_ordinary_char_in_double_quotes_is_literal() {
        let (_, args) = words(r#"echo "a\nb" "c\\d" "e\$f""#);
        assert_eq!(args, vec![r"a\nb", r"c\d", "e$f"]);
    }

    #[test]
    fn test_trailing_backslash_is_literal() {
        let (_, args) = words("echo abc\\");
        assert_eq!(args, vec!["abc\\"]);

        let t = tokenize("echo \"abc\\");
        assert_eq!(t.args, vec!["abc\\"]);
        assert_eq!(t.warning, Some(LexingWarning::UnclosedQuote));
    }

    #[test]
    fn test_adjacent_quoted_parts_join_into_one_word() {
        let (_, args) = words(r#"cat 'a b'"c d"e"#);
        assert_eq!(args, vec!["a bc de"]);
    }

    #[test]
    fn test_unterminated_quote_keeps_collected_words() {
        let t = tokenize("'unterminated");
        assert_eq!(t.command, "unterminated");
        assert!(t.args.is_empty());
        assert_eq!(t.warning, Some(LexingWarning::UnclosedQuote));
    }

    #[test]
    fn test_blank_and_quote_only_lines_are_empty() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("     ").is_empty());
        assert!(tokenize("'' \"\"").is_empty());
    }

    #[test]
    fn test_tab_is_not_a_separator() {
        let (command, args) = words("a\tb c");
        assert_eq!(command, "a\tb");
        assert_eq!(args, vec!["c"]);
    }
}
