//! A small interactive POSIX-style shell.
//!
//! Input lines are split into words by [`lexer`], stripped of output redirections by
//! [`redirect`] and run either in-process (the builtins `cd`, `echo`, `exit`, `pwd`
//! and `type`) or as external programs found on `PATH`. Tab completion of command
//! names lives in [`completion`].
//!
//! The main entry point is [`Interpreter`]: [`Interpreter::repl`] drives the terminal,
//! [`Interpreter::execute_line`] runs one line and is what tests use.

mod builtin;
pub mod command;
pub mod completion;
pub mod config;
pub mod env;
pub mod external;
mod interpreter;
pub mod io_adapters;
pub mod lexer;
pub mod redirect;
pub mod trie;

pub use builtin::{BUILTINS, BuiltinInfo, is_builtin};
pub use completion::CompletionEngine;
pub use config::ShellConfig;
pub use env::Environment;
pub use interpreter::{Interpreter, NOT_FOUND};
pub use lexer::tokenize;
pub use redirect::extract_redirection;
pub use trie::Trie;
