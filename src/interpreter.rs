use crate::builtin::{BUILTINS, builtin_factories};
use crate::command::{CommandFactory, ExitCode, Streams};
use crate::completion::{CompletionEngine, ShellHelper};
use crate::config::ShellConfig;
use crate::env::Environment;
use crate::lexer;
use crate::redirect::{self, RedirectionSpec};
use anyhow::{Context, Result};
use rustyline::config::{BellStyle, CompletionType, Config};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::io::Write;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and ExternalCommand.
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Exit status of a command name that resolves to nothing.
pub const NOT_FOUND: ExitCode = 127;

/// A minimal shell-like interpreter that can execute built-in and external commands.
///
/// The interpreter maintains an [`Environment`] and a list of [`CommandFactory`] objects
/// that are queried, in order, to create commands by name. See [`Default`] for the
/// factories included out of the box.
///
/// Example
/// ```
/// use minish::Interpreter;
/// let mut sh = Interpreter::default();
/// let code = sh.run("echo", &["hello", "world"]).unwrap();
/// assert_eq!(code, 0);
/// ```
pub struct Interpreter {
    env: Environment,
    commands: Vec<Box<dyn CommandFactory>>,
    config: ShellConfig,
}

impl Interpreter {
    /// Create a new interpreter with a custom set of command factories.
    pub fn new(commands: Vec<Box<dyn CommandFactory>>) -> Self {
        Self {
            env: Environment::new(),
            commands,
            config: ShellConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ShellConfig) -> Self {
        self.config = config;
        self
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Whether `exit` asked the read loop to stop.
    pub fn should_exit(&self) -> bool {
        self.env.should_exit
    }

    /// Run a single command invocation by name with arguments on the shell's own streams.
    pub fn run(&mut self, name: &str, args: &[&str]) -> Result<ExitCode> {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        self.execute(name, &args, &RedirectionSpec::default())
    }

    /// Execute `command` with `args`, applying `redirection` on top of the shell's
    /// own streams.
    pub fn execute(
        &mut self,
        command: &str,
        args: &[String],
        redirection: &RedirectionSpec,
    ) -> Result<ExitCode> {
        self.execute_with(command, args, redirection, Streams::inherited())
    }

    /// Execute `command` with `args` on explicit `streams`.
    ///
    /// Redirect targets replace the matching stream for this invocation only and are
    /// closed when it returns, whatever the outcome. If a target cannot be opened the
    /// failure is reported on `streams.stderr` and the command does not run.
    pub fn execute_with(
        &mut self,
        command: &str,
        args: &[String],
        redirection: &RedirectionSpec,
        mut streams: Streams,
    ) -> Result<ExitCode> {
        if command.is_empty() {
            return Ok(0);
        }

        if let Some(target) = &redirection.stdout {
            log::debug!("stdout of {command} -> {}", target.path.display());
            match target.open(&self.env.current_dir) {
                Ok(file) => streams.stdout = Box::new(file),
                Err(e) => {
                    log::warn!("cannot open {}: {e}", target.path.display());
                    writeln!(streams.stderr, "redirect error: {}: {e}", target.path.display())?;
                    return Ok(1);
                }
            }
        }
        if let Some(target) = &redirection.stderr {
            log::debug!("stderr of {command} -> {}", target.path.display());
            match target.open(&self.env.current_dir) {
                Ok(file) => streams.stderr = Box::new(file),
                Err(e) => {
                    log::warn!("cannot open {}: {e}", target.path.display());
                    writeln!(streams.stderr, "redirect error: {}: {e}", target.path.display())?;
                    return Ok(1);
                }
            }
        }

        self.dispatch(command, args, streams)
    }

    fn dispatch(&mut self, name: &str, args: &[String], mut streams: Streams) -> Result<ExitCode> {
        let args_ref: Vec<&str> = args.iter().map(String::as_str).collect();
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(&self.env, name, &args_ref) {
                log::debug!("executing {name} {args:?}");
                return cmd.execute(streams, &mut self.env);
            }
        }
        log::debug!("{name}: not found");
        writeln!(streams.stdout, "{name}: not found")?;
        Ok(NOT_FOUND)
    }

    /// Tokenize, split off redirections and execute one input line.
    pub fn execute_line(&mut self, line: &str) -> Result<ExitCode> {
        self.execute_line_with(line, Streams::inherited())
    }

    /// Like [`Interpreter::execute_line`] on explicit streams.
    ///
    /// Diagnostics about the line itself (unclosed quotes, a redirect without a file
    /// name) go to `streams.stderr` before any redirection is applied.
    pub fn execute_line_with(&mut self, line: &str, mut streams: Streams) -> Result<ExitCode> {
        let tokens = lexer::tokenize(line);
        if let Some(warning) = tokens.warning {
            log::warn!("{warning}: {line:?}");
            writeln!(streams.stderr, "Warning: {warning}")?;
        }
        if tokens.is_empty() {
            return Ok(0);
        }

        let (args, redirection) = match redirect::extract_redirection(tokens.args) {
            Ok(split) => split,
            Err(e) => {
                log::warn!("{e}; running {} without redirection", tokens.command);
                writeln!(streams.stderr, "redirect: no file specified")?;
                (e.into_args(), RedirectionSpec::default())
            }
        };

        self.execute_with(&tokens.command, &args, &redirection, streams)
    }

    /// Interactive read-eval-print loop.
    ///
    /// Returns when input ends or `exit` is run; fails only if the line editor does.
    pub fn repl(&mut self) -> Result<()> {
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .bell_style(BellStyle::None)
            .auto_add_history(false)
            .max_history_size(self.config.history_size)?
            .build();
        let mut rl = Editor::<ShellHelper, DefaultHistory>::with_config(config)?;
        let engine = CompletionEngine::new(BUILTINS.iter().map(|b| b.name), self.env.search_paths());
        rl.set_helper(Some(ShellHelper::new(engine, self.config.prompt.clone())));

        log::info!("shell started in {}", self.env.current_dir.display());
        loop {
            match rl.readline(&self.config.prompt) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line.as_str())?;
                    if let Err(e) = self.execute_line(&line) {
                        log::error!("{line:?} failed: {e:#}");
                        eprintln!("{e:#}");
                    }
                    if self.env.should_exit {
                        log::info!("exit requested");
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    log::info!("end of input");
                    break;
                }
                Err(err) => return Err(err).context("failed to read input line"),
            }
        }

        Ok(())
    }
}

impl Default for Interpreter {
    /// Create an interpreter with the default set of commands:
    /// - built-ins: `cd`, `echo`, `exit`, `pwd`, `type`
    /// - external command launcher
    fn default() -> Self {
        use crate::external::ExternalCommand;
        let mut commands = builtin_factories();
        commands.push(Box::new(Factory::<ExternalCommand>::default()));
        Self::new(commands)
    }
}
