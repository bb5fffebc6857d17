use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::external::find_command_path;
use crate::interpreter::Factory;
use anyhow::{Result, anyhow};
use argh::{EarlyExit, FromArgs};
use std::env;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins run in-process and never spawn a child.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "echo" or "cd".
    const NAME: &'static str;

    /// One-line summary shown by help and completion listings.
    const DESCRIPTION: &'static str;

    /// Build the command from its arguments (the name itself excluded).
    fn parse(args: &[&str]) -> Result<Self, EarlyExit>;

    /// Executes the command using provided IO streams and environment.
    ///
    /// Return value should follow shell conventions: 0 for success, non-zero for error.
    fn execute(
        self,
        stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode>;
}

/// Registry entry for one builtin: its name, summary and how to build it.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinInfo {
    pub name: &'static str,
    pub description: &'static str,
    factory: fn() -> Box<dyn CommandFactory>,
}

impl BuiltinInfo {
    const fn of<T: BuiltinCommand + 'static>() -> Self {
        Self {
            name: T::NAME,
            description: T::DESCRIPTION,
            factory: factory_of::<T>,
        }
    }

    /// Look a builtin up by name.
    pub fn find(name: &str) -> Option<&'static BuiltinInfo> {
        BUILTINS.iter().find(|b| b.name == name)
    }
}

fn factory_of<T: BuiltinCommand + 'static>() -> Box<dyn CommandFactory> {
    Box::new(Factory::<T>::default())
}

/// Every builtin, sorted by name.
pub const BUILTINS: &[BuiltinInfo] = &[
    BuiltinInfo::of::<Cd>(),
    BuiltinInfo::of::<Echo>(),
    BuiltinInfo::of::<Exit>(),
    BuiltinInfo::of::<Pwd>(),
    BuiltinInfo::of::<Type>(),
];

/// Whether `name` is handled in-process.
pub fn is_builtin(name: &str) -> bool {
    BuiltinInfo::find(name).is_some()
}

/// One factory per entry of [`BUILTINS`], in registry order.
pub(crate) fn builtin_factories() -> Vec<Box<dyn CommandFactory>> {
    BUILTINS.iter().map(|b| (b.factory)()).collect()
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(self: Box<Self>, mut streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let result = T::execute(*self, &mut streams.stdin, &mut streams.stdout, env);
        streams.stdout.flush()?;
        match result {
            Ok(x) => Ok(x),
            Err(e) => {
                writeln!(streams.stderr, "{e}")?;
                Ok(1)
            }
        }
    }
}

/// Usage text or a usage error produced while parsing builtin arguments.
struct InvalidArgs {
    output: String,
    is_error: bool,
}

impl ExecutableCommand for InvalidArgs {
    fn execute(self: Box<Self>, mut streams: Streams, _env: &mut Environment) -> Result<ExitCode> {
        if self.is_error {
            writeln!(streams.stderr, "{}", self.output.trim_end())?;
            Ok(1)
        } else {
            writeln!(streams.stdout, "{}", self.output.trim_end())?;
            Ok(0)
        }
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        if name != T::NAME {
            return None;
        }
        Some(match T::parse(args) {
            Ok(cmd) => Box::new(cmd),
            Err(EarlyExit { output, status: Ok(()) }) => {
                let info = BuiltinInfo::of::<T>();
                Box::new(InvalidArgs {
                    output: format!("{}: {}\n\n{output}", info.name, info.description),
                    is_error: false,
                })
            }
            Err(EarlyExit { output, status: Err(()) }) => Box::new(InvalidArgs {
                output,
                is_error: true,
            }),
        })
    }
}

#[derive(FromArgs)]
/// Print the current working directory to standard output.
pub struct Pwd {}

impl BuiltinCommand for Pwd {
    const NAME: &'static str = "pwd";
    const DESCRIPTION: &'static str = "Print the working directory";

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::NAME], args)
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", env.current_dir.display())?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Change the current working directory.
/// Without a target, or with `~`, changes to the directory named by HOME.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";
    const DESCRIPTION: &'static str = "Change the directory";

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::NAME], args)
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        let target = match self.target.as_deref() {
            None | Some("") | Some("~") => env
                .home_dir()
                .ok_or_else(|| anyhow!("cd: HOME not set"))?,
            Some(t) => PathBuf::from(t),
        };

        let new_dir = env.current_dir.join(&target);
        let canonical = fs::canonicalize(&new_dir)
            .ok()
            .filter(|dir| dir.is_dir())
            .ok_or_else(|| anyhow!("cd: {}: No such file or directory", target.display()))?;

        env::set_current_dir(&canonical)
            .map_err(|e| anyhow!("cd: {}: {e}", target.display()))?;
        log::debug!("cd to {}", canonical.display());
        env.current_dir = canonical;
        Ok(0)
    }
}

/// Exit the shell.
///
/// Only `exit` and `exit 0` end the shell. Arguments are taken verbatim, so
/// anything else, `exit -1` included, is ignored.
pub struct Exit {
    pub args: Vec<String>,
}

impl BuiltinCommand for Exit {
    const NAME: &'static str = "exit";
    const DESCRIPTION: &'static str = "Exit the shell";

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        _stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        match self.args.as_slice() {
            [] => env.should_exit = true,
            [code] if code == "0" => env.should_exit = true,
            other => log::debug!("exit ignored for arguments {other:?}"),
        }
        Ok(0)
    }
}

/// Write the arguments to standard output, separated by spaces, followed by a newline.
///
/// Arguments are taken verbatim, so `echo --help` prints `--help`.
pub struct Echo {
    pub args: Vec<String>,
}

impl BuiltinCommand for Echo {
    const NAME: &'static str = "echo";
    const DESCRIPTION: &'static str = "Display a line of text";

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Ok(Self {
            args: args.iter().map(|s| s.to_string()).collect(),
        })
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        _env: &mut Environment,
    ) -> Result<ExitCode> {
        writeln!(stdout, "{}", self.args.join(" "))?;
        Ok(0)
    }
}

#[derive(FromArgs)]
/// Describe how a command name would be interpreted.
pub struct Type {
    #[argh(positional)]
    /// command name to look up.
    pub name: String,
}

impl BuiltinCommand for Type {
    const NAME: &'static str = "type";
    const DESCRIPTION: &'static str = "Describe a command";

    fn parse(args: &[&str]) -> Result<Self, EarlyExit> {
        Self::from_args(&[Self::NAME], args)
    }

    fn execute(
        self,
        _stdin: &mut dyn Read,
        stdout: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<ExitCode> {
        if is_builtin(&self.name) {
            writeln!(stdout, "{} is a shell builtin", self.name)?;
            return Ok(0);
        }

        let paths = env.search_paths().unwrap_or_default();
        let resolved = find_command_path(&paths, Path::new(&self.name)).map(|p| p.into_owned());
        match resolved {
            Some(path) => {
                writeln!(stdout, "{} is {}", self.name, path.display())?;
                Ok(0)
            }
            None => {
                writeln!(stdout, "{}: not found", self.name)?;
                Ok(1)
            }
        }
    }
}
