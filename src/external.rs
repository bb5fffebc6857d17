use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::env::Environment;
use crate::interpreter::Factory;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin.
pub struct ExternalCommand {
    /// The name as typed; becomes the child's `argv[0]`.
    name: OsString,
    program: PathBuf,
    args: Vec<OsString>,
}

impl ExternalCommand {
    pub fn new(name: OsString, program: PathBuf, args: Vec<OsString>) -> Self {
        Self {
            name,
            program,
            args,
        }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn ExecutableCommand>> {
        let search_paths = env.search_paths().unwrap_or_default();
        let program = find_command_path(&search_paths, Path::new(name))?;
        log::debug!("resolved {name} to {}", program.display());
        Some(Box::new(ExternalCommand::new(
            name.into(),
            program.into_owned(),
            args.iter().map(|x| x.into()).collect(),
        )))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(self: Box<Self>, streams: Streams, env: &mut Environment) -> Result<ExitCode> {
        let mut cmd = std::process::Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(streams.stdin.stdio())
            .stdout(streams.stdout.stdio())
            .stderr(streams.stderr.stdio())
            .envs(env.vars.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&env.current_dir);
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.arg0(&self.name);
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("{}: failed to start", self.name.to_string_lossy()))?;
        let exit_status = child.wait()?;
        match exit_status.code() {
            Some(x) => Ok(x),
            None => Ok(terminated_by_signal(exit_status)),
        }
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> i32 {
    -1
}

/// Resolve a command path the way a typical shell would.
///
/// Behavior:
/// - Absolute path: returns it if it is an executable file.
/// - Relative with multiple components (e.g., `bin/sh`, `./foo`): returns it if it is an
///   executable file relative to the current directory.
/// - Single path component (no separators): search each directory in `search_paths` (PATH)
///   in order and return the first executable file. Earlier entries shadow later ones.
/// - Empty path: returns `None`.
///
/// An empty `search_paths` disables the PATH search; paths with a separator still resolve.
///
/// Returns either a borrowed reference to the provided `path` or an owned `PathBuf`
/// when the result is discovered via PATH lookup.
pub fn find_command_path<'a>(search_paths: &OsStr, path: &'a Path) -> Option<Cow<'a, Path>> {
    let mut components = path.components();
    let first = components.next();
    let second = components.next();
    match (first, second) {
        (None, _) => None,
        (Some(x), None) if !path.is_absolute() && !path.starts_with(".") => {
            // Single component -> search in PATH
            find_in_path(search_paths, x.as_os_str()).map(Cow::Owned)
        }
        _ => is_executable_file(path).then_some(Cow::Borrowed(path)),
    }
}

fn find_in_path(search_paths: &OsStr, cmd: &OsStr) -> Option<PathBuf> {
    if search_paths.is_empty() {
        return None;
    }
    std::env::split_paths(search_paths)
        .map(|dir| dir.join(cmd))
        .find(|path| is_executable_file(path))
}

/// Names of every executable file directly inside the `PATH` directories.
///
/// Unreadable or missing directories are skipped. Names that are not valid UTF-8
/// cannot be typed at the prompt and are left out.
pub fn executables_in_path(search_paths: &OsStr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for dir in std::env::split_paths(search_paths) {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if !names.contains(&name) && is_executable_file(&entry.path()) {
                names.insert(name);
            }
        }
    }
    names
}

/// A regular file (after following symlinks) with any execute bit set.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    if !meta.is_file() {
        return false;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        meta.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[cfg(unix)]
    fn osstr(s: &str) -> &OsStr {
        OsStr::new(s)
    }

    pub(crate) fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("minish_{tag}_{}_{nanos}", std::process::id()));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    /// Write `body` to `dir/name` with the given permission bits.
    #[cfg(unix)]
    pub(crate) fn write_file(dir: &Path, name: &str, body: &str, mode: u32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        fs::write(&path, body).expect("write file");
        fs::set_permissions(&path, fs::Permissions::from_mode(mode)).expect("chmod");
        path
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing_true() {
        let path = Path::new("/bin/sh");
        let res = find_command_path(osstr("/bin"), path);
        assert!(res.is_some(), "Expected to find /bin/sh via absolute path");
        let found = res.unwrap();
        assert_eq!(found.as_ref(), path);
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let path = Path::new("/bin/nonexisting");
        let res = find_command_path(osstr("/bin"), path);
        assert!(
            res.is_none(),
            "Expected not to find /bin/nonexisting via absolute path"
        );
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("sh"));
        let found = res.expect("Expected to find 'sh' in /bin via PATH search");
        assert_eq!(found.as_ref(), Path::new("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let res = find_command_path(osstr("/bin"), Path::new("nonexisting"));
        assert!(res.is_none(), "Expected not to find 'nonexisting' in PATH");
    }

    #[test]
    fn empty_path_is_none() {
        let res = find_command_path(OsStr::new("/bin"), Path::new(""));
        assert!(res.is_none(), "Empty path should not resolve to anything");
    }

    #[test]
    #[cfg(unix)]
    fn empty_search_paths_only_resolve_explicit_paths() {
        let found = find_command_path(OsStr::new(""), Path::new("/bin/sh")).unwrap();
        assert_eq!(found.as_ref(), Path::new("/bin/sh"));
        assert!(find_command_path(OsStr::new(""), Path::new("sh")).is_none());
    }

    #[test]
    #[cfg(unix)]
    fn factory_runs_absolute_path_without_path_var() {
        use crate::io_adapters::{MemReader, MemWriter};

        let mut env = Environment::new();
        env.set_var("PATH", "");
        let factory = Factory::<ExternalCommand>::default();
        assert!(factory.try_create(&env, "sh", &[]).is_none());

        let cmd = factory
            .try_create(&env, "/bin/sh", &["-c", "exit 4"])
            .expect("absolute path resolves without PATH");
        let streams = Streams {
            stdin: Box::new(MemReader::new(Vec::new())),
            stdout: Box::new(MemWriter::new()),
            stderr: Box::new(MemWriter::new()),
        };
        assert_eq!(cmd.execute(streams, &mut env).unwrap(), 4);
    }

    #[test]
    #[cfg(unix)]
    fn earlier_path_entry_shadows_later_one() {
        let first = make_unique_temp_dir("shadow_a");
        let second = make_unique_temp_dir("shadow_b");
        write_file(&first, "tool", "#!/bin/sh\n", 0o755);
        write_file(&second, "tool", "#!/bin/sh\n", 0o755);

        let search = std::env::join_paths([&first, &second]).unwrap();
        let found = find_command_path(&search, Path::new("tool")).unwrap();
        assert_eq!(found.as_ref(), first.join("tool"));

        let search = std::env::join_paths([&second, &first]).unwrap();
        let found = find_command_path(&search, Path::new("tool")).unwrap();
        assert_eq!(found.as_ref(), second.join("tool"));

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    #[cfg(unix)]
    fn non_executable_and_directories_are_skipped() {
        let first = make_unique_temp_dir("skip_a");
        let second = make_unique_temp_dir("skip_b");
        write_file(&first, "tool", "data", 0o644);
        fs::create_dir_all(first.join("dir")).unwrap();
        write_file(&second, "tool", "#!/bin/sh\n", 0o755);

        let search = std::env::join_paths([&first, &second]).unwrap();
        let found = find_command_path(&search, Path::new("tool")).unwrap();
        assert_eq!(found.as_ref(), second.join("tool"));
        assert!(find_command_path(&search, Path::new("dir")).is_none());

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }

    #[test]
    #[cfg(unix)]
    fn executables_are_listed_once_and_filtered() {
        let first = make_unique_temp_dir("list_a");
        let second = make_unique_temp_dir("list_b");
        write_file(&first, "alpha", "#!/bin/sh\n", 0o755);
        write_file(&first, "notes.txt", "plain", 0o644);
        write_file(&second, "alpha", "#!/bin/sh\n", 0o755);
        write_file(&second, "beta-2.0", "#!/bin/sh\n", 0o700);
        fs::create_dir_all(second.join("subdir")).unwrap();

        let missing = first.join("does-not-exist");
        let search = std::env::join_paths([&first, &missing, &second]).unwrap();
        let names: Vec<String> = executables_in_path(&search).into_iter().collect();
        assert_eq!(names, vec!["alpha", "beta-2.0"]);

        let _ = fs::remove_dir_all(first);
        let _ = fs::remove_dir_all(second);
    }
}
