//! Named command groups and command registration.
//!
//! A [`CommandGroup`] collects registered commands and nested groups, renders
//! them as one clap command tree, and routes a matched command line to the
//! right [`Dispatcher`]. Groups may declare their own options and establish
//! the ambient [`Context`] for everything below them.

use std::ffi::OsString;
use std::fmt;
use std::process::ExitCode;

use clap::{Arg, ArgMatches, Command as ClapCommand};
use tracing::debug;

use crate::context::Context;
use crate::dispatch::{AsyncCommand, Command, Dispatcher};
use crate::error::DispatchError;
use crate::validate::RegistrationError;

type Setup = Box<dyn Fn(&ArgMatches, &mut Context) -> anyhow::Result<()> + Send + Sync>;

enum Entry {
    Command {
        name: String,
        about: String,
        dispatcher: Dispatcher,
    },
    Group(CommandGroup),
}

impl Entry {
    fn name(&self) -> &str {
        match self {
            Self::Command { name, .. } => name,
            Self::Group(group) => &group.name,
        }
    }
}

/// A named group of subcommands.
///
/// # Examples
///
/// ```
/// use typed_command_core::{Command, CommandGroup, command_schema, option};
///
/// command_schema! {
///     pub struct Hello {
///         option name: String = option(["-n", "--name"]).with_default("world"),
///     }
/// }
///
/// impl Command for Hello {
///     fn run(&self) -> anyhow::Result<()> {
///         println!("hello {}", self.name);
///         Ok(())
///     }
/// }
///
/// let mut cli = CommandGroup::new("greeter");
/// cli.register::<Hello>("hello", "Say hello").unwrap();
/// cli.try_run_from(["greeter", "hello", "--name", "you"]).unwrap();
/// ```
pub struct CommandGroup {
    name: String,
    about: Option<String>,
    args: Vec<Arg>,
    setup: Option<Setup>,
    entries: Vec<Entry>,
}

impl CommandGroup {
    /// Creates an empty group; `name` is its command name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            about: None,
            args: Vec::new(),
            setup: None,
            entries: Vec::new(),
        }
    }

    /// Adds a description shown in `--help`.
    pub fn with_about(mut self, about: &str) -> Self {
        self.about = Some(about.to_string());
        self
    }

    /// Adds a group-level option, given before the subcommand name.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.args.push(arg);
        self
    }

    /// Establishes the ambient context from the group's own matches.
    ///
    /// Runs before any subcommand of the group; the context it fills is
    /// handed down to nested groups and injected into commands that need it.
    pub fn setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&ArgMatches, &mut Context) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.setup = Some(Box::new(setup));
        self
    }

    /// The group's command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a command with a blocking body under `name`.
    ///
    /// Walks and validates `S` first; a malformed schema aborts registration
    /// and leaves the group unchanged. Registering a name again replaces the
    /// earlier entry.
    pub fn register<S: Command>(
        &mut self,
        name: &str,
        about: &str,
    ) -> Result<&mut Self, RegistrationError> {
        let dispatcher = Dispatcher::for_command::<S>()?;
        Ok(self.add_command(name, about, dispatcher))
    }

    /// Registers a command with an async body under `name`.
    pub fn register_async<S: AsyncCommand>(
        &mut self,
        name: &str,
        about: &str,
    ) -> Result<&mut Self, RegistrationError> {
        let dispatcher = Dispatcher::for_async_command::<S>()?;
        Ok(self.add_command(name, about, dispatcher))
    }

    /// Nests a group under this one, replacing any entry of the same name.
    pub fn group(&mut self, group: CommandGroup) -> &mut Self {
        debug!(group = %self.name, nested = %group.name, "Registered command group");
        self.insert(Entry::Group(group));
        self
    }

    fn add_command(&mut self, name: &str, about: &str, dispatcher: Dispatcher) -> &mut Self {
        debug!(
            group = %self.name,
            command = name,
            schema = dispatcher.schema().schema,
            options = dispatcher.options().len(),
            needs_context = dispatcher.needs_context(),
            is_async = dispatcher.is_async(),
            "Registered command"
        );
        self.insert(Entry::Command {
            name: name.to_string(),
            about: about.to_string(),
            dispatcher,
        });
        self
    }

    fn insert(&mut self, entry: Entry) {
        match self.entries.iter_mut().find(|e| e.name() == entry.name()) {
            Some(slot) => *slot = entry,
            None => self.entries.push(entry),
        }
    }

    /// Looks up the dispatcher registered directly under `name`.
    pub fn dispatcher(&self, name: &str) -> Option<&Dispatcher> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Command {
                name: entry_name,
                dispatcher,
                ..
            } if entry_name == name => Some(dispatcher),
            _ => None,
        })
    }

    /// Looks up a nested group by name.
    pub fn subgroup(&self, name: &str) -> Option<&CommandGroup> {
        self.entries.iter().find_map(|entry| match entry {
            Entry::Group(group) if group.name == name => Some(group),
            _ => None,
        })
    }

    /// Names of all entries, in registration order.
    pub fn entry_names(&self) -> Vec<&str> {
        self.entries.iter().map(Entry::name).collect()
    }

    /// Renders the clap command tree.
    pub fn command(&self) -> ClapCommand {
        let mut cmd = ClapCommand::new(self.name.clone())
            .subcommand_required(true)
            .arg_required_else_help(true)
            .args(self.args.iter().cloned());
        if let Some(about) = &self.about {
            cmd = cmd.about(about.clone());
        }

        for entry in &self.entries {
            cmd = cmd.subcommand(match entry {
                Entry::Command {
                    name,
                    about,
                    dispatcher,
                } => dispatcher.command(name, about),
                Entry::Group(group) => group.command(),
            });
        }
        cmd
    }

    /// Parses `argv` (program name first) and runs the selected command.
    pub fn try_run_from<I, T>(&self, argv: I) -> Result<(), DispatchError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut cmd = self.command();
        let matches = cmd.try_get_matches_from_mut(argv)?;
        self.dispatch(&cmd, &matches, Context::default())
    }

    /// Like [`try_run_from`](Self::try_run_from), reporting errors and
    /// returning the process exit code.
    pub fn run_from<I, T>(&self, argv: I) -> ExitCode
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        match self.try_run_from(argv) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                err.report();
                ExitCode::from(err.exit_code())
            }
        }
    }

    /// Runs with the process arguments.
    pub fn run(&self) -> ExitCode {
        self.run_from(std::env::args_os())
    }

    fn dispatch(
        &self,
        cmd: &ClapCommand,
        matches: &ArgMatches,
        mut context: Context,
    ) -> Result<(), DispatchError> {
        if let Some(setup) = &self.setup {
            setup(matches, &mut context).map_err(DispatchError::Setup)?;
        }

        let entry = matches.subcommand().and_then(|(name, sub_matches)| {
            let sub_cmd = cmd.find_subcommand(name)?;
            let entry = self.entries.iter().find(|entry| entry.name() == name)?;
            Some((entry, sub_cmd, sub_matches))
        });
        let Some((entry, sub_cmd, sub_matches)) = entry else {
            return Err(cmd
                .clone()
                .error(
                    clap::error::ErrorKind::MissingSubcommand,
                    format!("'{}' requires a subcommand", self.name),
                )
                .into());
        };

        match entry {
            Entry::Group(group) => group.dispatch(sub_cmd, sub_matches, context),
            Entry::Command {
                name, dispatcher, ..
            } => {
                debug!(group = %self.name, command = %name, "Invoking command");
                dispatcher.invoke(sub_cmd, sub_matches, Some(&context))
            }
        }
    }
}

impl fmt::Debug for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGroup")
            .field("name", &self.name)
            .field("entries", &self.entry_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::option;

    use super::*;

    crate::command_schema! {
        struct Noop {
            option flag: bool = option(["--flag"]),
        }
    }

    impl Command for Noop {
        fn run(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    crate::command_schema! {
        struct Broken {
            option count: u8 = option(["--count"]).with_default(1000),
        }
    }

    impl Command for Broken {
        fn run(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_reregistering_replaces_entry() {
        let mut group = CommandGroup::new("cli");
        group.register::<Noop>("noop", "first").unwrap();
        group.register::<Noop>("noop", "second").unwrap();

        assert_eq!(group.entry_names(), vec!["noop"]);
        let cmd = group.command();
        let sub = cmd.find_subcommand("noop").unwrap();
        assert_eq!(sub.get_about().map(ToString::to_string).as_deref(), Some("second"));
    }

    #[test]
    fn test_failed_registration_leaves_group_unchanged() {
        let mut group = CommandGroup::new("cli");
        let err = group.register::<Broken>("broken", "never").unwrap_err();

        assert!(matches!(err, RegistrationError::DefaultType { .. }));
        assert!(group.entry_names().is_empty());
    }

    #[test]
    fn test_nested_groups_render_and_dispatch() {
        let mut inner = CommandGroup::new("inner");
        inner.register::<Noop>("noop", "Nothing").unwrap();
        let mut outer = CommandGroup::new("outer");
        outer.group(inner);

        assert!(outer.subgroup("inner").unwrap().dispatcher("noop").is_some());
        outer.try_run_from(["outer", "inner", "noop", "--flag"]).unwrap();

        let err = outer.try_run_from(["outer", "inner", "missing"]).unwrap_err();
        assert!(matches!(err, DispatchError::Parse(_)));
        assert_eq!(err.exit_code(), 2);
    }
}
