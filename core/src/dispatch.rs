//! One blocking entry point for synchronous and asynchronous commands.
//!
//! A [`Dispatcher`] owns the walked schema of one command and a [`Body`]
//! that builds the instance and runs it. Async bodies run on a fresh
//! current-thread tokio runtime created for that single invocation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{ArgMatches, Command as ClapCommand};
use tracing::debug;

use crate::build::{ParsedArguments, build};
use crate::context::Context;
use crate::error::DispatchError;
use crate::parser::{collect, to_arg};
use crate::schema::CommandSchema;
use crate::types::OptionField;
use crate::validate::RegistrationError;
use crate::walk::{WalkResult, walk};

/// A schema with a blocking body.
pub trait Command: CommandSchema {
    /// Runs the command; errors are reported with exit code 1.
    fn run(&self) -> anyhow::Result<()>;
}

/// A schema with an async body.
#[async_trait]
pub trait AsyncCommand: CommandSchema {
    /// Runs the command to completion on a per-invocation runtime.
    async fn run(&self) -> anyhow::Result<()>;
}

type SyncBody = fn(ParsedArguments) -> Result<(), DispatchError>;
type AsyncFuture = Pin<Box<dyn Future<Output = Result<(), DispatchError>> + Send>>;
type AsyncBody = fn(ParsedArguments) -> AsyncFuture;

/// How a command body executes.
#[derive(Clone, Copy)]
pub enum Body {
    Sync(SyncBody),
    Async(AsyncBody),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Body::Sync"),
            Self::Async(_) => f.write_str("Body::Async"),
        }
    }
}

fn run_sync<S: Command>(args: ParsedArguments) -> Result<(), DispatchError> {
    let instance = build::<S>(args)?;
    instance.run().map_err(DispatchError::Run)
}

fn run_async<S: AsyncCommand>(args: ParsedArguments) -> AsyncFuture {
    Box::pin(async move {
        let instance = build::<S>(args)?;
        instance.run().await.map_err(DispatchError::Run)
    })
}

/// Leaf handler for one registered command.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    schema: Arc<WalkResult>,
    options: Arc<[OptionField]>,
    body: Body,
}

impl Dispatcher {
    /// Walks `S` and dispatches to its blocking body.
    pub fn for_command<S: Command>() -> Result<Self, RegistrationError> {
        Self::new::<S>(Body::Sync(run_sync::<S>))
    }

    /// Walks `S` and dispatches to its async body.
    pub fn for_async_command<S: AsyncCommand>() -> Result<Self, RegistrationError> {
        Self::new::<S>(Body::Async(run_async::<S>))
    }

    fn new<S: CommandSchema>(body: Body) -> Result<Self, RegistrationError> {
        let schema = walk::<S>()?;
        let options: Arc<[OptionField]> = schema.flatten().into_iter().cloned().collect();
        Ok(Self {
            schema: Arc::new(schema),
            options,
            body,
        })
    }

    /// The walked schema tree.
    pub fn schema(&self) -> &WalkResult {
        &self.schema
    }

    /// Every option of the schema tree, flattened.
    pub fn options(&self) -> &[OptionField] {
        &self.options
    }

    /// Whether any node of the schema tree takes the context.
    pub fn needs_context(&self) -> bool {
        self.schema.needs_context
    }

    /// Whether the body is an [`AsyncCommand`].
    pub fn is_async(&self) -> bool {
        matches!(self.body, Body::Async(_))
    }

    /// Renders the clap subcommand for this handler.
    pub fn command(&self, name: &str, about: &str) -> ClapCommand {
        ClapCommand::new(name.to_string())
            .about(about.to_string())
            .args(self.options.iter().map(to_arg))
    }

    /// Handles one matched command line. `cmd` is the clap command the
    /// matches came from, used to render errors.
    pub fn invoke(
        &self,
        cmd: &ClapCommand,
        matches: &ArgMatches,
        context: Option<&Context>,
    ) -> Result<(), DispatchError> {
        let args = collect(&self.options, matches).map_err(|err| err.with_cmd(cmd))?;
        self.call(args, context)
    }

    /// Runs the body on already collected arguments, injecting the context
    /// (empty if `None`) when the schema tree needs it.
    pub fn call(
        &self,
        mut args: ParsedArguments,
        context: Option<&Context>,
    ) -> Result<(), DispatchError> {
        if self.schema.needs_context {
            args.set_context(context.cloned().unwrap_or_default());
        }

        debug!(
            schema = self.schema.schema,
            is_async = self.is_async(),
            values = args.len(),
            "Dispatching command"
        );

        match self.body {
            Body::Sync(body) => body(args),
            Body::Async(body) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(DispatchError::Runtime)?;
                runtime.block_on(body(args))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use crate::{Context, option};

    use super::*;

    static OBSERVED: Mutex<Vec<String>> = Mutex::new(Vec::new());

    crate::command_schema! {
        struct Greet {
            option name: String = option(["--name"]).with_default("world"),
        }
    }

    impl Command for Greet {
        fn run(&self) -> anyhow::Result<()> {
            let in_runtime = tokio::runtime::Handle::try_current().is_ok();
            OBSERVED
                .lock()
                .unwrap()
                .push(format!("sync {} {in_runtime}", self.name));
            Ok(())
        }
    }

    crate::command_schema! {
        struct Wait {
            option millis: u64 = option(["--millis"]).with_default(1),
            context context: Context,
        }
    }

    #[async_trait]
    impl AsyncCommand for Wait {
        async fn run(&self) -> anyhow::Result<()> {
            tokio::time::sleep(std::time::Duration::from_millis(self.millis)).await;
            let root = self.context.get_str("root_path").unwrap_or("<none>").to_string();
            OBSERVED.lock().unwrap().push(format!("async {root}"));
            anyhow::ensure!(self.millis < 100, "waited too long");
            Ok(())
        }
    }

    fn args(pairs: &[(&str, u64)]) -> ParsedArguments {
        let mut args = ParsedArguments::new();
        for (name, value) in pairs {
            args.insert(name, *value);
        }
        args
    }

    #[test]
    fn test_sync_and_async_dispatch() {
        let sync = Dispatcher::for_command::<Greet>().unwrap();
        assert!(!sync.is_async());
        assert!(!sync.needs_context());
        let mut greet_args = ParsedArguments::new();
        greet_args.insert("name", "alice");
        sync.call(greet_args, None).unwrap();

        let not_async = Dispatcher::for_async_command::<Wait>().unwrap();
        assert!(not_async.is_async());
        assert!(not_async.needs_context());
        let context = Context::new().with("root_path", "/srv");
        not_async.call(args(&[("millis", 1)]), Some(&context)).unwrap();
        not_async.call(args(&[("millis", 2)]), None).unwrap();

        let observed = OBSERVED.lock().unwrap().clone();
        assert!(observed.contains(&"sync alice false".to_string()));
        assert!(observed.contains(&"async /srv".to_string()));
        assert!(observed.contains(&"async <none>".to_string()));
    }

    #[test]
    fn test_async_errors_propagate_unchanged() {
        let dispatcher = Dispatcher::for_async_command::<Wait>().unwrap();
        let err = dispatcher.call(args(&[("millis", 150)]), None).unwrap_err();
        assert_eq!(err.run_error().unwrap().to_string(), "waited too long");
    }

    #[test]
    fn test_command_renders_flattened_options() {
        let dispatcher = Dispatcher::for_command::<Greet>().unwrap();
        let cmd = dispatcher.command("greet", "Say hello");
        assert_eq!(cmd.get_name(), "greet");
        assert!(cmd.get_arguments().any(|arg| arg.get_long() == Some("name")));
    }
}
