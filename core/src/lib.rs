//! Declarative, typed command construction on top of `clap`.
//!
//! A command is a plain Rust struct declared with [`command_schema!`]. Each
//! field is one of:
//!
//! - an **option**, exposed as a command-line flag and described by an
//!   [`OptionSpec`];
//! - a nested **group**, another schema whose options are flattened into the
//!   command;
//! - the ambient [`Context`], injected by the dispatcher;
//! - a **plain** field, not exposed and default-constructed.
//!
//! Registration ([`CommandGroup::register`]) walks the schema tree once
//! ([`walk`]) and rejects every structural error up front: defaults of the
//! wrong type, `multiple` on a non-sequence field, malformed or duplicate
//! flags, a misused `context` name. Invocation then only parses, builds the
//! instance bottom-up ([`build`]) and runs it, synchronously ([`Command`]) or
//! on a fresh current-thread tokio runtime ([`AsyncCommand`]).
//!
//! # Example
//!
//! ```
//! use typed_command_core::*;
//!
//! command_schema! {
//!     pub struct Paging {
//!         option limit: u32 = option(["--limit"]).with_default(50),
//!     }
//! }
//!
//! command_schema! {
//!     pub struct List {
//!         option filter: Option<String> = option(["-f", "--filter"]),
//!         group paging: Paging,
//!     }
//! }
//!
//! impl Command for List {
//!     fn run(&self) -> anyhow::Result<()> {
//!         println!("{:?} {}", self.filter, self.paging.limit);
//!         Ok(())
//!     }
//! }
//!
//! let mut cli = CommandGroup::new("tool");
//! cli.register::<List>("list", "List things").unwrap();
//! cli.try_run_from(["tool", "list", "--limit", "5"]).unwrap();
//!
//! let list: List = parse_from(["list", "-f", "x"], None).unwrap();
//! assert_eq!(list.filter.as_deref(), Some("x"));
//! assert_eq!(list.paging.limit, 50);
//! ```

mod build;
mod context;
mod dispatch;
mod error;
mod group;
mod parser;
mod schema;
mod types;
mod validate;
mod value;
mod walk;

pub use build::{ArgReader, ParsedArguments, build};
pub use context::Context;
pub use dispatch::{AsyncCommand, Body, Command, Dispatcher};
pub use error::{BuildError, DispatchError};
pub use group::CommandGroup;
pub use parser::parse_from;
pub use schema::{CommandSchema, Fields};
pub use types::*;
pub use validate::{CONTEXT_FIELD, ErrorKind, RegistrationError};
pub use value::{FieldKind, ParamRef, ParamType, Scalar};
pub use walk::{WalkResult, walk};

/// Re-exported for implementing [`AsyncCommand`].
pub use async_trait::async_trait;
