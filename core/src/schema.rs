//! Declarative command schemas.
//!
//! A schema type lists its fields once, in [`CommandSchema::declare`], and
//! rebuilds itself from parsed arguments in [`CommandSchema::build`]. The
//! [`command_schema!`](crate::command_schema) macro generates both from a
//! single struct definition, so the two can never drift apart.

use std::any::{Any, TypeId};

use crate::build::ArgReader;
use crate::error::BuildError;
use crate::types::{OptionField, OptionSpec};
use crate::validate::RegistrationError;
use crate::value::FieldKind;
use crate::walk::{WalkResult, walk_node};

/// A command or reusable option group.
///
/// Implementations are normally generated by
/// [`command_schema!`](crate::command_schema); a manual implementation must
/// read back, in `build`, exactly the fields it declares in `declare`.
pub trait CommandSchema: Sized + Send + Sync + 'static {
    /// Declares the fields of the schema, in order.
    fn declare(fields: &mut Fields);

    /// Rebuilds an instance from parsed arguments.
    fn build(args: &mut ArgReader<'_>) -> Result<Self, BuildError>;
}

/// Ordered declaration table of one schema type.
#[derive(Debug, Default)]
pub struct Fields {
    decls: Vec<FieldDecl>,
}

#[derive(Debug)]
pub(crate) enum FieldDecl {
    Option(OptionField),
    Context {
        name: String,
        type_id: TypeId,
        type_name: &'static str,
    },
    Group {
        name: String,
        walk: fn() -> Result<WalkResult, RegistrationError>,
    },
    Plain {
        name: String,
    },
}

impl Fields {
    /// Declares an option field of Rust type `T`.
    pub fn option<T: FieldKind>(&mut self, name: &str, spec: OptionSpec) -> &mut Self {
        self.decls.push(FieldDecl::Option(OptionField {
            name: name.to_string(),
            field_type: T::field_type(),
            spec,
        }));
        self
    }

    /// Declares a nested option group of schema type `G`.
    pub fn group<G: CommandSchema>(&mut self, name: &str) -> &mut Self {
        self.decls.push(FieldDecl::Group {
            name: name.to_string(),
            walk: walk_node::<G>,
        });
        self
    }

    /// Declares the context field. `C` must be [`Context`](crate::Context);
    /// anything else fails registration.
    pub fn context<C: Any>(&mut self, name: &str) -> &mut Self {
        self.decls.push(FieldDecl::Context {
            name: name.to_string(),
            type_id: TypeId::of::<C>(),
            type_name: std::any::type_name::<C>(),
        });
        self
    }

    /// Declares a field that is not exposed on the command line.
    pub fn plain(&mut self, name: &str) -> &mut Self {
        self.decls.push(FieldDecl::Plain {
            name: name.to_string(),
        });
        self
    }

    /// Number of declared fields.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    /// Returns `true` if nothing was declared.
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub(crate) fn into_decls(self) -> Vec<FieldDecl> {
        self.decls
    }
}

/// Defines a schema struct and its [`CommandSchema`] implementation.
///
/// Each field starts with its kind:
///
/// - `option name: T = spec`: a command-line option; `T` is a
///   [`FieldKind`](crate::FieldKind) and `spec` an [`OptionSpec`].
/// - `group name: G`: a nested [`CommandSchema`] whose options are
///   flattened into this command.
/// - `context name: Context`: the ambient [`Context`](crate::Context).
/// - `field name: T` or `field name: T = expr`: not exposed; built from
///   `expr` or `T::default()`.
///
/// All fields are public.
///
/// # Examples
///
/// ```
/// use typed_command_core::{Context, command_schema, option, walk};
///
/// command_schema! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct Retry {
///         option attempts: u32 = option(["--attempts"]).with_default(3),
///     }
/// }
///
/// command_schema! {
///     #[derive(Debug, Clone)]
///     pub struct Fetch {
///         option url: String = option(["-u", "--url"]).required(),
///         group retry: Retry,
///         context context: Context,
///         field cache: Vec<String>,
///     }
/// }
///
/// let result = walk::<Fetch>().unwrap();
/// assert_eq!(result.kwarg_names, vec!["url", "context"]);
/// assert!(result.needs_context);
/// assert_eq!(result.flatten().len(), 2);
/// ```
#[macro_export]
macro_rules! command_schema {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$field_meta:meta])*
                $kind:ident $field:ident : $ty:ty $(= $init:expr)?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                pub $field: $ty,
            )*
        }

        impl $crate::CommandSchema for $name {
            #[allow(unused_variables)]
            fn declare(fields: &mut $crate::Fields) {
                $( $crate::__declare_field!(fields, $kind $field : $ty $(= $init)?); )*
            }

            #[allow(unused_variables)]
            fn build(
                args: &mut $crate::ArgReader<'_>,
            ) -> ::std::result::Result<Self, $crate::BuildError> {
                ::std::result::Result::Ok(Self {
                    $( $field: $crate::__build_field!(args, $kind $field : $ty $(= $init)?), )*
                })
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __declare_field {
    ($fields:ident, option $field:ident : $ty:ty = $spec:expr) => {
        $fields.option::<$ty>(::std::stringify!($field), $spec);
    };
    ($fields:ident, group $field:ident : $ty:ty) => {
        $fields.group::<$ty>(::std::stringify!($field));
    };
    ($fields:ident, context $field:ident : $ty:ty) => {
        $fields.context::<$ty>(::std::stringify!($field));
    };
    ($fields:ident, field $field:ident : $ty:ty $(= $init:expr)?) => {
        $fields.plain(::std::stringify!($field));
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __build_field {
    ($args:ident, option $field:ident : $ty:ty = $spec:expr) => {
        $args.take::<$ty>(::std::stringify!($field))?
    };
    ($args:ident, group $field:ident : $ty:ty) => {
        $args.group::<$ty>(::std::stringify!($field))?
    };
    ($args:ident, context $field:ident : $ty:ty) => {
        $args.context::<$ty>(::std::stringify!($field))?
    };
    ($args:ident, field $field:ident : $ty:ty = $init:expr) => {
        $init
    };
    ($args:ident, field $field:ident : $ty:ty) => {
        <$ty as ::std::default::Default>::default()
    };
}

#[cfg(test)]
mod tests {
    use crate::{Context, option};

    use super::*;

    crate::command_schema! {
        #[derive(Debug, Clone, PartialEq)]
        struct Inner {
            option level: Option<u8> = option(["--level"]),
        }
    }

    crate::command_schema! {
        #[derive(Debug, Clone, PartialEq)]
        struct Outer {
            /// Documented option.
            option name: String = option(["-n", "--name"]).required(),
            group inner: Inner,
            context ctx: Context,
            field note: String = "unset".to_string(),
            field counter: u32,
        }
    }

    #[test]
    fn test_macro_declares_fields_in_order() {
        let mut fields = Fields::default();
        Outer::declare(&mut fields);

        let decls = fields.into_decls();
        assert_eq!(decls.len(), 5);
        assert!(matches!(&decls[0], FieldDecl::Option(field) if field.name == "name"));
        assert!(matches!(&decls[1], FieldDecl::Group { name, .. } if name == "inner"));
        assert!(matches!(&decls[2], FieldDecl::Context { name, .. } if name == "ctx"));
        assert!(matches!(&decls[3], FieldDecl::Plain { name } if name == "note"));
        assert!(matches!(&decls[4], FieldDecl::Plain { name } if name == "counter"));
    }

    #[test]
    fn test_macro_builds_plain_fields_from_initializers() {
        let mut args = crate::ParsedArguments::new();
        args.insert("name", "alice");
        args.insert("level", 2);
        args.set_context(Context::new().with("root_path", "/tmp"));

        let outer: Outer = crate::build(args).unwrap();
        assert_eq!(outer.name, "alice");
        assert_eq!(outer.inner, Inner { level: Some(2) });
        assert_eq!(outer.ctx.get_str("root_path"), Some("/tmp"));
        assert_eq!(outer.note, "unset");
        assert_eq!(outer.counter, 0);
    }
}
