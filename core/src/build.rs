//! Reconstruction of schema instances from flat parsed arguments.
//!
//! Destination names are unique across a whole schema tree, so nested groups
//! are built from the same flat [`ParsedArguments`] as their parent, each
//! group fully built before the struct that contains it.

use std::any::Any;
use std::collections::BTreeMap;

use tracing::trace;

use crate::context::Context;
use crate::error::BuildError;
use crate::schema::CommandSchema;
use crate::types::OptionValue;
use crate::value::FieldKind;

/// Flat mapping of destination name to parsed value for one invocation,
/// plus the injected context when the schema tree needs one.
///
/// # Examples
///
/// ```
/// use typed_command_core::{OptionValue, ParsedArguments};
///
/// let mut args = ParsedArguments::new();
/// args.insert("some_option", 13);
/// assert_eq!(args.get("some_option"), Some(&OptionValue::Int(13)));
/// assert!(args.context().is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedArguments {
    values: BTreeMap<String, OptionValue>,
    context: Option<Context>,
}

impl ParsedArguments {
    /// Creates an empty argument map without a context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for a destination, replacing any previous one.
    pub fn insert(&mut self, name: &str, value: impl Into<OptionValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    /// Looks up the value for a destination.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.values.get(name)
    }

    /// Injects the ambient context.
    pub fn set_context(&mut self, context: Context) {
        self.context = Some(context);
    }

    /// The injected context, if any.
    pub fn context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values were collected.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterates values in destination-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.values.iter().map(|(name, value)| (name.as_str(), value))
    }
}

/// Reads fields out of [`ParsedArguments`] while a schema builds itself.
pub struct ArgReader<'a> {
    args: &'a mut ParsedArguments,
}

impl<'a> ArgReader<'a> {
    /// Reads from `args`, consuming values as fields are taken.
    pub fn new(args: &'a mut ParsedArguments) -> Self {
        Self { args }
    }

    /// Takes the value of an option field.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingValue`] if no value was parsed for `name`,
    /// [`BuildError::TypeMismatch`] if it does not fit `T`.
    pub fn take<T: FieldKind>(&mut self, name: &str) -> Result<T, BuildError> {
        let value = self
            .args
            .values
            .remove(name)
            .ok_or_else(|| BuildError::MissingValue(name.to_string()))?;
        let found = value.kind_name();
        T::from_parsed(value).ok_or_else(|| BuildError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
            found,
        })
    }

    /// Builds a nested group from the same arguments.
    pub fn group<G: CommandSchema>(&mut self, name: &str) -> Result<G, BuildError> {
        trace!(group = name, schema = std::any::type_name::<G>(), "Building nested group");
        G::build(self)
    }

    /// Returns a copy of the injected context.
    ///
    /// # Errors
    ///
    /// [`BuildError::MissingContext`] if none was injected,
    /// [`BuildError::ContextType`] if `C` is not [`Context`].
    pub fn context<C: Any>(&mut self, name: &str) -> Result<C, BuildError> {
        let context = self
            .args
            .context
            .clone()
            .ok_or_else(|| BuildError::MissingContext(name.to_string()))?;
        let boxed: Box<dyn Any> = Box::new(context);
        boxed
            .downcast::<C>()
            .map(|context| *context)
            .map_err(|_| BuildError::ContextType {
                name: name.to_string(),
                found: std::any::type_name::<C>(),
            })
    }
}

/// Builds a schema instance, nested groups first.
pub fn build<S: CommandSchema>(mut args: ParsedArguments) -> Result<S, BuildError> {
    let mut reader = ArgReader::new(&mut args);
    S::build(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_consumes_value() {
        let mut args = ParsedArguments::new();
        args.insert("count", 3);
        let mut reader = ArgReader::new(&mut args);

        assert_eq!(reader.take::<u32>("count").unwrap(), 3);
        assert!(matches!(
            reader.take::<u32>("count"),
            Err(BuildError::MissingValue(name)) if name == "count"
        ));
    }

    #[test]
    fn test_take_reports_type_mismatch() {
        let mut args = ParsedArguments::new();
        args.insert("count", "three");
        let mut reader = ArgReader::new(&mut args);

        let err = reader.take::<u32>("count").unwrap_err();
        assert!(matches!(err, BuildError::TypeMismatch { found: "str", .. }));
    }

    #[test]
    fn test_context_requires_injection() {
        let mut args = ParsedArguments::new();
        let mut reader = ArgReader::new(&mut args);
        assert!(matches!(
            reader.context::<Context>("context"),
            Err(BuildError::MissingContext(_))
        ));

        let mut args = ParsedArguments::new();
        args.set_context(Context::new().with("k", "v"));
        let mut reader = ArgReader::new(&mut args);
        assert_eq!(
            reader.context::<Context>("context").unwrap().get_str("k"),
            Some("v")
        );
        assert!(matches!(
            reader.context::<String>("context"),
            Err(BuildError::ContextType { .. })
        ));
    }
}
