//! Registration-time validation of option fields.
//!
//! Every structural problem in a schema is reported here, while the command
//! tree is being built, so none of them can surface at invocation time.
//! Errors fall into two kinds mirroring the classic split: [`ErrorKind::Type`]
//! for a value or field of the wrong type, [`ErrorKind::Value`] for a wrong
//! combination of otherwise valid settings.

use std::collections::HashSet;

use thiserror::Error;

use crate::types::{OptionField, OptionValue, Shape, ValueType};

/// Field name reserved for the context field.
pub const CONTEXT_FIELD: &str = "context";

/// Argument id clap gives the help flag of every command.
const HELP_DESTINATION: &str = "help";

/// Flags clap declares for its help argument.
const HELP_FLAGS: [&str; 2] = ["-h", "--help"];

/// Broad class of a [`RegistrationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A default or field has the wrong type.
    Type,
    /// Settings are individually valid but do not fit together.
    Value,
}

/// Malformed schema, detected at registration.
///
/// The `Display` impl names the schema type and field at fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    /// Default value does not satisfy the field type.
    #[error("{schema}.{field}: default {found} does not satisfy declared type {expected}")]
    DefaultType {
        schema: &'static str,
        field: String,
        expected: &'static str,
        found: String,
    },
    /// An element of a sequence default does not satisfy the element type.
    #[error(
        "{schema}.{field}: default element {index} ({found}) does not satisfy element type {expected}"
    )]
    DefaultElementType {
        schema: &'static str,
        field: String,
        index: usize,
        expected: &'static str,
        found: String,
    },
    /// `multiple` used on a field that is not a `Vec<T>`.
    #[error("{schema}.{field}: can only use multiple with a Vec field, found {found}")]
    MultipleWithoutSequence {
        schema: &'static str,
        field: String,
        found: &'static str,
    },
    /// `Vec<T>` field declared without `multiple`.
    #[error("{schema}.{field}: Vec fields must be declared with multiple")]
    SequenceWithoutMultiple { schema: &'static str, field: String },
    /// Explicit converter produces a different type than the field holds.
    #[error("{schema}.{field}: param type '{param}' produces {produces}, field expects {expected}")]
    ParamOutputType {
        schema: &'static str,
        field: String,
        param: &'static str,
        produces: &'static str,
        expected: &'static str,
    },
    /// Custom element type without any converter.
    #[error("{schema}.{field}: no param type converts into {expected}")]
    MissingParamType {
        schema: &'static str,
        field: String,
        expected: &'static str,
    },
    /// `choices` on a field whose elements are not strings.
    #[error("{schema}.{field}: choices require a String field, found {found}")]
    ChoicesOnNonString {
        schema: &'static str,
        field: String,
        found: &'static str,
    },
    /// Context field typed as something other than [`Context`](crate::Context).
    #[error("{schema}.{field}: only Context can be the type of the context field, found {found}")]
    InvalidContextType {
        schema: &'static str,
        field: String,
        found: &'static str,
    },
    /// A non-context field uses the reserved name.
    #[error("{schema}: the field name 'context' is reserved for the context field")]
    ReservedContextName { schema: &'static str },
    /// Option declared without flags.
    #[error("{schema}.{field}: option must declare at least one flag")]
    MissingFlagName { schema: &'static str, field: String },
    /// Short flag is not a single dash and a single character.
    #[error("{schema}.{field}: invalid short flag format: {flag}")]
    InvalidShortFlag {
        schema: &'static str,
        field: String,
        flag: String,
    },
    /// Long flag does not start with `--` or is too short.
    #[error("{schema}.{field}: invalid long flag format: {flag}")]
    InvalidLongFlag {
        schema: &'static str,
        field: String,
        flag: String,
    },
    /// Default (or one of its elements) is not among the choices.
    #[error("{schema}.{field}: default '{default}' is not one of the choices")]
    DefaultNotInChoices {
        schema: &'static str,
        field: String,
        default: String,
    },
    /// Optional-less field that is neither required nor defaulted.
    #[error("{schema}.{field}: field of type {found} must be required or have a default")]
    MissingDefault {
        schema: &'static str,
        field: String,
        found: &'static str,
    },
    /// Two options anywhere in the tree share a flag, or an option uses
    /// `-h`/`--help`.
    #[error("duplicate flag in command tree: {0}")]
    DuplicateFlag(String),
    /// Two options anywhere in the tree share a destination name, or an
    /// option is named `help`.
    #[error("duplicate option destination in command tree: {0}")]
    DuplicateDestination(String),
}

impl RegistrationError {
    /// Returns the broad class of this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use typed_command_core::{ErrorKind, RegistrationError};
    ///
    /// let err = RegistrationError::ReservedContextName { schema: "Send" };
    /// assert_eq!(err.kind(), ErrorKind::Value);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DefaultType { .. }
            | Self::DefaultElementType { .. }
            | Self::MultipleWithoutSequence { .. }
            | Self::SequenceWithoutMultiple { .. }
            | Self::ParamOutputType { .. }
            | Self::MissingParamType { .. }
            | Self::ChoicesOnNonString { .. } => ErrorKind::Type,
            Self::InvalidContextType { .. }
            | Self::ReservedContextName { .. }
            | Self::MissingFlagName { .. }
            | Self::InvalidShortFlag { .. }
            | Self::InvalidLongFlag { .. }
            | Self::DefaultNotInChoices { .. }
            | Self::MissingDefault { .. }
            | Self::DuplicateFlag(_)
            | Self::DuplicateDestination(_) => ErrorKind::Value,
        }
    }
}

/// Validates one option field of `schema`.
///
/// Checks, in order: reserved name, flag formats, `multiple`/`Vec`
/// consistency, converter availability and output type, choices, and the
/// default against the declared type.
pub(crate) fn validate_option(
    schema: &'static str,
    field: &OptionField,
) -> Result<(), RegistrationError> {
    if field.name == CONTEXT_FIELD {
        return Err(RegistrationError::ReservedContextName { schema });
    }

    validate_decls(schema, field)?;

    let spec = &field.spec;
    let field_type = &field.field_type;
    let element = &field_type.element;

    match (spec.multiple, field_type.shape) {
        (true, Shape::Sequence) | (false, Shape::Single | Shape::Optional) => {}
        (true, Shape::Single | Shape::Optional) => {
            return Err(RegistrationError::MultipleWithoutSequence {
                schema,
                field: field.name.clone(),
                found: field_type.name,
            });
        }
        (false, Shape::Sequence) => {
            return Err(RegistrationError::SequenceWithoutMultiple {
                schema,
                field: field.name.clone(),
            });
        }
    }

    if let Some(param) = &spec.param {
        if param.output_type() != element.type_id {
            return Err(RegistrationError::ParamOutputType {
                schema,
                field: field.name.clone(),
                param: param.name(),
                produces: param.output_name(),
                expected: element.type_name,
            });
        }
    } else if element.value_type == ValueType::Custom && field.param().is_none() {
        return Err(RegistrationError::MissingParamType {
            schema,
            field: field.name.clone(),
            expected: element.type_name,
        });
    }

    if spec.choices.is_some() && element.value_type != ValueType::Str {
        return Err(RegistrationError::ChoicesOnNonString {
            schema,
            field: field.name.clone(),
            found: field_type.name,
        });
    }

    match &spec.default {
        Some(default) => {
            validate_default(schema, field, default)?;
            validate_default_choices(schema, field, default)
        }
        None if !spec.required && field_type.shape == Shape::Single && !field_type.is_switch() => {
            Err(RegistrationError::MissingDefault {
                schema,
                field: field.name.clone(),
                found: field_type.name,
            })
        }
        None => Ok(()),
    }
}

fn validate_decls(schema: &'static str, field: &OptionField) -> Result<(), RegistrationError> {
    if field.spec.decls.is_empty() {
        return Err(RegistrationError::MissingFlagName {
            schema,
            field: field.name.clone(),
        });
    }

    for decl in &field.spec.decls {
        if decl.starts_with("--") {
            let name = &decl[2..];
            if name.is_empty() || name.starts_with('-') || name.contains(['=', ' ']) {
                return Err(RegistrationError::InvalidLongFlag {
                    schema,
                    field: field.name.clone(),
                    flag: decl.clone(),
                });
            }
        } else {
            let mut rest = decl.strip_prefix('-').unwrap_or_default().chars();
            let valid = decl.starts_with('-')
                && matches!(rest.next(), Some(c) if c.is_ascii_alphanumeric())
                && rest.next().is_none();
            if !valid {
                return Err(RegistrationError::InvalidShortFlag {
                    schema,
                    field: field.name.clone(),
                    flag: decl.clone(),
                });
            }
        }
    }

    Ok(())
}

fn validate_default(
    schema: &'static str,
    field: &OptionField,
    default: &OptionValue,
) -> Result<(), RegistrationError> {
    let field_type = &field.field_type;
    let element = &field_type.element;
    let mismatch = || RegistrationError::DefaultType {
        schema,
        field: field.name.clone(),
        expected: field_type.name,
        found: describe(default),
    };

    match field_type.shape {
        Shape::Single if !element.accepts(default) => Err(mismatch()),
        Shape::Optional if !default.is_none() && !element.accepts(default) => Err(mismatch()),
        Shape::Sequence => {
            let OptionValue::Seq(items) = default else {
                return Err(mismatch());
            };
            match items.iter().position(|item| !element.accepts(item)) {
                Some(index) => Err(RegistrationError::DefaultElementType {
                    schema,
                    field: field.name.clone(),
                    index,
                    expected: element.type_name,
                    found: describe(&items[index]),
                }),
                None => Ok(()),
            }
        }
        Shape::Single | Shape::Optional => Ok(()),
    }
}

fn validate_default_choices(
    schema: &'static str,
    field: &OptionField,
    default: &OptionValue,
) -> Result<(), RegistrationError> {
    let Some(choices) = &field.spec.choices else {
        return Ok(());
    };

    let candidates: Vec<&OptionValue> = match default {
        OptionValue::Seq(items) => items.iter().collect(),
        OptionValue::None => Vec::new(),
        value => vec![value],
    };

    for candidate in candidates {
        if let OptionValue::Str(value) = candidate {
            if !choices.iter().any(|choice| choice == value) {
                return Err(RegistrationError::DefaultNotInChoices {
                    schema,
                    field: field.name.clone(),
                    default: value.clone(),
                });
            }
        }
    }

    Ok(())
}

/// Checks that destinations and flags are unique across a flattened tree.
///
/// clap's own help argument counts as declared, so an option cannot take its
/// id or flags.
pub(crate) fn validate_unique(options: &[&OptionField]) -> Result<(), RegistrationError> {
    let mut destinations = HashSet::from([HELP_DESTINATION]);
    let mut flags = HashSet::from(HELP_FLAGS);

    for field in options {
        if !destinations.insert(field.name.as_str()) {
            return Err(RegistrationError::DuplicateDestination(field.name.clone()));
        }
        for decl in &field.spec.decls {
            if !flags.insert(decl.as_str()) {
                return Err(RegistrationError::DuplicateFlag(decl.clone()));
            }
        }
    }

    Ok(())
}

fn describe(value: &OptionValue) -> String {
    format!("{value:?} ({})", value.kind_name())
}

#[cfg(test)]
mod tests {
    use crate::types::{FieldType, option};
    use crate::value::FieldKind;

    use super::*;

    const SCHEMA: &str = "Example";

    fn field<T: FieldKind>(name: &str, spec: crate::OptionSpec) -> OptionField {
        OptionField {
            name: name.to_string(),
            field_type: T::field_type(),
            spec,
        }
    }

    #[test]
    fn test_sequence_default_with_wrong_element_is_rejected() {
        let field = field::<Vec<i64>>(
            "values",
            option(["--value"])
                .allow_multiple()
                .with_default(OptionValue::seq([1.into(), 2.into(), OptionValue::from("3")])),
        );

        let err = validate_option(SCHEMA, &field).unwrap_err();
        assert!(matches!(err, RegistrationError::DefaultElementType { index: 2, .. }));
        assert_eq!(err.kind(), ErrorKind::Type);
    }

    #[test]
    fn test_optional_default_accepts_none_and_inner_type() {
        let none = field::<Option<i64>>("optional", option(["--optional"]).with_default(None::<i64>));
        let some = field::<Option<i64>>("optional", option(["--optional"]).with_default(3));
        let wrong = field::<Option<i64>>("optional", option(["--optional"]).with_default("3"));

        assert_eq!(validate_option(SCHEMA, &none), Ok(()));
        assert_eq!(validate_option(SCHEMA, &some), Ok(()));
        assert_eq!(validate_option(SCHEMA, &wrong).unwrap_err().kind(), ErrorKind::Type);
    }

    #[test]
    fn test_multiple_requires_vec_and_vice_versa() {
        let multiple = field::<i64>("n", option(["--n"]).allow_multiple().required());
        let vec = field::<Vec<i64>>("n", option(["--n"]));

        assert!(matches!(
            validate_option(SCHEMA, &multiple),
            Err(RegistrationError::MultipleWithoutSequence { .. })
        ));
        assert!(matches!(
            validate_option(SCHEMA, &vec),
            Err(RegistrationError::SequenceWithoutMultiple { .. })
        ));
    }

    #[test]
    fn test_reserved_context_name() {
        let field = field::<Option<String>>("context", option(["--context"]));
        let err = validate_option(SCHEMA, &field).unwrap_err();
        assert_eq!(err, RegistrationError::ReservedContextName { schema: SCHEMA });
        assert_eq!(err.kind(), ErrorKind::Value);
    }

    #[test]
    fn test_flag_formats() {
        for bad in ["o", "-oo", "---x", "--", "--a b", "-"] {
            let field = field::<Option<i64>>("x", option([bad]));
            let err = validate_option(SCHEMA, &field).unwrap_err();
            assert!(
                matches!(
                    err,
                    RegistrationError::InvalidShortFlag { .. } | RegistrationError::InvalidLongFlag { .. }
                ),
                "{bad} should be rejected, got {err:?}"
            );
        }

        let empty = field::<Option<i64>>("x", option(Vec::<String>::new()));
        assert!(matches!(
            validate_option(SCHEMA, &empty),
            Err(RegistrationError::MissingFlagName { .. })
        ));
    }

    #[test]
    fn test_plain_field_needs_required_or_default() {
        let bare = field::<i64>("count", option(["--count"]));
        assert!(matches!(
            validate_option(SCHEMA, &bare),
            Err(RegistrationError::MissingDefault { .. })
        ));

        let switch = field::<bool>("verbose", option(["-v", "--verbose"]));
        assert_eq!(validate_option(SCHEMA, &switch), Ok(()));
    }

    #[test]
    fn test_choices() {
        let ok = field::<String>(
            "format",
            option(["--format"]).with_choices(["json", "yaml"]).with_default("json"),
        );
        let bad_default = field::<String>(
            "format",
            option(["--format"]).with_choices(["json", "yaml"]).with_default("toml"),
        );
        let not_string = field::<Option<i64>>("n", option(["--n"]).with_choices(["1"]));

        assert_eq!(validate_option(SCHEMA, &ok), Ok(()));
        assert!(matches!(
            validate_option(SCHEMA, &bad_default),
            Err(RegistrationError::DefaultNotInChoices { .. })
        ));
        assert_eq!(
            validate_option(SCHEMA, &not_string).unwrap_err().kind(),
            ErrorKind::Type
        );
    }

    #[test]
    fn test_validate_unique_rejects_shared_flags() {
        let a = field::<Option<i64>>("a", option(["-x", "--alpha"]));
        let b = field::<Option<i64>>("b", option(["-x", "--beta"]));
        let c = field::<Option<i64>>("a", option(["--gamma"]));

        assert_eq!(
            validate_unique(&[&a, &b]),
            Err(RegistrationError::DuplicateFlag("-x".to_string()))
        );
        assert_eq!(
            validate_unique(&[&a, &c]),
            Err(RegistrationError::DuplicateDestination("a".to_string()))
        );
    }

    #[test]
    fn test_validate_unique_reserves_help_argument() {
        let short = field::<Option<String>>("host", option(["-h", "--host"]));
        let long = field::<bool>("show", option(["--help"]));
        let named = field::<bool>("help", option(["--show-help"]));

        let err = validate_unique(&[&short]).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateFlag("-h".to_string()));
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(
            validate_unique(&[&long]),
            Err(RegistrationError::DuplicateFlag("--help".to_string()))
        );
        assert_eq!(
            validate_unique(&[&named]),
            Err(RegistrationError::DuplicateDestination("help".to_string()))
        );
    }

    #[test]
    fn test_field_type_is_reported_by_name() {
        let field = field::<u8>("byte", option(["--byte"]).with_default(300));
        let err = validate_option(SCHEMA, &field).unwrap_err();
        assert!(err.to_string().contains("u8"), "{err}");
        assert_eq!(FieldType::single::<u8>().name, "u8");
    }
}
