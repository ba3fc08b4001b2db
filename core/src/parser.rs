//! Bridge between option fields and clap.
//!
//! Each [`OptionField`] becomes a [`clap::Arg`] whose values are parsed into
//! [`OptionValue`]s; after clap has matched a command line, [`collect`]
//! turns the matches into [`ParsedArguments`], applying defaults and
//! reporting missing required options.

use std::ffi::{OsStr, OsString};

use clap::builder::{PossibleValue, TypedValueParser};
use clap::error::ErrorKind;
use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches};

use crate::build::{ParsedArguments, build};
use crate::context::Context;
use crate::error::DispatchError;
use crate::schema::CommandSchema;
use crate::types::{ElementType, OptionField, OptionValue, Shape, ValueType};
use crate::value::ParamRef;
use crate::walk::walk;

/// Value parser turning raw text into an [`OptionValue`] of one element type.
#[derive(Clone)]
pub(crate) struct OptionValueParser {
    element: ElementType,
    param: Option<ParamRef>,
    choices: Option<Vec<String>>,
}

impl OptionValueParser {
    pub(crate) fn new(field: &OptionField) -> Self {
        Self {
            element: field.field_type.element,
            param: field.param(),
            choices: field.spec.choices.clone(),
        }
    }

    fn convert(&self, raw: &str) -> Result<OptionValue, String> {
        if let Some(choices) = &self.choices {
            if !choices.iter().any(|choice| choice == raw) {
                let quoted: Vec<String> =
                    choices.iter().map(|choice| format!("'{choice}'")).collect();
                return Err(format!("'{raw}' is not one of {}.", quoted.join(", ")));
            }
        }

        let value = match (&self.param, self.element.value_type) {
            (Some(param), _) => param.convert(raw)?,
            (None, ValueType::Bool) => parse_bool(raw).map(OptionValue::Bool)?,
            (None, ValueType::Int) => raw
                .trim()
                .parse::<i128>()
                .map(OptionValue::Int)
                .map_err(|_| format!("'{raw}' is not a valid integer."))?,
            (None, ValueType::Float) => raw
                .trim()
                .parse::<f64>()
                .map(OptionValue::Float)
                .map_err(|_| format!("'{raw}' is not a valid float."))?,
            (None, ValueType::Str) => OptionValue::Str(raw.to_string()),
            (None, ValueType::Bytes) => OptionValue::Bytes(parse_hex(raw)?),
            (None, ValueType::FixedBytes(len)) => {
                let bytes = parse_hex(raw)?;
                if bytes.len() != len {
                    return Err(format!(
                        "'{raw}' is {} bytes long, expected {len}.",
                        bytes.len()
                    ));
                }
                OptionValue::Bytes(bytes)
            }
            (None, ValueType::Custom) => {
                return Err(format!("no converter for {}.", self.element.type_name));
            }
        };

        if !self.element.accepts(&value) {
            return Err(format!("'{raw}' is out of range for {}.", self.element.type_name));
        }
        Ok(value)
    }
}

impl TypedValueParser for OptionValueParser {
    type Value = OptionValue;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        arg: Option<&Arg>,
        value: &OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let Some(raw) = value.to_str() else {
            return Err(clap::Error::new(ErrorKind::InvalidUtf8).with_cmd(cmd));
        };
        self.convert(raw).map_err(|reason| {
            let name = arg.map(display_arg).unwrap_or_else(|| "value".to_string());
            clap::Error::raw(
                ErrorKind::ValueValidation,
                format!("Invalid value for '{name}': {reason}\n"),
            )
            .with_cmd(cmd)
        })
    }

    fn possible_values(&self) -> Option<Box<dyn Iterator<Item = PossibleValue> + '_>> {
        self.choices
            .as_ref()
            .map(|choices| {
                Box::new(choices.iter().map(|choice| PossibleValue::new(choice.clone())))
                    as Box<dyn Iterator<Item = PossibleValue> + '_>
            })
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(format!("'{raw}' is not a valid boolean.")),
    }
}

fn parse_hex(raw: &str) -> Result<Vec<u8>, String> {
    let digits = raw
        .strip_prefix("0x")
        .or_else(|| raw.strip_prefix("0X"))
        .unwrap_or(raw);
    hex::decode(digits).map_err(|err| format!("'{raw}' is not valid hex: {err}."))
}

fn display_arg(arg: &Arg) -> String {
    match (arg.get_long(), arg.get_short()) {
        (Some(long), _) => format!("--{long}"),
        (None, Some(short)) => format!("-{short}"),
        (None, None) => arg.get_id().to_string(),
    }
}

/// Builds the clap argument for an option field.
pub(crate) fn to_arg(field: &OptionField) -> Arg {
    let spec = &field.spec;
    let mut arg = Arg::new(field.name.clone()).hide(spec.hidden);

    let mut shorts = spec.shorts();
    if let Some(short) = shorts.next() {
        arg = arg.short(short).visible_short_aliases(shorts.collect::<Vec<_>>());
    }
    let mut longs = spec.longs();
    if let Some(long) = longs.next() {
        arg = arg.long(long.to_string());
        for alias in longs {
            arg = arg.visible_alias(alias.to_string());
        }
    }

    arg = if field.field_type.is_switch() {
        arg.action(ArgAction::SetTrue)
    } else {
        let action = if spec.multiple {
            ArgAction::Append
        } else {
            ArgAction::Set
        };
        let numeric = matches!(
            field.field_type.element.value_type,
            ValueType::Int | ValueType::Float
        );
        arg.action(action)
            .value_name(field.name.to_uppercase())
            .allow_negative_numbers(numeric)
            .value_parser(OptionValueParser::new(field))
    };

    arg.help(help_text(field))
}

fn help_text(field: &OptionField) -> String {
    let spec = &field.spec;
    let mut parts: Vec<String> = spec.help.iter().cloned().collect();

    if spec.required {
        parts.push("[required]".to_string());
    }
    match &spec.default {
        Some(OptionValue::None) | None => {}
        Some(OptionValue::Seq(items)) if items.is_empty() => {}
        Some(OptionValue::Bool(false)) if field.field_type.is_switch() => {}
        Some(default) => parts.push(format!("[default: {default}]")),
    }
    parts.join(" ")
}

/// Collects the values of `options` from clap matches.
///
/// Absent options take their default (or the empty value of their shape);
/// an absent required option is reported as `Missing option '-o' / '--opt'.`
pub(crate) fn collect(
    options: &[OptionField],
    matches: &ArgMatches,
) -> Result<ParsedArguments, clap::Error> {
    let mut parsed = ParsedArguments::new();

    for field in options {
        let id = field.name.as_str();
        let present = matches!(
            matches.value_source(id),
            Some(ValueSource::CommandLine | ValueSource::EnvVariable)
        );

        let value = if !present {
            if field.spec.required {
                return Err(clap::Error::raw(
                    ErrorKind::MissingRequiredArgument,
                    format!("Missing option {}.\n", field.spec.display_decls()),
                ));
            }
            field.absent_value()
        } else if field.field_type.is_switch() {
            OptionValue::Bool(matches.get_flag(id))
        } else if field.field_type.shape == Shape::Sequence {
            OptionValue::Seq(
                matches
                    .get_many::<OptionValue>(id)
                    .into_iter()
                    .flatten()
                    .cloned()
                    .collect(),
            )
        } else {
            matches
                .get_one::<OptionValue>(id)
                .cloned()
                .unwrap_or_default()
        };

        parsed.insert(id, value);
    }

    Ok(parsed)
}

/// Parses a command line straight into a schema instance, without running
/// anything. The first element of `argv` is the program name.
///
/// The context, when the schema needs one, is `context` or an empty one.
///
/// # Examples
///
/// ```
/// use typed_command_core::{command_schema, option, parse_from};
///
/// command_schema! {
///     #[derive(Debug, PartialEq)]
///     pub struct Show {
///         option some_option: i64 = option(["-o", "--some-option"]).required(),
///         option optional: Option<i64> = option(["--optional"]),
///     }
/// }
///
/// let show: Show = parse_from(["show", "-o", "13"], None).unwrap();
/// assert_eq!(show, Show { some_option: 13, optional: None });
/// ```
pub fn parse_from<S, I, T>(argv: I, context: Option<Context>) -> Result<S, DispatchError>
where
    S: CommandSchema,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let result = walk::<S>()?;
    let options: Vec<OptionField> = result.flatten().into_iter().cloned().collect();
    let name = result.schema.rsplit("::").next().unwrap_or(result.schema);
    let mut cmd = clap::Command::new(name.to_string()).args(options.iter().map(to_arg));

    let matches = cmd.try_get_matches_from_mut(argv)?;
    let mut args = collect(&options, &matches).map_err(|err| err.with_cmd(&cmd))?;
    if result.needs_context {
        args.set_context(context.unwrap_or_default());
    }
    Ok(build::<S>(args)?)
}
