//! Option descriptors and the dynamically typed values that flow through them.
//!
//! An [`OptionSpec`] describes one flag: its declarations, constraints and
//! default. Defaults and parsed values are carried as [`OptionValue`]s so the
//! walker can check them against the Rust type of the field they feed
//! ([`FieldType`]) once, at registration time.

use std::any::{Any, TypeId};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::value::{ParamRef, ParamType, Scalar};

/// Primitive kind of the values an option element carries.
///
/// # Examples
///
/// ```
/// use typed_command_core::{FieldType, ValueType};
///
/// assert_eq!(FieldType::single::<u32>().element.value_type, ValueType::Int);
/// assert_eq!(FieldType::sequence::<[u8; 32]>().element.value_type, ValueType::FixedBytes(32));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    /// `true`/`false`; a plain `bool` field becomes a switch.
    Bool,
    /// Any Rust integer type; range is checked against the target type.
    Int,
    /// `f32` or `f64`.
    Float,
    /// UTF-8 string, optionally restricted by `choices`.
    Str,
    /// Hex-encoded byte string of any length.
    Bytes,
    /// Hex-encoded byte string of exactly this many bytes.
    FixedBytes(usize),
    /// Converted by a [`ParamType`].
    Custom,
}

/// How a field wraps its element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// `T`
    Single,
    /// `Option<T>`
    Optional,
    /// `Vec<T>`, always paired with a `multiple` option.
    Sequence,
}

/// The element type underneath a field's [`Shape`].
#[derive(Clone, Copy)]
pub struct ElementType {
    /// Primitive kind of the element.
    pub value_type: ValueType,
    /// Rust type of the element.
    pub type_id: TypeId,
    /// Rust type name of the element, for diagnostics.
    pub type_name: &'static str,
    pub(crate) accepts: fn(&OptionValue) -> bool,
    pub(crate) param: fn() -> Option<ParamRef>,
}

impl ElementType {
    fn of<T: Scalar>() -> Self {
        Self {
            value_type: T::VALUE_TYPE,
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            accepts: accepts::<T>,
            param: T::param,
        }
    }

    /// Returns `true` if `value` is a valid element of this type.
    pub fn accepts(&self, value: &OptionValue) -> bool {
        (self.accepts)(value)
    }
}

impl fmt::Debug for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementType")
            .field("value_type", &self.value_type)
            .field("type_name", &self.type_name)
            .finish()
    }
}

fn accepts<T: Scalar>(value: &OptionValue) -> bool {
    T::from_value(value).is_some()
}

/// Declared Rust type of an option field.
///
/// Built from the field's Rust type through [`FieldKind`](crate::FieldKind);
/// `Option<T>` and `Vec<T>` unwrap to the element `T`.
#[derive(Debug, Clone, Copy)]
pub struct FieldType {
    /// Wrapping of the element type.
    pub shape: Shape,
    /// The element type.
    pub element: ElementType,
    /// Rust type name of the whole field, for diagnostics.
    pub name: &'static str,
}

impl FieldType {
    /// Field of type `T`.
    pub fn single<T: Scalar>() -> Self {
        Self {
            shape: Shape::Single,
            element: ElementType::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Field of type `Option<T>`.
    pub fn optional<T: Scalar>() -> Self {
        Self {
            shape: Shape::Optional,
            element: ElementType::of::<T>(),
            name: std::any::type_name::<Option<T>>(),
        }
    }

    /// Field of type `Vec<T>`.
    pub fn sequence<T: Scalar>() -> Self {
        Self {
            shape: Shape::Sequence,
            element: ElementType::of::<T>(),
            name: std::any::type_name::<Vec<T>>(),
        }
    }

    /// Returns `true` for a plain `bool` field, which is exposed as a switch.
    pub fn is_switch(&self) -> bool {
        self.shape == Shape::Single && self.element.value_type == ValueType::Bool
    }
}

/// Byte string option value, given on the command line as hex.
///
/// # Examples
///
/// ```
/// use typed_command_core::Bytes;
///
/// let bytes = Bytes::from(vec![0xde, 0xad]);
/// assert_eq!(bytes.to_string(), "dead");
/// assert_eq!(bytes.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Consumes the wrapper, returning the raw bytes.
    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

/// Opaque value produced by a [`ParamType`].
#[derive(Clone)]
pub struct CustomValue {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    display: String,
}

impl CustomValue {
    /// Rust type name of the wrapped value.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrows the wrapped value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.display)
    }
}

/// A dynamically typed option value.
///
/// Used for defaults (checked against the field type at registration) and
/// for the values produced by the parser at invocation.
///
/// # Examples
///
/// ```
/// use typed_command_core::OptionValue;
///
/// assert_eq!(OptionValue::from(13), OptionValue::Int(13));
/// assert_eq!(OptionValue::from(None::<i64>), OptionValue::None);
/// assert_eq!(
///     OptionValue::from(vec![1, 2]),
///     OptionValue::Seq(vec![OptionValue::Int(1), OptionValue::Int(2)]),
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub enum OptionValue {
    /// Absent value (`None` of an `Option<T>` field).
    #[default]
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    /// Values of a `multiple` option, in command-line order.
    Seq(Vec<OptionValue>),
    Custom(CustomValue),
}

impl OptionValue {
    /// Wraps a custom value, as a [`ParamType`] produces it.
    pub fn custom<T>(value: T) -> Self
    where
        T: Any + fmt::Display + Send + Sync,
    {
        Self::Custom(CustomValue {
            display: value.to_string(),
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        })
    }

    /// Builds a sequence from anything convertible into values.
    pub fn seq<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<OptionValue>,
    {
        Self::Seq(items.into_iter().map(Into::into).collect())
    }

    /// Returns `true` for [`OptionValue::None`].
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Borrows a custom value if it is a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Self::Custom(custom) => custom.downcast_ref::<T>(),
            _ => None,
        }
    }

    /// Short description of the value's kind, for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::Bytes(_) => "bytes",
            Self::Seq(_) => "sequence",
            Self::Custom(custom) => custom.type_name,
        }
    }
}

impl PartialEq for OptionValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Arc::ptr_eq(&a.value, &b.value),
            _ => false,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Str(value) => f.write_str(value),
            Self::Bytes(value) => f.write_str(&hex::encode(value)),
            Self::Seq(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                f.write_str(&rendered.join(", "))
            }
            Self::Custom(custom) => f.write_str(&custom.display),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

macro_rules! int_value {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for OptionValue {
                fn from(value: $ty) -> Self {
                    Self::Int(value as i128)
                }
            }
        )+
    };
}

int_value!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f32> for OptionValue {
    fn from(value: f32) -> Self {
        Self::Float(f64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Bytes> for OptionValue {
    fn from(value: Bytes) -> Self {
        Self::Bytes(value.0)
    }
}

impl<const N: usize> From<[u8; N]> for OptionValue {
    fn from(value: [u8; N]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl<T: Into<OptionValue>> From<Option<T>> for OptionValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

impl<T: Into<OptionValue>> From<Vec<T>> for OptionValue {
    fn from(items: Vec<T>) -> Self {
        Self::seq(items)
    }
}

/// Declaration of one command-line option.
///
/// Created with [`option`] and refined with builder methods. The field the
/// option feeds determines its value type unless a [`ParamType`] is given
/// with [`with_param`](OptionSpec::with_param).
///
/// # Examples
///
/// ```
/// use typed_command_core::option;
///
/// let spec = option(["-o", "--some-option"])
///     .required()
///     .with_help("Some option");
/// assert_eq!(spec.canonical_name(), "--some-option");
/// assert_eq!(spec.display_decls(), "'-o' / '--some-option'");
/// assert!(spec.required);
/// ```
#[derive(Debug, Clone, Default)]
pub struct OptionSpec {
    /// Flag declarations, e.g. `-o` and `--some-option`.
    pub decls: Vec<String>,
    /// Help text shown in `--help`.
    pub help: Option<String>,
    /// Whether the flag must be given.
    pub required: bool,
    /// Value used when the flag is absent.
    pub default: Option<OptionValue>,
    /// Whether the flag may repeat; requires a `Vec<T>` field.
    pub multiple: bool,
    /// Allowed string values.
    pub choices: Option<Vec<String>>,
    /// Whether the flag is left out of `--help`.
    pub hidden: bool,
    /// Explicit converter overriding the element type's own.
    pub param: Option<ParamRef>,
}

/// Starts an [`OptionSpec`] with the given flag declarations.
pub fn option<I, S>(decls: I) -> OptionSpec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    OptionSpec {
        decls: decls.into_iter().map(Into::into).collect(),
        ..Default::default()
    }
}

impl OptionSpec {
    /// Marks the flag as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Sets the default used when the flag is absent.
    pub fn with_default(mut self, default: impl Into<OptionValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Adds help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Allows the flag to repeat.
    pub fn allow_multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Restricts a string option to a fixed set of values.
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(choices.into_iter().map(Into::into).collect());
        self
    }

    /// Hides the flag from `--help`.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Converts raw values with `param` instead of the element type's own
    /// converter.
    pub fn with_param<P: ParamType>(mut self, param: P) -> Self {
        self.param = Some(ParamRef::new(param));
        self
    }

    /// Short declarations (`-o`), without the dash.
    pub fn shorts(&self) -> impl Iterator<Item = char> + '_ {
        self.decls
            .iter()
            .filter(|decl| !decl.starts_with("--"))
            .filter_map(|decl| decl.strip_prefix('-'))
            .filter_map(|rest| rest.chars().next())
    }

    /// Long declarations (`--some-option`), without the dashes.
    pub fn longs(&self) -> impl Iterator<Item = &str> + '_ {
        self.decls.iter().filter_map(|decl| decl.strip_prefix("--"))
    }

    /// Returns the canonical declaration (first long form preferred, falls
    /// back to the first declaration).
    pub fn canonical_name(&self) -> &str {
        self.decls
            .iter()
            .find(|decl| decl.starts_with("--"))
            .or_else(|| self.decls.first())
            .map(String::as_str)
            .unwrap_or("unknown")
    }

    /// Quoted declarations as shown in error messages: `'-o' / '--opt'`.
    pub fn display_decls(&self) -> String {
        self.decls
            .iter()
            .map(|decl| format!("'{decl}'"))
            .collect::<Vec<_>>()
            .join(" / ")
    }
}

/// An option bound to the field it feeds.
#[derive(Debug, Clone)]
pub struct OptionField {
    /// Field name; also the destination name in parsed arguments.
    pub name: String,
    /// Declared Rust type of the field.
    pub field_type: FieldType,
    /// The option declaration.
    pub spec: OptionSpec,
}

impl OptionField {
    /// Converter for raw values: the explicit override, else the element
    /// type's own.
    pub fn param(&self) -> Option<ParamRef> {
        self.spec
            .param
            .clone()
            .or_else(|| (self.field_type.element.param)())
    }

    /// Value used when the flag is absent and not required.
    pub fn absent_value(&self) -> OptionValue {
        if let Some(default) = &self.spec.default {
            return default.clone();
        }
        match self.field_type.shape {
            Shape::Sequence => OptionValue::Seq(Vec::new()),
            Shape::Single if self.field_type.is_switch() => OptionValue::Bool(false),
            Shape::Single | Shape::Optional => OptionValue::None,
        }
    }
}
