//! Mapping between Rust field types and option values.
//!
//! [`Scalar`] covers the element types an option may carry, [`FieldKind`]
//! the field shapes built on them (`T`, `Option<T>`, `Vec<T>`), and
//! [`ParamType`] the external converters for domain values.

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::types::{Bytes, FieldType, OptionValue, ValueType};

/// Converts raw command-line text into a domain value.
///
/// Failures are reported to the user as an invalid value for the option,
/// with a non-zero exit. Defaults are stored already typed and are never
/// passed through `convert`.
///
/// # Examples
///
/// ```
/// use typed_command_core::ParamType;
///
/// struct Percent;
///
/// impl ParamType for Percent {
///     type Output = u8;
///
///     fn name(&self) -> &'static str {
///         "percent"
///     }
///
///     fn convert(&self, raw: &str) -> Result<u8, String> {
///         let value: u8 = raw.trim_end_matches('%').parse().map_err(|_| format!("'{raw}' is not a percentage"))?;
///         if value > 100 {
///             return Err(format!("{value} is above 100"));
///         }
///         Ok(value)
///     }
/// }
///
/// assert_eq!(Percent.convert("42%"), Ok(42));
/// assert!(Percent.convert("420").is_err());
/// ```
pub trait ParamType: Send + Sync + 'static {
    /// Type of the converted value; must be the field's element type.
    type Output: Clone + fmt::Display + Send + Sync + 'static;

    /// Short name shown in diagnostics.
    fn name(&self) -> &'static str;

    /// Converts one raw value.
    fn convert(&self, raw: &str) -> Result<Self::Output, String>;
}

trait ErasedParam: Send + Sync {
    fn name(&self) -> &'static str;
    fn output_type(&self) -> TypeId;
    fn output_name(&self) -> &'static str;
    fn convert(&self, raw: &str) -> Result<OptionValue, String>;
}

impl<P: ParamType> ErasedParam for P {
    fn name(&self) -> &'static str {
        ParamType::name(self)
    }

    fn output_type(&self) -> TypeId {
        TypeId::of::<P::Output>()
    }

    fn output_name(&self) -> &'static str {
        std::any::type_name::<P::Output>()
    }

    fn convert(&self, raw: &str) -> Result<OptionValue, String> {
        ParamType::convert(self, raw).map(OptionValue::custom)
    }
}

/// Shared handle to a type-erased [`ParamType`].
#[derive(Clone)]
pub struct ParamRef(Arc<dyn ErasedParam>);

impl ParamRef {
    /// Wraps a converter.
    pub fn new<P: ParamType>(param: P) -> Self {
        Self(Arc::new(param))
    }

    /// The converter's name.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Rust type the converter produces.
    pub fn output_type(&self) -> TypeId {
        self.0.output_type()
    }

    /// Rust type name the converter produces.
    pub fn output_name(&self) -> &'static str {
        self.0.output_name()
    }

    /// Converts one raw value into an [`OptionValue::Custom`].
    pub fn convert(&self, raw: &str) -> Result<OptionValue, String> {
        self.0.convert(raw)
    }
}

impl fmt::Debug for ParamRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ParamRef").field(&self.name()).finish()
    }
}

/// Element type an option may carry.
///
/// Implemented for `bool`, the integer and float primitives, `String`,
/// [`Bytes`] and `[u8; N]`. Custom domain types implement it with
/// [`ValueType::Custom`] and usually supply their converter through
/// [`param`](Scalar::param); pair such impls with [`scalar_field!`] so the
/// type can be used as a field.
///
/// [`scalar_field!`]: crate::scalar_field
pub trait Scalar: Sized + Clone + Send + Sync + 'static {
    /// Primitive kind of the element.
    const VALUE_TYPE: ValueType;

    /// Extracts an element from a value, or `None` if it does not fit.
    fn from_value(value: &OptionValue) -> Option<Self>;

    /// Default converter for custom elements.
    fn param() -> Option<ParamRef> {
        None
    }
}

/// Rust type usable as an option field: a [`Scalar`], `Option<T>` or
/// `Vec<T>` of one.
pub trait FieldKind: Sized + Send + Sync + 'static {
    /// Declared type of the field.
    fn field_type() -> FieldType;

    /// Builds the field value from a parsed value.
    fn from_parsed(value: OptionValue) -> Option<Self>;
}

/// Implements [`FieldKind`] for [`Scalar`] types used directly as fields.
///
/// # Examples
///
/// ```
/// use std::fmt;
/// use typed_command_core::{OptionValue, Scalar, ValueType, scalar_field};
///
/// #[derive(Debug, Clone, PartialEq)]
/// struct Port(u16);
///
/// impl fmt::Display for Port {
///     fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
///         write!(f, "{}", self.0)
///     }
/// }
///
/// impl Scalar for Port {
///     const VALUE_TYPE: ValueType = ValueType::Custom;
///
///     fn from_value(value: &OptionValue) -> Option<Self> {
///         value.downcast_ref::<Port>().cloned()
///     }
/// }
///
/// scalar_field!(Port);
/// ```
#[macro_export]
macro_rules! scalar_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::FieldKind for $ty {
                fn field_type() -> $crate::FieldType {
                    $crate::FieldType::single::<$ty>()
                }

                fn from_parsed(value: $crate::OptionValue) -> ::std::option::Option<Self> {
                    <$ty as $crate::Scalar>::from_value(&value)
                }
            }
        )+
    };
}

impl Scalar for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bool(value) => Some(*value),
            other => other.downcast_ref::<bool>().copied(),
        }
    }
}

macro_rules! int_scalar {
    ($($ty:ty),+) => {
        $(
            impl Scalar for $ty {
                const VALUE_TYPE: ValueType = ValueType::Int;

                fn from_value(value: &OptionValue) -> Option<Self> {
                    match value {
                        OptionValue::Int(value) => <$ty>::try_from(*value).ok(),
                        other => other.downcast_ref::<$ty>().copied(),
                    }
                }
            }
        )+
    };
}

int_scalar!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Scalar for f64 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Float(value) => Some(*value),
            other => other.downcast_ref::<f64>().copied(),
        }
    }
}

impl Scalar for f32 {
    const VALUE_TYPE: ValueType = ValueType::Float;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Float(value) => {
                let narrowed = *value as f32;
                (narrowed.is_finite() || !value.is_finite()).then_some(narrowed)
            }
            other => other.downcast_ref::<f32>().copied(),
        }
    }
}

impl Scalar for String {
    const VALUE_TYPE: ValueType = ValueType::Str;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Str(value) => Some(value.clone()),
            other => other.downcast_ref::<String>().cloned(),
        }
    }
}

impl Scalar for Bytes {
    const VALUE_TYPE: ValueType = ValueType::Bytes;

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bytes(value) => Some(Bytes(value.clone())),
            other => other.downcast_ref::<Bytes>().cloned(),
        }
    }
}

impl<const N: usize> Scalar for [u8; N] {
    const VALUE_TYPE: ValueType = ValueType::FixedBytes(N);

    fn from_value(value: &OptionValue) -> Option<Self> {
        match value {
            OptionValue::Bytes(value) => value.as_slice().try_into().ok(),
            other => other.downcast_ref::<[u8; N]>().copied(),
        }
    }
}

crate::scalar_field!(
    bool, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, String, Bytes
);

impl<const N: usize> FieldKind for [u8; N] {
    fn field_type() -> FieldType {
        FieldType::single::<[u8; N]>()
    }

    fn from_parsed(value: OptionValue) -> Option<Self> {
        Self::from_value(&value)
    }
}

impl<T: Scalar> FieldKind for Option<T> {
    fn field_type() -> FieldType {
        FieldType::optional::<T>()
    }

    fn from_parsed(value: OptionValue) -> Option<Self> {
        match value {
            OptionValue::None => Some(None),
            value => T::from_value(&value).map(Some),
        }
    }
}

impl<T: Scalar> FieldKind for Vec<T> {
    fn field_type() -> FieldType {
        FieldType::sequence::<T>()
    }

    fn from_parsed(value: OptionValue) -> Option<Self> {
        match value {
            OptionValue::None => Some(Vec::new()),
            OptionValue::Seq(items) => items.iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Mojos(u64);

    impl fmt::Display for Mojos {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{} mojos", self.0)
        }
    }

    struct MojosParam;

    impl ParamType for MojosParam {
        type Output = Mojos;

        fn name(&self) -> &'static str {
            "mojos"
        }

        fn convert(&self, raw: &str) -> Result<Mojos, String> {
            raw.parse().map(Mojos).map_err(|_| format!("'{raw}' is not an amount"))
        }
    }

    #[test]
    fn test_integer_range_is_checked() {
        assert_eq!(u8::from_value(&OptionValue::Int(255)), Some(255));
        assert_eq!(u8::from_value(&OptionValue::Int(256)), None);
        assert_eq!(u64::from_value(&OptionValue::Int(-1)), None);
        assert_eq!(i64::from_value(&OptionValue::Str("1".into())), None);
    }

    #[test]
    fn test_primitives_accept_values_from_param_types() {
        assert_eq!(u64::from_value(&OptionValue::custom(5u64)), Some(5));
        assert_eq!(u32::from_value(&OptionValue::custom(5u64)), None);
        assert_eq!(String::from_value(&OptionValue::custom(Mojos(1))), None);
    }

    #[test]
    fn test_f32_rejects_values_beyond_its_range() {
        assert_eq!(f32::from_value(&OptionValue::Float(0.5)), Some(0.5));
        assert_eq!(f32::from_value(&OptionValue::Float(1e300)), None);
        assert_eq!(f32::from_value(&OptionValue::Float(-1e300)), None);
        assert_eq!(f32::from_value(&OptionValue::Float(f64::INFINITY)), Some(f32::INFINITY));
    }

    #[test]
    fn test_fixed_bytes_require_exact_length() {
        assert_eq!(
            <[u8; 2]>::from_value(&OptionValue::Bytes(vec![1, 2])),
            Some([1, 2])
        );
        assert_eq!(<[u8; 2]>::from_value(&OptionValue::Bytes(vec![1, 2, 3])), None);
    }

    #[test]
    fn test_option_and_vec_fields() {
        assert_eq!(Option::<i64>::from_parsed(OptionValue::None), Some(None));
        assert_eq!(Option::<i64>::from_parsed(OptionValue::Int(1)), Some(Some(1)));
        assert_eq!(
            Vec::<i64>::from_parsed(OptionValue::from(vec![1, 2, 3])),
            Some(vec![1, 2, 3])
        );
        assert_eq!(Vec::<i64>::from_parsed(OptionValue::seq([1.into(), OptionValue::from("3")])), None);
    }

    #[test]
    fn test_param_ref_converts_into_custom_values() {
        let param = ParamRef::new(MojosParam);
        assert_eq!(param.name(), "mojos");
        assert_eq!(param.output_type(), TypeId::of::<Mojos>());

        let value = param.convert("1000").unwrap();
        assert_eq!(value.downcast_ref::<Mojos>(), Some(&Mojos(1000)));
        assert_eq!(value.to_string(), "1000 mojos");
        assert!(param.convert("lots").is_err());
    }
}
