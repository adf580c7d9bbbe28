use crate::{AsValue, Error, Result, Value};
use rust_decimal::Decimal;
use std::borrow::Cow;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// Static descriptor of a model field, generated by `#[derive(Model)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// Rust identifier of the field.
    pub ident: &'static str,
    /// Column name used in generated SQL and in routing patterns.
    pub column: &'static str,
    /// The field is an `Option`: `None` is NULL and `Some(zero)` is not zero.
    pub nullable: bool,
    /// WHERE comparison template, `-` excludes the field from WHERE clauses.
    pub cmp: &'static str,
    /// Boolean operator joining the predicates of a nested group.
    pub join: &'static str,
    /// Filter applied to a nested group.
    pub filter: &'static str,
    /// SQL side conversion appended to the column in select lists.
    pub conv: &'static str,
}

impl FieldDef {
    pub const fn new(ident: &'static str, column: &'static str) -> Self {
        Self {
            ident,
            column,
            nullable: false,
            cmp: "",
            join: "",
            filter: "",
            conv: "",
        }
    }
}

/// Value of a field as seen by the introspector.
#[derive(Clone)]
pub enum FieldRef<'a> {
    Value(Value),
    Nested(&'a dyn Fields),
}

/// Field table of a structured value. Implemented by `#[derive(Model)]`.
pub trait Fields {
    /// Table name without prefix, empty when the type does not name one.
    fn table(&self) -> Cow<'_, str>;
    fn field_defs(&self) -> &'static [FieldDef];
    /// Current value of the field at `index` of [`Fields::field_defs`].
    fn field(&self, index: usize) -> FieldRef<'_>;
    /// Every field is NULL or zero, recursively.
    fn is_zero(&self) -> bool {
        (0..self.field_defs().len()).all(|i| match self.field(i) {
            FieldRef::Value(v) => v.is_null() || v.is_zero(),
            FieldRef::Nested(nested) => nested.is_zero(),
        })
    }
    fn field_index(&self, column: &str) -> Option<usize> {
        self.field_defs().iter().position(|v| v.column == column)
    }
}

/// The shapes a value can take when it is introspected.
pub enum Subject<'a> {
    /// A structured value described by its field table.
    Model(&'a dyn Fields),
    /// A table marker followed by positional values.
    Meta(&'a Meta),
    /// A bare value, the whole filter names its single column.
    Scalar(Value),
}

pub trait AsSubject {
    fn subject(&self) -> Subject<'_>;
}

/// A value that rows can be scanned into.
pub trait Model: AsSubject + Clone {
    /// Allocate a fresh destination shaped like `self`.
    fn new_like(&self) -> Self;
    /// Write a scanned driver value into the field at `index`.
    fn assign(&mut self, index: usize, value: Value) -> Result<()>;
}

/// Ad hoc model: a table name followed by positional values.
///
/// Filter entries are matched to the values by position, so
/// `Meta::new("user", vec![1.into(), "x".into()])` with filter `id,name`
/// introspects as `id = 1` and `name = 'x'`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Meta {
    pub table: String,
    pub values: Vec<Value>,
}

impl Meta {
    pub fn new(table: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            table: table.into(),
            values,
        }
    }
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

impl AsSubject for Meta {
    fn subject(&self) -> Subject<'_> {
        Subject::Meta(self)
    }
}

impl Model for Meta {
    fn new_like(&self) -> Self {
        Self {
            table: self.table.clone(),
            values: self.values.iter().map(Value::as_null).collect(),
        }
    }
    fn assign(&mut self, index: usize, value: Value) -> Result<()> {
        let Some(slot) = self.values.get_mut(index) else {
            return Err(Error::msg(format!(
                "meta value {} is out of range, {} values available",
                index,
                self.values.len()
            )));
        };
        *slot = value;
        Ok(())
    }
}

macro_rules! impl_scalar_model {
    ($($source:ty),+ $(,)?) => {$(
        impl AsSubject for $source {
            fn subject(&self) -> Subject<'_> {
                Subject::Scalar(self.clone().as_value())
            }
        }
        impl Model for $source {
            fn new_like(&self) -> Self {
                Default::default()
            }
            fn assign(&mut self, index: usize, value: Value) -> Result<()> {
                if index != 0 {
                    return Err(Error::msg(format!(
                        "scalar {} has a single column, cannot assign column {}",
                        std::any::type_name::<Self>(),
                        index
                    )));
                }
                *self = AsValue::try_from_value(value)?;
                Ok(())
            }
        }
    )+};
}
impl_scalar_model!(
    bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, Decimal, Uuid
);

impl<T: AsValue + Clone> AsSubject for Option<T> {
    fn subject(&self) -> Subject<'_> {
        Subject::Scalar(self.clone().as_value())
    }
}

impl<T: AsValue + Clone> Model for Option<T> {
    fn new_like(&self) -> Self {
        None
    }
    fn assign(&mut self, index: usize, value: Value) -> Result<()> {
        if index != 0 {
            return Err(Error::msg(format!(
                "scalar {} has a single column, cannot assign column {}",
                std::any::type_name::<Self>(),
                index
            )));
        }
        *self = AsValue::try_from_value(value)?;
        Ok(())
    }
}

macro_rules! impl_temporal_subject {
    ($($source:ty),+ $(,)?) => {$(
        impl AsSubject for $source {
            fn subject(&self) -> Subject<'_> {
                Subject::Scalar(self.as_value())
            }
        }
    )+};
}
impl_temporal_subject!(Date, Time, PrimitiveDateTime, OffsetDateTime);
