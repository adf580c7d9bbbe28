use crate::{
    AsSubject, AsValue, Crud, Error, FieldDef, FieldRef, Filter, Model, Result, RowLabeled,
    Subject, Value, parse_options,
    stream::{Stream, StreamExt},
    util::split_first,
};
use anyhow::Context;
use rust_decimal::Decimal;
use std::{
    any,
    borrow::Cow,
    collections::{BTreeMap, HashMap, btree_map, hash_map},
    hash::Hash,
    pin::pin,
};
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time};
use uuid::Uuid;

/// A column of the result set and the field of the model receiving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanField {
    pub name: String,
    pub func: String,
    pub def: Option<&'static FieldDef>,
    pub index: usize,
}

/// What a destination receives: the whole scanned value or one resolved
/// field of it.
pub enum Scanned<'a, M> {
    Whole(&'a M),
    Field(Value),
}

impl<'a, M: AsSubject> Scanned<'a, M> {
    /// The item as a single value. A whole scalar model is its own value.
    pub fn value(self) -> Result<Value> {
        match self {
            Scanned::Field(v) => Ok(v),
            Scanned::Whole(m) => match m.subject() {
                Subject::Scalar(v) => Ok(v),
                _ => Err(Error::msg(format!(
                    "Cannot use the whole {} as a single value",
                    any::type_name::<M>()
                ))),
            },
        }
    }
}

impl<'a, M> Scanned<'a, M> {
    pub fn whole(self) -> Result<&'a M> {
        match self {
            Scanned::Whole(m) => Ok(m),
            Scanned::Field(v) => Err(Error::msg(format!(
                "Cannot use the field value {} as {}",
                v,
                any::type_name::<M>()
            ))),
        }
    }
}

/// A storage location receiving scanned items.
///
/// Scalars overwrite their content, collections append.
pub trait Slot<M> {
    /// Create the slot content from its first item.
    fn make(item: Scanned<'_, M>) -> Result<Self>
    where
        Self: Sized;
    /// Store another item.
    fn put(&mut self, item: Scanned<'_, M>) -> Result<()>;
}

macro_rules! impl_slot_value {
    ($($source:ty),+ $(,)?) => {$(
        impl<M: AsSubject> Slot<M> for $source {
            fn make(item: Scanned<'_, M>) -> Result<Self> {
                <$source as AsValue>::try_from_value(item.value()?)
            }
            fn put(&mut self, item: Scanned<'_, M>) -> Result<()> {
                *self = <Self as Slot<M>>::make(item)?;
                Ok(())
            }
        }
    )+};
}
impl_slot_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    Decimal,
    Box<[u8]>,
    Date,
    Time,
    PrimitiveDateTime,
    OffsetDateTime,
    Uuid,
);

impl<M: AsSubject, T: AsValue> Slot<M> for Option<T> {
    fn make(item: Scanned<'_, M>) -> Result<Self> {
        <Self as AsValue>::try_from_value(item.value()?)
    }
    fn put(&mut self, item: Scanned<'_, M>) -> Result<()> {
        *self = <Self as Slot<M>>::make(item)?;
        Ok(())
    }
}

impl<M: AsSubject> Slot<M> for Value {
    fn make(item: Scanned<'_, M>) -> Result<Self> {
        item.value()
    }
    fn put(&mut self, item: Scanned<'_, M>) -> Result<()> {
        *self = item.value()?;
        Ok(())
    }
}

impl<M, T: Slot<M>> Slot<M> for Vec<T> {
    fn make(item: Scanned<'_, M>) -> Result<Self> {
        Ok(vec![T::make(item)?])
    }
    fn put(&mut self, item: Scanned<'_, M>) -> Result<()> {
        self.push(T::make(item)?);
        Ok(())
    }
}

/// A keyed collection receiving routed items.
pub trait MapTarget<M> {
    fn route(&mut self, key: Value, item: Scanned<'_, M>) -> Result<()>;
}

impl<M, K, V> MapTarget<M> for HashMap<K, V>
where
    K: AsValue + Eq + Hash,
    V: Slot<M>,
{
    fn route(&mut self, key: Value, item: Scanned<'_, M>) -> Result<()> {
        match self.entry(K::try_from_value(key)?) {
            hash_map::Entry::Occupied(mut entry) => entry.get_mut().put(item),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(V::make(item)?);
                Ok(())
            }
        }
    }
}

impl<M, K, V> MapTarget<M> for BTreeMap<K, V>
where
    K: AsValue + Ord,
    V: Slot<M>,
{
    fn route(&mut self, key: Value, item: Scanned<'_, M>) -> Result<()> {
        match self.entry(K::try_from_value(key)?) {
            btree_map::Entry::Occupied(mut entry) => entry.get_mut().put(item),
            btree_map::Entry::Vacant(entry) => {
                entry.insert(V::make(item)?);
                Ok(())
            }
        }
    }
}

/// A list receiving one keyed record per scanned value.
pub trait MapsTarget<M> {
    fn push_map(&mut self, entries: Vec<(String, Value)>) -> Result<()>;
}

impl<M, V: Slot<M>> MapsTarget<M> for Vec<HashMap<String, V>> {
    fn push_map(&mut self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut map = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key, V::make(Scanned::Field(value))?);
        }
        self.push(map);
        Ok(())
    }
}

impl<M, V: Slot<M>> MapsTarget<M> for Vec<BTreeMap<String, V>> {
    fn push_map(&mut self, entries: Vec<(String, Value)>) -> Result<()> {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            map.insert(key, V::make(Scanned::Field(value))?);
        }
        self.push(map);
        Ok(())
    }
}

/// Custom destination consuming every scanned value.
pub trait ScanTarget<M> {
    fn scan(&mut self, value: &M) -> Result<()>;
}

/// Where scanned rows go.
pub enum Dest<'d, M> {
    /// Overwritten by every row.
    Assign(&'d mut M),
    /// Collects every row.
    Append(&'d mut Vec<M>),
    Scanner(&'d mut (dyn ScanTarget<M> + Send)),
    Call(Box<dyn FnMut(M) -> Result<()> + Send + 'd>),
    /// Keyed by a field, pattern `key[:value]#options`. Without a value field
    /// the whole row is stored. Values are routed as they are unless options
    /// are given.
    Map(&'d mut (dyn MapTarget<M> + Send), Cow<'d, str>),
    /// One record per row, pattern `key[:field],key[:field]#options`. A key
    /// without a field takes the field of the same name.
    Maps(&'d mut (dyn MapsTarget<M> + Send), Cow<'d, str>),
    /// Receives one field, pattern `field#options`.
    Field(&'d mut (dyn Slot<M> + Send), Cow<'d, str>),
}

/// A set of destinations, usually derived with `#[derive(ScanDests)]`.
pub trait ScanDests<M> {
    fn dests(&mut self) -> Vec<Dest<'_, M>>;
}

impl<'d, M> Dest<'d, M> {
    pub fn assign(target: &'d mut M) -> Self {
        Dest::Assign(target)
    }
    pub fn append(target: &'d mut Vec<M>) -> Self {
        Dest::Append(target)
    }
    pub fn scanner(target: &'d mut (impl ScanTarget<M> + Send)) -> Self {
        Dest::Scanner(target)
    }
    pub fn call(f: impl FnMut(M) -> Result<()> + Send + 'd) -> Self {
        Dest::Call(Box::new(f))
    }
    pub fn map(
        target: &'d mut (impl MapTarget<M> + Send),
        pattern: impl Into<Cow<'d, str>>,
    ) -> Self {
        Dest::Map(target, pattern.into())
    }
    pub fn maps(
        target: &'d mut (impl MapsTarget<M> + Send),
        pattern: impl Into<Cow<'d, str>>,
    ) -> Self {
        Dest::Maps(target, pattern.into())
    }
    pub fn field(target: &'d mut (impl Slot<M> + Send), pattern: impl Into<Cow<'d, str>>) -> Self {
        Dest::Field(target, pattern.into())
    }
}

/// Which resolved values routing skips.
///
/// Field destinations skip both NULL and zero values unless the pattern says
/// otherwise, map destinations skip nothing without options. Unlike
/// [`Policy`](crate::Policy), a NULL also counts as a zero here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSkip {
    pub nil: bool,
    pub zero: bool,
}

impl Default for RouteSkip {
    fn default() -> Self {
        Self {
            nil: true,
            zero: true,
        }
    }
}

impl RouteSkip {
    pub const NONE: Self = Self {
        nil: false,
        zero: false,
    };

    pub fn parse(options: &str) -> Self {
        let (policy, _) = parse_options(options);
        Self {
            nil: !policy.nil,
            zero: !policy.zero,
        }
    }
    /// Map rule: nothing is skipped without options.
    pub fn parse_map(options: &str) -> Self {
        if options.trim().is_empty() {
            Self::NONE
        } else {
            Self::parse(options)
        }
    }
    pub fn skips(&self, value: &Value) -> bool {
        if value.is_null() {
            self.nil || self.zero
        } else {
            self.zero && value.is_zero()
        }
    }
}

impl Crud {
    /// Result columns expected for `v` and `filter`, in select order.
    pub fn scan_fields(&self, v: &dyn AsSubject, filter: &str) -> Vec<ScanField> {
        let mut fields = Vec::new();
        self.filter_field_call("scan", v, filter, |field| {
            fields.push(ScanField {
                name: field.name,
                func: field.func,
                def: field.def,
                index: field.index,
            });
        });
        fields
    }

    /// Write the values of `row` into `target`, column by column.
    pub fn assign_row<M: Model>(
        &self,
        target: &mut M,
        fields: &[ScanField],
        row: RowLabeled,
    ) -> Result<()> {
        if row.values.len() != fields.len() {
            return Err(Error::msg(format!(
                "The row has {} columns but {} fields are selected for scanning, use `#all` in the filter to scan zero values",
                row.values.len(),
                fields.len()
            )));
        }
        for (field, value) in fields.iter().zip(row.values.into_vec()) {
            let value = self.param("scan", &field.name, &field.func, field.def, value);
            target.assign(field.index, value).with_context(|| {
                format!(
                    "While assigning column `{}` to {}",
                    field.name,
                    any::type_name::<M>()
                )
            })?;
        }
        Ok(())
    }

    /// Resolve the field `key` of the scanned `value`.
    pub fn resolve<M: Model>(&self, value: &M, filter: &str, key: &str) -> Result<Value> {
        match value.subject() {
            Subject::Model(fields) => {
                let Some(index) = fields
                    .field_defs()
                    .iter()
                    .position(|v| v.column == key || v.ident == key)
                else {
                    return Err(Error::msg(format!("field {} is not exists", key)));
                };
                match fields.field(index) {
                    FieldRef::Value(v) => Ok(v),
                    FieldRef::Nested(..) => Err(Error::msg(format!(
                        "field {} is a nested group and cannot be routed",
                        key
                    ))),
                }
            }
            Subject::Meta(meta) => Filter::parse_chain(filter)
                .first()
                .and_then(|v| v.position(key))
                .and_then(|i| meta.get(i))
                .cloned()
                .ok_or_else(|| Error::msg(format!("field {} is not exists", key))),
            Subject::Scalar(..) => Err(Error::msg(format!("field {} is not struct", key))),
        }
    }

    /// Deliver one scanned value to every destination.
    pub fn route<M: Model>(&self, value: &M, filter: &str, dests: &mut [Dest<'_, M>]) -> Result<()> {
        if dests.is_empty() {
            return Err(Error::msg("scan dest is empty"));
        }
        for (i, dest) in dests.iter_mut().enumerate() {
            match dest {
                Dest::Assign(target) => **target = value.clone(),
                Dest::Append(target) => target.push(value.clone()),
                Dest::Scanner(target) => target
                    .scan(value)
                    .with_context(|| format!("While scanning into dests[{}]", i))?,
                Dest::Call(f) => f(value.clone())
                    .with_context(|| format!("While calling dests[{}]", i))?,
                Dest::Map(target, pattern) => {
                    let (fields, options) = split_pattern(i, pattern)?;
                    let skip = RouteSkip::parse_map(options);
                    let (key, field) = split_first(fields, ':');
                    let key = self.resolve(value, filter, key.trim())?;
                    let item = match field.map(str::trim) {
                        Some(field) if !field.is_empty() => {
                            let v = self.resolve(value, filter, field)?;
                            if skip.skips(&v) {
                                continue;
                            }
                            Scanned::Field(v)
                        }
                        _ => Scanned::Whole(value),
                    };
                    target.route(key, item).with_context(|| {
                        format!("not supported on dests[{}] to set `{}`", i, pattern)
                    })?;
                }
                Dest::Maps(target, pattern) => {
                    let (fields, options) = split_pattern(i, pattern)?;
                    let skip = RouteSkip::parse_map(options);
                    let mut entries = Vec::new();
                    for part in fields.split(',').map(str::trim).filter(|v| !v.is_empty()) {
                        let (key, field) = split_first(part, ':');
                        let key = key.trim();
                        let field = field.map(str::trim).filter(|v| !v.is_empty()).unwrap_or(key);
                        let v = self.resolve(value, filter, field)?;
                        if skip.skips(&v) {
                            continue;
                        }
                        entries.push((key.to_owned(), v));
                    }
                    target.push_map(entries).with_context(|| {
                        format!("not supported on dests[{}] to set `{}`", i, pattern)
                    })?;
                }
                Dest::Field(target, pattern) => {
                    let (field, options) = split_pattern(i, pattern)?;
                    let v = self.resolve(value, filter, field)?;
                    if RouteSkip::parse(options).skips(&v) {
                        continue;
                    }
                    target.put(Scanned::Field(v)).with_context(|| {
                        format!("not supported on dests[{}] to set `{}`", i, pattern)
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Scan every row into a fresh value shaped like `v` and route it. Stops
    /// at the first failing row, destinations keep what they already got.
    pub async fn scan<M: Model>(
        &self,
        rows: impl Stream<Item = Result<RowLabeled>>,
        v: &M,
        filter: &str,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        if dests.is_empty() {
            return Err(Error::msg("scan dest is empty"));
        }
        let fields = self.scan_fields(&v.new_like(), filter);
        let mut rows = pin!(rows);
        while let Some(row) = rows.next().await {
            let mut value = v.new_like();
            self.assign_row(&mut value, &fields, row?)?;
            self.route(&value, filter, dests)?;
        }
        Ok(())
    }

    /// [`Crud::scan`] for a single row.
    pub fn scan_row<M: Model>(
        &self,
        row: RowLabeled,
        v: &M,
        filter: &str,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        if dests.is_empty() {
            return Err(Error::msg("scan dest is empty"));
        }
        let mut value = v.new_like();
        let fields = self.scan_fields(&value, filter);
        self.assign_row(&mut value, &fields, row)?;
        self.route(&value, filter, dests)
    }
}

fn split_pattern(index: usize, pattern: &str) -> Result<(&str, &str)> {
    let (fields, options) = split_first(pattern, '#');
    let fields = fields.trim();
    if fields.is_empty() {
        return Err(Error::msg(format!("dest[{}] pattern is empty", index)));
    }
    Ok((fields, options.unwrap_or_default()))
}
