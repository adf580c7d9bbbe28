use crate::{AsSubject, Crud, FieldDef, FieldRef, Fields, Filter, Meta, Subject, Value};
use std::collections::HashSet;

/// A field selected by a filter, in the order it is emitted.
pub struct FieldCall<'a> {
    /// Column name, qualified by the filter alias.
    pub name: String,
    /// SQL function wrapping the column, empty when none.
    pub func: String,
    /// Descriptor, absent for meta and scalar subjects.
    pub def: Option<&'static FieldDef>,
    /// Position inside the subject, used to assign scanned values.
    pub index: usize,
    pub value: FieldRef<'a>,
}

impl<'a> FieldCall<'a> {
    /// The plain value, panics on a nested group.
    pub fn expect_value(self, on: &str) -> Value {
        match self.value {
            FieldRef::Value(v) => v,
            FieldRef::Nested(..) => panic!(
                "field `{}` is a nested group and cannot be used by {}",
                self.name, on
            ),
        }
    }
}

impl Crud {
    /// Table name of `v`, including the configured prefix.
    pub fn table(&self, v: &dyn AsSubject) -> String {
        match v.subject() {
            Subject::Model(fields) => self.prefixed(&fields.table()),
            Subject::Meta(meta) => self.prefixed(&meta.table),
            Subject::Scalar(..) => String::new(),
        }
    }

    /// Build a [`Meta`] for `model` (or any subject naming a table) with the
    /// given positional values.
    pub fn meta_with(&self, model: &dyn AsSubject, values: Vec<Value>) -> Meta {
        let table = match model.subject() {
            Subject::Model(fields) => fields.table().into_owned(),
            Subject::Meta(meta) => meta.table.clone(),
            Subject::Scalar(..) => String::new(),
        };
        Meta::new(table, values)
    }

    fn prefixed(&self, table: &str) -> String {
        if table.is_empty() {
            return String::new();
        }
        let mut result = String::with_capacity(self.table_prefix.len() + table.len());
        result.push_str(&self.table_prefix);
        result.push_str(table);
        result
    }

    /// Walk the fields of `v` selected by `filter`, calling `call` once per
    /// emitted field, and return the table reference (with alias).
    ///
    /// `filter` may be a `|` chain: every filter of the chain is applied in
    /// order and a field already emitted by an earlier one is skipped. The
    /// table comes from the first filter.
    ///
    /// # Panics
    /// When a filter names a field `v` does not have, or a meta subject has
    /// more values than its filter has entries.
    pub fn filter_field_call<'v>(
        &self,
        on: &str,
        v: &'v dyn AsSubject,
        filter: &str,
        call: impl FnMut(FieldCall<'v>),
    ) -> String {
        self.subject_field_call(on, v.subject(), filter, call)
    }

    /// [`Crud::filter_field_call`] on an already resolved subject, used to
    /// descend into nested groups.
    pub fn subject_field_call<'v>(
        &self,
        on: &str,
        subject: Subject<'v>,
        filter: &str,
        mut call: impl FnMut(FieldCall<'v>),
    ) -> String {
        let mut table = None;
        let mut called = HashSet::new();
        for filter in Filter::parse_chain(filter) {
            let current = self.filter_field_once(on, &subject, &filter, &mut |field: FieldCall<'v>| {
                if called.insert(field.name.clone()) {
                    call(field);
                }
            });
            table.get_or_insert(current);
        }
        table.unwrap_or_default()
    }

    fn filter_field_once<'v>(
        &self,
        on: &str,
        subject: &Subject<'v>,
        filter: &Filter<'_>,
        call: &mut dyn FnMut(FieldCall<'v>),
    ) -> String {
        match subject {
            Subject::Model(fields) => self.model_fields(on, *fields, filter, call),
            Subject::Meta(meta) => {
                for (index, value) in meta.values.iter().enumerate() {
                    let Some(selector) = filter.selectors.get(index) else {
                        panic!("meta v[{}] is not found on filter", index);
                    };
                    call(FieldCall {
                        name: filter.qualify(selector.name),
                        func: selector.func.to_owned(),
                        def: None,
                        index,
                        value: FieldRef::Value(value.clone()),
                    });
                }
                with_alias(self.prefixed(&meta.table), filter.alias)
            }
            Subject::Scalar(value) => {
                let (name, func) = filter
                    .selectors
                    .first()
                    .map(|v| (v.name, v.func))
                    .unwrap_or_default();
                call(FieldCall {
                    name: filter.qualify(name),
                    func: func.to_owned(),
                    def: None,
                    index: 0,
                    value: FieldRef::Value(value.clone()),
                });
                String::new()
            }
        }
    }

    fn model_fields<'v>(
        &self,
        on: &str,
        fields: &'v dyn Fields,
        filter: &Filter<'_>,
        call: &mut dyn FnMut(FieldCall<'v>),
    ) -> String {
        let table = with_alias(self.prefixed(&fields.table()), filter.alias);
        let mut found = vec![false; filter.selectors.len()];
        for (index, def) in fields.field_defs().iter().enumerate() {
            let column = self.column_name(on, def);
            if let Some(i) = filter.position(&column) {
                found[i] = true;
            }
            let Some(func) = filter.select(&column) else {
                continue;
            };
            let value = fields.field(index);
            let admitted = match &value {
                FieldRef::Value(v) => filter.policy.admits(v, def.nullable),
                FieldRef::Nested(nested) => filter.policy.zero || !nested.is_zero(),
            };
            if !admitted {
                continue;
            }
            call(FieldCall {
                name: filter.qualify(&column),
                func: func.to_owned(),
                def: Some(def),
                index,
                value,
            });
        }
        if !filter.exclude {
            if let Some(i) = found.iter().position(|v| !v) {
                panic!(
                    "field `{}` is not found on `{}`",
                    filter.selectors[i].name, table
                );
            }
        }
        table
    }
}

fn with_alias(table: String, alias: &str) -> String {
    if alias.is_empty() {
        table
    } else {
        format!("{} {}", table, alias)
    }
}
