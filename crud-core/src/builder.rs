use crate::{
    AsSubject, Crud, FieldRef, Filter, Subject, Value, parse_options, push_suffix, truncate_long,
    util::split_first, verbose,
};
use std::borrow::Cow;

/// Columns and placeholders of an INSERT statement, aligned by index.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct InsertArgs {
    pub table: String,
    pub fields: Vec<String>,
    pub params: Vec<String>,
}

/// Ordering and window of a paginated query.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Complete ordering clause, for example `order by id desc`.
    pub order: String,
    /// Used when `order` is empty.
    pub default_order: Cow<'static, str>,
    pub offset: i64,
    /// Non positive means unlimited.
    pub limit: i64,
}

impl Page {
    pub fn new(order: impl Into<String>, offset: i64, limit: i64) -> Self {
        Self {
            order: order.into(),
            default_order: Cow::Borrowed(""),
            offset,
            limit,
        }
    }
    pub fn with_default_order(mut self, order: impl Into<Cow<'static, str>>) -> Self {
        self.default_order = order.into();
        self
    }
    pub fn effective_order(&self) -> &str {
        if self.order.is_empty() {
            &self.default_order
        } else {
            &self.order
        }
    }
}

/// Turn a `+key` / `-key` request into `order by key asc|desc`, provided
/// `key` is one of the comma separated `supported` columns. Any other key
/// yields an empty string.
pub fn build_orderby(supported: &str, order: &str) -> String {
    let mut chars = order.chars();
    let Some(direction) = chars.next() else {
        return String::new();
    };
    let key = chars.as_str();
    if key.is_empty() || !supported.split(',').map(str::trim).any(|v| v == key) {
        return String::new();
    }
    let mut result = format!("order by {}", key);
    match direction {
        '+' => result.push_str(" asc"),
        '-' => result.push_str(" desc"),
        _ => {}
    }
    result
}

impl Crud {
    /// The placeholder for the 1 based argument `index`.
    pub fn placeholder(&self, index: usize) -> String {
        let mut buffer = itoa::Buffer::new();
        self.arg_format.replace("%v", buffer.format(index))
    }

    /// Replace every placeholder token of `template` with the placeholder of
    /// argument `index`.
    pub fn sprintf(&self, template: &str, index: usize) -> String {
        template.replace(self.arg_format.as_ref(), &self.placeholder(index))
    }

    /// Walk a `format,format#options` list in lockstep with `args`, calling
    /// `call` for every argument admitted by the options.
    ///
    /// # Panics
    /// When the number of formats differs from the number of arguments.
    pub fn filter_format_call(
        &self,
        formats: &str,
        args: Vec<Value>,
        mut call: impl FnMut(&str, Value),
    ) {
        let (formats, options) = split_first(formats, '#');
        let (policy, _) = parse_options(options.unwrap_or_default());
        let formats: Vec<&str> = if formats.trim().is_empty() {
            Vec::new()
        } else {
            formats.split(',').map(str::trim).collect()
        };
        if formats.len() != args.len() {
            panic!(
                "count formats={} is not equal to args={}",
                formats.len(),
                args.len()
            );
        }
        for (format, arg) in formats.into_iter().zip(args) {
            if policy.admits(&arg, false) {
                call(format, arg);
            }
        }
    }

    /// Predicates for the fields of `v` selected by `filter`, appending their
    /// arguments to `args`.
    pub fn filter_where(
        &self,
        args: &mut Vec<Value>,
        v: &dyn AsSubject,
        filter: &str,
    ) -> Vec<String> {
        self.subject_where(args, v.subject(), filter)
    }

    fn subject_where(&self, args: &mut Vec<Value>, subject: Subject<'_>, filter: &str) -> Vec<String> {
        let mut result = Vec::new();
        self.subject_field_call("where", subject, filter, |field| {
            let def = field.def;
            match field.value {
                FieldRef::Nested(nested) => {
                    let (filter, join) = def.map(|v| (v.filter, v.join)).unwrap_or_default();
                    let inner = self.subject_where(args, Subject::Model(nested), filter);
                    if !inner.is_empty() {
                        let join = if join.is_empty() { "and" } else { join };
                        result.push(format!("({})", inner.join(&format!(" {} ", join))));
                    }
                }
                FieldRef::Value(value) => {
                    let cmp = def.map(|v| v.cmp).unwrap_or_default();
                    if cmp == "-" {
                        return;
                    }
                    let mut cmp = if cmp.is_empty() {
                        format!("{} = {}", field.name, self.arg_format)
                    } else {
                        cmp.to_owned()
                    };
                    if !cmp.contains(self.arg_format.as_ref()) {
                        cmp.push(' ');
                        cmp.push_str(&self.arg_format);
                    }
                    if (cmp.contains(" or ") || cmp.contains(" and ")) && !cmp.starts_with('(') {
                        cmp = format!("({})", cmp);
                    }
                    args.push(self.param("where", &field.name, &field.func, def, value));
                    result.push(self.sprintf(&cmp, args.len()));
                }
            }
        });
        result
    }

    /// Append `field` / placeholder for `format` (`column=$%v`) when `ok`.
    pub fn append_insert(
        &self,
        fields: &mut Vec<String>,
        params: &mut Vec<String>,
        args: &mut Vec<Value>,
        ok: bool,
        format: &str,
        value: impl Into<Value>,
    ) {
        if ok {
            self.push_insert(fields, params, args, format, value.into());
        }
    }

    /// [`Crud::append_insert`] for every admitted `format`/value pair.
    pub fn append_insertf(
        &self,
        fields: &mut Vec<String>,
        params: &mut Vec<String>,
        args: &mut Vec<Value>,
        formats: &str,
        values: Vec<Value>,
    ) {
        self.filter_format_call(formats, values, |format, value| {
            self.push_insert(fields, params, args, format, value)
        });
    }

    fn push_insert(
        &self,
        fields: &mut Vec<String>,
        params: &mut Vec<String>,
        args: &mut Vec<Value>,
        format: &str,
        value: Value,
    ) {
        args.push(self.param("insert", format, "", None, value));
        let (field, param) = split_first(format, '=');
        fields.push(field.trim().to_owned());
        params.push(self.sprintf(param.unwrap_or(&self.arg_format).trim(), args.len()));
    }

    /// Push the converted `value` and the formatted clause, `on` names the
    /// statement part for the parameter conversion.
    fn push_format(
        &self,
        on: &str,
        list: &mut Vec<String>,
        args: &mut Vec<Value>,
        format: &str,
        value: Value,
    ) {
        args.push(self.param(on, format, "", None, value));
        list.push(self.sprintf(format, args.len()));
    }

    /// Append the `format` (`column=$%v`) assignment when `ok`.
    pub fn append_set(
        &self,
        sets: &mut Vec<String>,
        args: &mut Vec<Value>,
        ok: bool,
        format: &str,
        value: impl Into<Value>,
    ) {
        if ok {
            self.push_format("update", sets, args, format, value.into());
        }
    }

    pub fn append_setf(
        &self,
        sets: &mut Vec<String>,
        args: &mut Vec<Value>,
        formats: &str,
        values: Vec<Value>,
    ) {
        self.filter_format_call(formats, values, |format, value| {
            self.push_format("update", sets, args, format, value)
        });
    }

    /// Append the `format` (`column > $%v`) predicate when `ok`.
    pub fn append_where(
        &self,
        where_: &mut Vec<String>,
        args: &mut Vec<Value>,
        ok: bool,
        format: &str,
        value: impl Into<Value>,
    ) {
        if ok {
            self.push_format("where", where_, args, format, value.into());
        }
    }

    pub fn append_wheref(
        &self,
        where_: &mut Vec<String>,
        args: &mut Vec<Value>,
        formats: &str,
        values: Vec<Value>,
    ) {
        self.filter_format_call(formats, values, |format, value| {
            self.push_format("where", where_, args, format, value)
        });
    }

    /// `sql where p1 sep p2 ... suffix`, `sep` defaults to `and`.
    pub fn join_where(&self, sql: &str, where_: &[String], sep: &str, suffix: &[&str]) -> String {
        let mut result = sql.to_owned();
        if !where_.is_empty() {
            let sep = match sep.trim() {
                "" => "and",
                v => v,
            };
            result.push_str(" where ");
            result.push_str(&where_.join(&format!(" {} ", sep)));
        }
        push_suffix(&mut result, suffix);
        verbose!(self, "crud join where done with sql: {}", truncate_long!(result));
        result
    }

    /// [`Crud::join_where`] with predicates built from a format list. A
    /// `+sep` option selects the separator (`a=$%v,b=$%v#+or`).
    pub fn join_wheref(
        &self,
        sql: &str,
        args: &mut Vec<Value>,
        formats: &str,
        values: Vec<Value>,
    ) -> String {
        if formats.is_empty() {
            return sql.to_owned();
        }
        let (_, options) = split_first(formats, '#');
        let (_, separator) = parse_options(options.unwrap_or_default());
        let mut where_ = Vec::new();
        self.append_wheref(&mut where_, args, formats, values);
        self.join_where(sql, &where_, separator.unwrap_or("and"), &[])
    }

    /// Append ordering and window. The ordering is kept only when a window is
    /// requested (`offset >= 0` or `limit > 0`), `limit .. offset ..` only when
    /// `limit > 0`.
    pub fn join_page(&self, sql: &str, orderby: &str, offset: i64, limit: i64) -> String {
        let mut result = sql.to_owned();
        if !orderby.is_empty() && (offset >= 0 || limit > 0) {
            result.push(' ');
            result.push_str(orderby);
        }
        if limit > 0 {
            let mut buffer = itoa::Buffer::new();
            result.push_str(" limit ");
            result.push_str(buffer.format(limit));
            result.push_str(" offset ");
            result.push_str(buffer.format(offset));
        }
        verbose!(self, "crud join page done with sql: {}", truncate_long!(result));
        result
    }

    pub(crate) fn join_page_of(&self, sql: &str, page: &Page) -> String {
        self.join_page(sql, page.effective_order(), page.offset, page.limit)
    }

    /// Columns and placeholders for inserting `v`, appending the values to
    /// `args`.
    pub fn insert_args(&self, v: &dyn AsSubject, filter: &str, args: &mut Vec<Value>) -> InsertArgs {
        let mut fields = Vec::new();
        let mut params = Vec::new();
        let table = self.filter_field_call("insert", v, filter, |field| {
            let name = field.name.clone();
            let func = field.func.clone();
            let def = field.def;
            let value = field.expect_value("insert");
            args.push(self.param("insert", &name, &func, def, value));
            fields.push(name);
            params.push(self.placeholder(args.len()));
        });
        InsertArgs {
            table,
            fields,
            params,
        }
    }

    /// `insert into table(columns) values(placeholders) suffix`.
    pub fn insert_sql(&self, v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> (String, Vec<Value>) {
        let mut args = Vec::new();
        let InsertArgs {
            table,
            fields,
            params,
        } = self.insert_args(v, filter, &mut args);
        let mut sql = format!(
            "insert into {}({}) values({})",
            table,
            fields.join(","),
            params.join(",")
        );
        push_suffix(&mut sql, suffix);
        verbose!(
            self,
            "crud generate insert sql with filter `{}`: {}",
            filter,
            truncate_long!(sql)
        );
        (sql, args)
    }

    /// Table and `column=placeholder` assignments for `v`.
    pub fn update_args(
        &self,
        v: &dyn AsSubject,
        filter: &str,
        args: &mut Vec<Value>,
    ) -> (String, Vec<String>) {
        let mut sets = Vec::new();
        let table = self.filter_field_call("update", v, filter, |field| {
            let name = field.name.clone();
            let func = field.func.clone();
            let def = field.def;
            let value = field.expect_value("update");
            args.push(self.param("update", &name, &func, def, value));
            sets.push(format!("{}={}", name, self.placeholder(args.len())));
        });
        (table, sets)
    }

    /// `update table set assignments suffix`, the values are appended to
    /// `args` after the ones already there.
    pub fn update_sql(
        &self,
        v: &dyn AsSubject,
        filter: &str,
        args: &mut Vec<Value>,
        suffix: &[&str],
    ) -> String {
        let (table, sets) = self.update_args(v, filter, args);
        let mut sql = format!("update {} set {}", table, sets.join(","));
        push_suffix(&mut sql, suffix);
        verbose!(
            self,
            "crud generate update sql with filter `{}`: {}",
            filter,
            truncate_long!(sql)
        );
        sql
    }

    /// Table and select list for `v`: `func(column conv)` or `column conv`.
    pub fn query_field(&self, v: &dyn AsSubject, filter: &str) -> (String, Vec<String>) {
        let mut fields = Vec::new();
        let table = self.filter_field_call("query", v, filter, |field| {
            if let FieldRef::Nested(..) = field.value {
                panic!(
                    "field `{}` is a nested group and cannot be used by query",
                    field.name
                );
            }
            let conv = field.def.map(|v| v.conv).unwrap_or_default();
            fields.push(if field.func.is_empty() {
                format!("{}{}", field.name, conv)
            } else {
                format!("{}({}{})", field.func, field.name, conv)
            });
        });
        (table, fields)
    }

    /// `select columns from table suffix`.
    pub fn query_sql(&self, v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> String {
        self.query_sql_from(v, "", filter, suffix)
    }

    /// [`Crud::query_sql`] reading from `from` instead of the table of `v`
    /// when not empty.
    pub fn query_sql_from(
        &self,
        v: &dyn AsSubject,
        from: &str,
        filter: &str,
        suffix: &[&str],
    ) -> String {
        let (table, fields) = self.query_field(v, filter);
        let table = if from.is_empty() { table } else { from.to_owned() };
        let mut sql = format!("select {} from {}", fields.join(","), table);
        push_suffix(&mut sql, suffix);
        verbose!(
            self,
            "crud generate query sql with filter `{}`: {}",
            filter,
            truncate_long!(sql)
        );
        sql
    }

    /// `select count(*) from table` for an empty or count filter, otherwise
    /// the select list of the filter.
    pub fn count_sql(&self, v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> String {
        self.count_sql_from(v, "", filter, suffix)
    }

    pub fn count_sql_from(
        &self,
        v: &dyn AsSubject,
        from: &str,
        filter: &str,
        suffix: &[&str],
    ) -> String {
        let (table, fields) = if Filter::is_count(filter) {
            (self.table(v), vec!["count(*)".to_owned()])
        } else {
            self.query_field(v, filter)
        };
        let table = if from.is_empty() { table } else { from.to_owned() };
        let mut sql = format!("select {} from {}", fields.join(","), table);
        push_suffix(&mut sql, suffix);
        verbose!(
            self,
            "crud generate count sql with filter `{}`: {}",
            filter,
            truncate_long!(sql)
        );
        sql
    }
}
