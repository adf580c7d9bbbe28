use crate::{
    AsSubject, Crud, Dest, Error, Filter, Meta, Model, Page, Queryer, Result, Value, push_suffix,
    truncate_long, verbose,
};
use std::borrow::Cow;

pub const QUERY: &str = "Query";
pub const QUERY_ROW: &str = "QueryRow";
pub const COUNT: &str = "Count";

const COUNT_ALL: &str = "count(*)#all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Every row goes to the query destinations.
    Query,
    /// The first row goes to the query destinations.
    QueryRow,
    /// A single counting row goes to the count destinations.
    Count,
}

/// Shape of one statement of a unified query.
#[derive(Debug, Clone)]
pub struct Target<'a> {
    pub kind: TargetKind,
    pub filter: Cow<'a, str>,
    /// Replaces the table (or the model level `from`).
    pub from: Cow<'a, str>,
    /// Replaces the whole select head, `%v` receives the selected columns.
    pub select: Cow<'a, str>,
    /// Appended after the WHERE clause, for example `group by tid`.
    pub group: Cow<'a, str>,
    pub enabled: bool,
    /// Run by [`Crud::apply_unify`] only when named.
    pub explicit: bool,
}

impl<'a> Target<'a> {
    pub fn new(kind: TargetKind, filter: impl Into<Cow<'a, str>>) -> Self {
        Self {
            kind,
            filter: filter.into(),
            from: Cow::Borrowed(""),
            select: Cow::Borrowed(""),
            group: Cow::Borrowed(""),
            enabled: true,
            explicit: false,
        }
    }
    pub fn with_from(mut self, from: impl Into<Cow<'a, str>>) -> Self {
        self.from = from.into();
        self
    }
    pub fn with_select(mut self, select: impl Into<Cow<'a, str>>) -> Self {
        self.select = select.into();
        self
    }
    pub fn with_group(mut self, group: impl Into<Cow<'a, str>>) -> Self {
        self.group = group.into();
        self
    }
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
    pub fn explicit(mut self) -> Self {
        self.explicit = true;
        self
    }
}

/// The predicates of a unified query: the fields of `subject` selected by
/// `filter`, joined by `join`.
pub struct WhereGroup<'a> {
    pub subject: &'a dyn AsSubject,
    pub filter: Cow<'a, str>,
    pub join: Cow<'a, str>,
}

impl<'a> WhereGroup<'a> {
    pub fn new(subject: &'a dyn AsSubject, filter: impl Into<Cow<'a, str>>) -> Self {
        Self {
            subject,
            filter: filter.into(),
            join: Cow::Borrowed("and"),
        }
    }
    pub fn with_join(mut self, join: impl Into<Cow<'a, str>>) -> Self {
        self.join = join.into();
        self
    }
}

/// A search request bundling the model, its predicates, the page and the
/// statements to run with their destinations.
///
/// ```ignore
/// struct UserSearch {
///     model: User,
///     filter: UserWhere,
///     page: Page,
///     users: Vec<User>,
///     total: i64,
/// }
///
/// impl Unify for UserSearch {
///     type Model = User;
///     fn model(&self) -> &User {
///         &self.model
///     }
///     fn where_group(&self) -> Option<WhereGroup<'_>> {
///         Some(WhereGroup::new(&self.filter, "").with_join("and"))
///     }
///     fn page(&self) -> Option<Page> {
///         Some(self.page.clone())
///     }
///     fn target(&self, name: &str) -> Option<Target<'_>> {
///         match name {
///             QUERY => Some(Target::new(TargetKind::Query, "#all")),
///             COUNT => Some(Target::new(TargetKind::Count, "count(*)#all")),
///             _ => None,
///         }
///     }
///     fn query_dests(&mut self, _: &str) -> Vec<Dest<'_, User>> {
///         vec![Dest::append(&mut self.users)]
///     }
///     fn count_dests(&mut self, _: &str) -> Vec<Dest<'_, Meta>> {
///         vec![Dest::field(&mut self.total, "*")]
///     }
/// }
/// ```
pub trait Unify {
    type Model: Model;

    fn model(&self) -> &Self::Model;
    /// Default source of every target, the table of the model when empty.
    fn model_from(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
    fn where_group(&self) -> Option<WhereGroup<'_>> {
        None
    }
    fn page(&self) -> Option<Page> {
        None
    }
    /// Names considered by [`Crud::apply_unify`], in execution order.
    fn targets(&self) -> Vec<&'static str> {
        vec![QUERY, QUERY_ROW, COUNT]
    }
    fn target(&self, name: &str) -> Option<Target<'_>>;
    fn query_dests(&mut self, name: &str) -> Vec<Dest<'_, Self::Model>>;
    fn count_dests(&mut self, _name: &str) -> Vec<Dest<'_, Meta>> {
        Vec::new()
    }
}

fn unify_target<'u, U: Unify>(u: &'u U, name: &str) -> Result<Target<'u>> {
    u.target(name)
        .ok_or_else(|| Error::msg(format!("unify target {} is not found", name)))
}

fn count_filter(filter: &str) -> &str {
    if Filter::is_count(filter) {
        COUNT_ALL
    } else {
        filter
    }
}

impl Crud {
    /// Complete `sql` with the predicates of the where group of `u`.
    pub fn join_where_unify(&self, sql: &str, args: &mut Vec<Value>, u: &impl Unify) -> String {
        match u.where_group() {
            Some(group) => {
                let where_ = self.filter_where(args, group.subject, &group.filter);
                self.join_where(sql, &where_, &group.join, &[])
            }
            None => sql.to_owned(),
        }
    }

    pub fn join_page_unify(&self, sql: &str, u: &impl Unify) -> String {
        match u.page() {
            Some(page) => self.join_page_of(sql, &page),
            None => sql.to_owned(),
        }
    }

    /// Statement and arguments of the query target `name`.
    pub fn query_unify_sql<U: Unify>(&self, u: &U, name: &str) -> Result<(String, Vec<Value>)> {
        let target = unify_target(u, name)?;
        let model = u.model();
        let from = if target.from.is_empty() {
            u.model_from()
        } else {
            target.from.clone()
        };
        let sql = self.select_head(model, &from, &target, &target.filter, false);
        let mut args = Vec::new();
        let mut sql = self.join_where_unify(&sql, &mut args, u);
        push_suffix(&mut sql, &[target.group.as_ref()]);
        let sql = self.join_page_unify(&sql, u);
        verbose!(
            self,
            "crud unify {} sql: {} with args: {:?}",
            name,
            truncate_long!(sql),
            args
        );
        Ok((sql, args))
    }

    /// Statement and arguments of the count target `name`.
    pub fn count_unify_sql<U: Unify>(&self, u: &U, name: &str) -> Result<(String, Vec<Value>)> {
        let target = unify_target(u, name)?;
        let filter = count_filter(&target.filter);
        let meta = self.count_meta(u.model(), filter);
        let from = if target.from.is_empty() {
            u.model_from()
        } else {
            target.from.clone()
        };
        let sql = self.select_head(&meta, &from, &target, filter, true);
        let mut args = Vec::new();
        let mut sql = self.join_where_unify(&sql, &mut args, u);
        push_suffix(&mut sql, &[target.group.as_ref()]);
        verbose!(
            self,
            "crud unify {} sql: {} with args: {:?}",
            name,
            truncate_long!(sql),
            args
        );
        Ok((sql, args))
    }

    fn select_head(
        &self,
        v: &dyn AsSubject,
        from: &str,
        target: &Target<'_>,
        filter: &str,
        count: bool,
    ) -> String {
        if target.select.is_empty() {
            return if count {
                self.count_sql_from(v, from, filter, &[])
            } else {
                self.query_sql_from(v, from, filter, &[])
            };
        }
        if target.select.contains("%v") {
            let (_, fields) = self.query_field(v, filter);
            target.select.replace("%v", &fields.join(","))
        } else {
            target.select.to_string()
        }
    }

    /// The meta a count target scans into, one slot per counted column.
    fn count_meta(&self, model: &dyn AsSubject, filter: &str) -> Meta {
        let count = Filter::parse_chain(filter)
            .first()
            .map(|v| v.selectors.len())
            .unwrap_or_default();
        self.meta_with(model, vec![Value::Null; count])
    }

    /// Run the query target `name` into its destinations.
    pub async fn query_unify<U: Unify>(&self, q: &mut impl Queryer, u: &mut U, name: &str) -> Result<()> {
        let (sql, args) = self.query_unify_sql(u, name)?;
        let filter = unify_target(u, name)?.filter.into_owned();
        let model = u.model().clone();
        let mut dests = u.query_dests(name);
        self.query(q, &model, &filter, &sql, &args, &mut dests).await
    }

    pub async fn query_row_unify<U: Unify>(
        &self,
        q: &mut impl Queryer,
        u: &mut U,
        name: &str,
    ) -> Result<()> {
        let (sql, args) = self.query_unify_sql(u, name)?;
        let filter = unify_target(u, name)?.filter.into_owned();
        let model = u.model().clone();
        let mut dests = u.query_dests(name);
        self.query_row(q, &model, &filter, &sql, &args, &mut dests)
            .await
    }

    pub async fn count_unify<U: Unify>(&self, q: &mut impl Queryer, u: &mut U, name: &str) -> Result<()> {
        let (sql, args) = self.count_unify_sql(u, name)?;
        let filter = count_filter(&unify_target(u, name)?.filter).to_owned();
        let meta = self.count_meta(u.model(), &filter);
        let mut dests = u.count_dests(name);
        self.count(q, &meta, &filter, &sql, &args, &mut dests).await
    }

    /// Run the enabled targets of `u`. An empty `enabled` runs every target
    /// that is not explicit, otherwise only the named ones run.
    pub async fn apply_unify<U: Unify>(
        &self,
        q: &mut impl Queryer,
        u: &mut U,
        enabled: &[&str],
    ) -> Result<()> {
        for name in u.targets() {
            let (kind, active, explicit) = match u.target(name) {
                Some(target) => (target.kind, target.enabled, target.explicit),
                None => continue,
            };
            if !active
                || (enabled.is_empty() && explicit)
                || (!enabled.is_empty() && !enabled.contains(&name))
            {
                continue;
            }
            match kind {
                TargetKind::Query => self.query_unify(q, u, name).await?,
                TargetKind::QueryRow => self.query_row_unify(q, u, name).await?,
                TargetKind::Count => self.count_unify(q, u, name).await?,
            }
        }
        Ok(())
    }
}
