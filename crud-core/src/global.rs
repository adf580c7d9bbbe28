use crate::{AsSubject, Dest, Meta, Model, Page, Queryer, Result, Unify, Value, shared};

pub fn table(v: &dyn AsSubject) -> String {
    shared().table(v)
}

pub fn meta_with(model: &dyn AsSubject, values: Vec<Value>) -> Meta {
    shared().meta_with(model, values)
}

pub fn filter_where(args: &mut Vec<Value>, v: &dyn AsSubject, filter: &str) -> Vec<String> {
    shared().filter_where(args, v, filter)
}

pub fn join_where(sql: &str, where_: &[String], sep: &str, suffix: &[&str]) -> String {
    shared().join_where(sql, where_, sep, suffix)
}

pub fn join_page(sql: &str, orderby: &str, offset: i64, limit: i64) -> String {
    shared().join_page(sql, orderby, offset, limit)
}

pub fn insert_sql(v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> (String, Vec<Value>) {
    shared().insert_sql(v, filter, suffix)
}

pub fn update_sql(v: &dyn AsSubject, filter: &str, args: &mut Vec<Value>, suffix: &[&str]) -> String {
    shared().update_sql(v, filter, args, suffix)
}

pub fn query_sql(v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> String {
    shared().query_sql(v, filter, suffix)
}

pub fn count_sql(v: &dyn AsSubject, filter: &str, suffix: &[&str]) -> String {
    shared().count_sql(v, filter, suffix)
}

pub async fn insert_filter<M: Model>(
    q: &mut impl Queryer,
    v: &mut M,
    filter: &str,
    join: &str,
    scan: &str,
) -> Result<Option<i64>> {
    shared().insert_filter(q, v, filter, join, scan).await
}

pub async fn update_filter(
    q: &mut impl Queryer,
    v: &dyn AsSubject,
    filter: &str,
    where_: &[String],
    sep: &str,
    args: Vec<Value>,
) -> Result<u64> {
    shared().update_filter(q, v, filter, where_, sep, args).await
}

pub async fn update_row_filter(
    q: &mut impl Queryer,
    v: &dyn AsSubject,
    filter: &str,
    where_: &[String],
    sep: &str,
    args: Vec<Value>,
) -> Result<()> {
    shared()
        .update_row_filter(q, v, filter, where_, sep, args)
        .await
}

pub async fn update_wheref(
    q: &mut impl Queryer,
    v: &dyn AsSubject,
    filter: &str,
    formats: &str,
    values: Vec<Value>,
) -> Result<u64> {
    shared().update_wheref(q, v, filter, formats, values).await
}

#[allow(clippy::too_many_arguments)]
pub async fn query_filter<M: Model>(
    q: &mut impl Queryer,
    v: &M,
    filter: &str,
    where_: &[String],
    sep: &str,
    args: &[Value],
    page: &Page,
    dests: &mut [Dest<'_, M>],
) -> Result<()> {
    shared()
        .query_filter(q, v, filter, where_, sep, args, page, dests)
        .await
}

pub async fn query_wheref<M: Model>(
    q: &mut impl Queryer,
    v: &M,
    filter: &str,
    formats: &str,
    values: Vec<Value>,
    page: &Page,
    dests: &mut [Dest<'_, M>],
) -> Result<()> {
    shared()
        .query_wheref(q, v, filter, formats, values, page, dests)
        .await
}

pub async fn query_row_filter<M: Model>(
    q: &mut impl Queryer,
    v: &M,
    filter: &str,
    where_: &[String],
    sep: &str,
    args: &[Value],
    dests: &mut [Dest<'_, M>],
) -> Result<()> {
    shared()
        .query_row_filter(q, v, filter, where_, sep, args, dests)
        .await
}

pub async fn query_row_wheref<M: Model>(
    q: &mut impl Queryer,
    v: &M,
    filter: &str,
    formats: &str,
    values: Vec<Value>,
    dests: &mut [Dest<'_, M>],
) -> Result<()> {
    shared()
        .query_row_wheref(q, v, filter, formats, values, dests)
        .await
}

pub async fn count_wheref<M: Model>(
    q: &mut impl Queryer,
    v: &M,
    filter: &str,
    formats: &str,
    values: Vec<Value>,
    suffix: &str,
    dests: &mut [Dest<'_, M>],
) -> Result<()> {
    shared()
        .count_wheref(q, v, filter, formats, values, suffix, dests)
        .await
}

pub async fn apply_unify<U: Unify>(q: &mut impl Queryer, u: &mut U, enabled: &[&str]) -> Result<()> {
    shared().apply_unify(q, u, enabled).await
}
