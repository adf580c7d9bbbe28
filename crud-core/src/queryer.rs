use crate::{
    Error, NoRows, Result, Value,
    stream::{Stream, StreamExt},
};
use std::{future::Future, pin::pin, sync::Arc};

/// Outcome of a statement that modifies rows.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowsAffected {
    /// Total number of rows impacted.
    pub rows_affected: u64,
    /// Backend-specific last inserted / affected identifier when available.
    pub last_affected_id: Option<i64>,
}

/// Shared reference-counted column name list.
pub type RowNames = Arc<[String]>;
/// Owned row value slice matching `RowNames` length.
pub type Row = Box<[Value]>;

/// A result row with its corresponding column labels.
#[derive(Debug, Clone, PartialEq)]
pub struct RowLabeled {
    /// Column names.
    pub labels: RowNames,
    /// Data values (aligned by index with `labels`).
    pub values: Row,
}

impl RowLabeled {
    pub fn new(names: RowNames, values: Row) -> Self {
        Self {
            labels: names,
            values,
        }
    }
}

/// Execution contract the generated statements run against.
///
/// Implement it for a driver connection, a pool handle or a transaction. The
/// statement text uses the placeholder style configured on the
/// [`Crud`](crate::Crud) that built it.
pub trait Queryer: Send {
    /// Execute a statement that returns no rows.
    fn exec(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    /// Execute a statement and stream its rows.
    fn query(&mut self, sql: &str, args: &[Value])
    -> impl Stream<Item = Result<RowLabeled>> + Send;

    /// Execute a statement that must affect at least one row, returning the
    /// last affected id when the backend reports it.
    fn exec_row(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<Option<i64>>> + Send {
        async move {
            let result = self.exec(sql, args).await?;
            if result.rows_affected < 1 {
                return Err(Error::new(NoRows));
            }
            Ok(result.last_affected_id)
        }
    }

    /// The first row of the result, [`NoRows`] when there is none.
    fn query_row(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowLabeled>> + Send {
        async move {
            let mut stream = pin!(self.query(sql, args));
            stream
                .next()
                .await
                .unwrap_or_else(|| Err(Error::new(NoRows)))
        }
    }
}

/// The same contract under `crud_` prefixed names, for handles that already
/// expose an unrelated `exec` or `query`. Wrap them in [`CrudAdapter`].
pub trait CrudQueryer: Send {
    fn crud_exec(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send;

    fn crud_query(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Stream<Item = Result<RowLabeled>> + Send;

    fn crud_query_row(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowLabeled>> + Send {
        async move {
            let mut stream = pin!(self.crud_query(sql, args));
            stream
                .next()
                .await
                .unwrap_or_else(|| Err(Error::new(NoRows)))
        }
    }
}

/// Lifts a [`CrudQueryer`] into a [`Queryer`].
#[derive(Debug, Default, Clone)]
pub struct CrudAdapter<Q>(pub Q);

impl<Q: CrudQueryer> Queryer for CrudAdapter<Q> {
    fn exec(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        self.0.crud_exec(sql, args)
    }

    fn query(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        self.0.crud_query(sql, args)
    }

    fn query_row(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowLabeled>> + Send {
        self.0.crud_query_row(sql, args)
    }
}

/// Produces a queryer on demand, for example checking a connection out of a
/// pool. Closures returning a queryer implement it.
pub trait QueryerProvider {
    type Queryer: Queryer;
    fn queryer(&self) -> Result<Self::Queryer>;
}

impl<F, Q> QueryerProvider for F
where
    F: Fn() -> Result<Q>,
    Q: Queryer,
{
    type Queryer = Q;
    fn queryer(&self) -> Result<Q> {
        self()
    }
}
