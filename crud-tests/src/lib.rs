use async_stream::try_stream;
use crud::{
    Error, Queryer, Result, RowLabeled, RowsAffected, Value,
    stream::{Stream, StreamExt},
};
use log::LevelFilter;
use regex::Regex;
use std::{
    collections::{HashMap, VecDeque},
    env,
    future::Future,
    ops::Range,
    pin::pin,
    sync::Arc,
};
use tokio::sync::RwLock;

pub fn init_logs() {
    let mut logger = env_logger::builder();
    logger
        .is_test(true)
        .format_file(true)
        .format_line_number(true);
    if env::var("RUST_LOG").is_err() {
        logger.filter_level(LevelFilter::Warn);
    }
    let _ = logger.try_init();
}

/// Build a row from column labels and values.
pub fn row(labels: &[&str], values: Vec<Value>) -> RowLabeled {
    RowLabeled::new(
        labels.iter().map(|v| v.to_string()).collect(),
        values.into_boxed_slice(),
    )
}

/// A statement received by [`MemoryQueryer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Affected(RowsAffected),
    Rows(Vec<RowLabeled>, Option<String>),
    Error(String),
}

/// Scripted queryer: records every statement and answers with the queued
/// replies in order. Without a queued reply `exec` affects nothing and
/// `query` returns no rows.
#[derive(Debug, Default)]
pub struct MemoryQueryer {
    pub statements: Vec<Statement>,
    replies: VecDeque<Reply>,
}

impl MemoryQueryer {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn push_affected(&mut self, rows_affected: u64, last_affected_id: Option<i64>) -> &mut Self {
        self.replies.push_back(Reply::Affected(RowsAffected {
            rows_affected,
            last_affected_id,
        }));
        self
    }
    pub fn push_rows(&mut self, labels: &[&str], rows: Vec<Vec<Value>>) -> &mut Self {
        let rows = rows.into_iter().map(|v| row(labels, v)).collect();
        self.replies.push_back(Reply::Rows(rows, None));
        self
    }
    /// Rows followed by a driver error in the middle of the result set.
    pub fn push_rows_then_error(
        &mut self,
        labels: &[&str],
        rows: Vec<Vec<Value>>,
        message: impl Into<String>,
    ) -> &mut Self {
        let rows = rows.into_iter().map(|v| row(labels, v)).collect();
        self.replies.push_back(Reply::Rows(rows, Some(message.into())));
        self
    }
    pub fn push_error(&mut self, message: impl Into<String>) -> &mut Self {
        self.replies.push_back(Reply::Error(message.into()));
        self
    }
    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }
    pub fn sqls(&self) -> Vec<&str> {
        self.statements.iter().map(|v| v.sql.as_str()).collect()
    }
    fn receive(&mut self, sql: &str, args: &[Value]) -> Option<Reply> {
        log::debug!("memory queryer received: {}", sql);
        self.statements.push(Statement {
            sql: sql.to_owned(),
            args: args.to_vec(),
        });
        self.replies.pop_front()
    }
}

impl Queryer for MemoryQueryer {
    fn exec(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let reply = self.receive(sql, args);
        async move {
            match reply {
                Some(Reply::Affected(v)) => Ok(v),
                Some(Reply::Error(e)) => Err(Error::msg(e)),
                Some(Reply::Rows(..)) => Err(Error::msg("Rows were queued but exec was called")),
                None => Ok(RowsAffected::default()),
            }
        }
    }

    fn query(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        let reply = self.receive(sql, args);
        try_stream! {
            match reply {
                Some(Reply::Rows(rows, error)) => {
                    for row in rows {
                        yield row;
                    }
                    if let Some(e) = error {
                        Err::<(), _>(Error::msg(e))?;
                    }
                }
                Some(Reply::Error(e)) => Err::<(), _>(Error::msg(e))?,
                Some(Reply::Affected(..)) => {
                    Err::<(), _>(Error::msg("An affected count was queued but query was called"))?
                }
                None => {}
            }
        }
    }
}

struct Fault {
    key: String,
    calls: Range<usize>,
    pattern: Option<Regex>,
    message: String,
}

#[derive(Default)]
struct FaultState {
    faults: Vec<Fault>,
    calls: HashMap<String, usize>,
}

/// Injectable failures shared by every [`Faulty`] queryer holding a clone.
///
/// A fault triggers on the operation `key` (`exec` or `query`) when the call
/// number, counted from 1 per key, falls in `calls` and the statement matches
/// the optional pattern.
#[derive(Clone, Default)]
pub struct FaultPlan {
    state: Arc<RwLock<FaultState>>,
}

impl FaultPlan {
    pub fn new() -> Self {
        Default::default()
    }
    pub async fn inject(
        &self,
        key: &str,
        calls: Range<usize>,
        pattern: Option<&str>,
        message: impl Into<String>,
    ) -> Result<()> {
        let pattern = pattern.map(Regex::new).transpose()?;
        self.state.write().await.faults.push(Fault {
            key: key.to_owned(),
            calls,
            pattern,
            message: message.into(),
        });
        Ok(())
    }
    pub async fn calls(&self, key: &str) -> usize {
        self.state
            .read()
            .await
            .calls
            .get(key)
            .copied()
            .unwrap_or_default()
    }
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        state.faults.clear();
        state.calls.clear();
    }
    /// Count the call and fail when a fault triggers.
    pub async fn check(&self, key: &str, sql: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let call = {
            let count = state.calls.entry(key.to_owned()).or_default();
            *count += 1;
            *count
        };
        let triggered = state.faults.iter().find(|v| {
            v.key == key
                && v.calls.contains(&call)
                && v.pattern.as_ref().is_none_or(|p| p.is_match(sql))
        });
        if let Some(fault) = triggered {
            log::warn!("fault `{}` triggered on {} call {}", fault.message, key, call);
            return Err(Error::msg(fault.message.clone()));
        }
        Ok(())
    }
}

/// Wraps a queryer, consulting a [`FaultPlan`] before every call.
pub struct Faulty<Q> {
    pub inner: Q,
    pub plan: FaultPlan,
}

impl<Q: Queryer> Faulty<Q> {
    pub fn new(inner: Q, plan: FaultPlan) -> Self {
        Self { inner, plan }
    }
}

impl<Q: Queryer> Queryer for Faulty<Q> {
    fn exec(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Future<Output = Result<RowsAffected>> + Send {
        let plan = self.plan.clone();
        async move {
            plan.check("exec", sql).await?;
            self.inner.exec(sql, args).await
        }
    }

    fn query(
        &mut self,
        sql: &str,
        args: &[Value],
    ) -> impl Stream<Item = Result<RowLabeled>> + Send {
        let plan = self.plan.clone();
        try_stream! {
            plan.check("query", sql).await?;
            let mut rows = pin!(self.inner.query(sql, args));
            while let Some(row) = rows.next().await {
                yield row?;
            }
        }
    }
}
