use crate::{
    AsSubject, Crud, Dest, Error, Model, Page, Queryer, Result, RowsAffected, Value, is_no_rows,
    push_suffix, truncate_long, verbose,
};
use anyhow::Context;

impl Crud {
    /// Attach the statement to a driver error and log it. A no-rows outcome is
    /// only normalized, it is an expected result.
    fn failed(&self, on: &str, sql: &str, error: Error) -> Error {
        if is_no_rows(&error) {
            return self.normalize_no_rows(error);
        }
        log::error!(
            "crud {} failed with {:#} on sql: {}",
            on,
            error,
            truncate_long!(sql)
        );
        error.context(format!("While running {} sql: {}", on, truncate_long!(sql)))
    }

    pub async fn exec(
        &self,
        q: &mut impl Queryer,
        sql: &str,
        args: &[Value],
    ) -> Result<RowsAffected> {
        verbose!(self, "crud exec sql: {} with args: {:?}", truncate_long!(sql), args);
        q.exec(sql, args)
            .await
            .map_err(|e| self.failed("exec", sql, e))
    }

    /// Execute a statement that must affect at least one row.
    pub async fn exec_row(
        &self,
        q: &mut impl Queryer,
        sql: &str,
        args: &[Value],
    ) -> Result<Option<i64>> {
        verbose!(self, "crud exec row sql: {} with args: {:?}", truncate_long!(sql), args);
        q.exec_row(sql, args)
            .await
            .map_err(|e| self.failed("exec", sql, e))
    }

    /// Insert the fields of `v` selected by `filter`.
    ///
    /// With an empty `scan` the last inserted id reported by the queryer is
    /// returned. Otherwise the statement is followed by `join` and the columns
    /// selected by `scan` (`returning id`), the returned row is written back
    /// into `v` and `None` is returned.
    pub async fn insert_filter<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &mut M,
        filter: &str,
        join: &str,
        scan: &str,
    ) -> Result<Option<i64>> {
        let (mut sql, args) = self.insert_sql(&*v, filter, &[join]);
        if scan.is_empty() {
            let result = self.exec(q, &sql, &args).await?;
            verbose!(
                self,
                "crud insert filter `{}` returned id {:?}",
                filter,
                result.last_affected_id
            );
            return Ok(result.last_affected_id);
        }
        let (_, fields) = self.query_field(&*v, scan);
        push_suffix(&mut sql, &[fields.join(",").as_str()]);
        verbose!(self, "crud insert sql: {} with args: {:?}", truncate_long!(sql), args);
        let fields = self.scan_fields(&*v, scan);
        let row = q
            .query_row(&sql, &args)
            .await
            .map_err(|e| self.failed("insert", &sql, e))?;
        self.assign_row(v, &fields, row)
            .with_context(|| format!("While scanning the inserted row with filter `{}`", scan))?;
        Ok(None)
    }

    /// Run an UPDATE statement completed with `where_`, returning the
    /// affected rows.
    pub async fn update(
        &self,
        q: &mut impl Queryer,
        sql: &str,
        where_: &[String],
        sep: &str,
        args: &[Value],
    ) -> Result<u64> {
        let sql = self.join_where(sql, where_, sep, &[]);
        let result = self.exec(q, &sql, args).await?;
        Ok(result.rows_affected)
    }

    /// [`Crud::update`] that fails with the no-rows error when nothing changed.
    pub async fn update_row(
        &self,
        q: &mut impl Queryer,
        sql: &str,
        where_: &[String],
        sep: &str,
        args: &[Value],
    ) -> Result<()> {
        self.expect_rows(self.update(q, sql, where_, sep, args).await?)
    }

    /// `update table set sets where ..` for the table of `v`.
    pub async fn update_set(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        sets: &[String],
        where_: &[String],
        sep: &str,
        args: &[Value],
    ) -> Result<u64> {
        let sql = format!("update {} set {}", self.table(v), sets.join(","));
        self.update(q, &sql, where_, sep, args).await
    }

    pub async fn update_row_set(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        sets: &[String],
        where_: &[String],
        sep: &str,
        args: &[Value],
    ) -> Result<()> {
        self.expect_rows(self.update_set(q, v, sets, where_, sep, args).await?)
    }

    /// Update the fields of `v` selected by `filter`. `args` holds the values
    /// of `where_`, the assigned values are bound after them.
    pub async fn update_filter(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        filter: &str,
        where_: &[String],
        sep: &str,
        mut args: Vec<Value>,
    ) -> Result<u64> {
        let sql = self.update_sql(v, filter, &mut args, &[]);
        self.update(q, &sql, where_, sep, &args).await
    }

    pub async fn update_row_filter(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        filter: &str,
        where_: &[String],
        sep: &str,
        args: Vec<Value>,
    ) -> Result<()> {
        self.expect_rows(self.update_filter(q, v, filter, where_, sep, args).await?)
    }

    /// Update the fields of `v` selected by `filter`, with predicates built
    /// from the `formats` list.
    pub async fn update_wheref(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        filter: &str,
        formats: &str,
        values: Vec<Value>,
    ) -> Result<u64> {
        let mut args = Vec::new();
        let sql = self.update_sql(v, filter, &mut args, &[]);
        let sql = self.join_wheref(&sql, &mut args, formats, values);
        let result = self.exec(q, &sql, &args).await?;
        Ok(result.rows_affected)
    }

    pub async fn update_row_wheref(
        &self,
        q: &mut impl Queryer,
        v: &dyn AsSubject,
        filter: &str,
        formats: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        self.expect_rows(self.update_wheref(q, v, filter, formats, values).await?)
    }

    fn expect_rows(&self, affected: u64) -> Result<()> {
        if affected < 1 {
            return Err(self.no_rows_error());
        }
        Ok(())
    }

    /// Run `sql` and scan every row into `dests`, `v` and `filter` describe
    /// the columns.
    pub async fn query<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        sql: &str,
        args: &[Value],
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        verbose!(self, "crud query sql: {} with args: {:?}", truncate_long!(sql), args);
        let rows = q.query(sql, args);
        self.scan(rows, v, filter, dests)
            .await
            .map_err(|e| self.failed("query", sql, e))
    }

    /// Select the fields of `v` selected by `filter`, restricted by `where_`
    /// and `page`.
    #[allow(clippy::too_many_arguments)]
    pub async fn query_filter<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        where_: &[String],
        sep: &str,
        args: &[Value],
        page: &Page,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let sql = self.query_sql(v, filter, &[]);
        let sql = self.join_where(&sql, where_, sep, &[]);
        let sql = self.join_page_of(&sql, page);
        self.query(q, v, filter, &sql, args, dests).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn query_wheref<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        formats: &str,
        values: Vec<Value>,
        page: &Page,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let mut args = Vec::new();
        let sql = self.query_sql(v, filter, &[]);
        let sql = self.join_wheref(&sql, &mut args, formats, values);
        let sql = self.join_page_of(&sql, page);
        self.query(q, v, filter, &sql, &args, dests).await
    }

    /// Run `sql` and scan its first row, failing with the no-rows error when
    /// there is none.
    pub async fn query_row<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        sql: &str,
        args: &[Value],
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        verbose!(self, "crud query row sql: {} with args: {:?}", truncate_long!(sql), args);
        let row = q
            .query_row(sql, args)
            .await
            .map_err(|e| self.failed("query row", sql, e))?;
        self.scan_row(row, v, filter, dests).map_err(|e| {
            log::error!("crud scan row with filter `{}` failed with {:#}", filter, e);
            e
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn query_row_filter<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        where_: &[String],
        sep: &str,
        args: &[Value],
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let sql = self.query_sql(v, filter, &[]);
        let sql = self.join_where(&sql, where_, sep, &[]);
        self.query_row(q, v, filter, &sql, args, dests).await
    }

    pub async fn query_row_wheref<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        formats: &str,
        values: Vec<Value>,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let mut args = Vec::new();
        let sql = self.query_sql(v, filter, &[]);
        let sql = self.join_wheref(&sql, &mut args, formats, values);
        self.query_row(q, v, filter, &sql, &args, dests).await
    }

    /// Run a counting statement and scan its single row.
    ///
    /// Counting a table is usually done through a [`Meta`](crate::Meta):
    /// ```ignore
    /// let meta = crud.meta_with(&User::default(), vec![0i64.into()]);
    /// let mut total = 0i64;
    /// crud.count_filter(q, &meta, "count(*)", &[], "", &[], "", &mut [Dest::field(&mut total, "*")]).await?;
    /// ```
    pub async fn count<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        sql: &str,
        args: &[Value],
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        self.query_row(q, v, filter, sql, args, dests).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn count_filter<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        where_: &[String],
        sep: &str,
        args: &[Value],
        suffix: &str,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let sql = self.count_sql(v, filter, &[]);
        let sql = self.join_where(&sql, where_, sep, &[suffix]);
        self.count(q, v, filter, &sql, args, dests).await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn count_wheref<M: Model>(
        &self,
        q: &mut impl Queryer,
        v: &M,
        filter: &str,
        formats: &str,
        values: Vec<Value>,
        suffix: &str,
        dests: &mut [Dest<'_, M>],
    ) -> Result<()> {
        let mut args = Vec::new();
        let sql = self.count_sql(v, filter, &[]);
        let mut sql = self.join_wheref(&sql, &mut args, formats, values);
        push_suffix(&mut sql, &[suffix]);
        self.count(q, v, filter, &sql, &args, dests).await
    }
}
