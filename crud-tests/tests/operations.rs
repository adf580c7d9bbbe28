#[cfg(test)]
mod tests {
    use crud::{
        Crud, CrudAdapter, CrudQueryer, Dest, Error, Model, Page, Queryer, QueryerProvider,
        Result, RowLabeled, RowsAffected, Value, is_no_rows,
        stream::Stream,
    };
    use crud_tests::{MemoryQueryer, init_logs};
    use std::future::Future;

    #[derive(Model, Debug, Default, Clone, PartialEq)]
    #[crud(table = "crud_object")]
    struct Object {
        tid: i64,
        user_id: i64,
        title: String,
        amount: Option<i64>,
        status: i32,
    }

    fn object() -> Object {
        Object {
            user_id: 100,
            title: "x".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_reports_id() {
        init_logs();
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_affected(1, Some(42));
        let mut value = object();
        let id = crud
            .insert_filter(&mut q, &mut value, "", "", "")
            .await
            .expect("Failed to insert");
        assert_eq!(id, Some(42));
        let statement = q.last().expect("No statement was run");
        assert_eq!(
            statement.sql,
            "insert into crud_object(user_id,title) values($1,$2)"
        );
        assert_eq!(
            statement.args,
            vec![Value::Int64(Some(100)), Value::Varchar(Some("x".into()))]
        );
    }

    #[tokio::test]
    async fn insert_scans_returned_columns() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_rows(&["tid"], vec![vec![9i64.into()]]);
        let mut value = object();
        let id = crud
            .insert_filter(&mut q, &mut value, "", "returning", "tid#all")
            .await
            .expect("Failed to insert returning");
        assert_eq!(id, None);
        assert_eq!(value.tid, 9);
        assert_eq!(value.title, "x");
        assert_eq!(
            q.sqls(),
            vec!["insert into crud_object(user_id,title) values($1,$2) returning tid"]
        );
    }

    #[tokio::test]
    async fn update_variants() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_affected(2, None);
        let affected = crud
            .update_filter(
                &mut q,
                &object(),
                "title,status#all",
                &["tid=$1".into()],
                "",
                vec![1i64.into()],
            )
            .await
            .expect("Failed to update");
        assert_eq!(affected, 2);
        let statement = q.last().expect("No statement was run");
        assert_eq!(
            statement.sql,
            "update crud_object set title=$2,status=$3 where tid=$1"
        );
        assert_eq!(
            statement.args,
            vec![
                Value::Int64(Some(1)),
                Value::Varchar(Some("x".into())),
                Value::Int32(Some(0)),
            ]
        );

        q.push_affected(1, None);
        crud.update_row_wheref(
            &mut q,
            &object(),
            "title",
            "tid=$%v,status=$%v",
            vec![1i64.into(), 0i32.into()],
        )
        .await
        .expect("Failed to update by formats");
        assert_eq!(
            q.last().map(|v| v.sql.as_str()),
            Some("update crud_object set title=$1 where tid=$2")
        );

        let mut sets = Vec::new();
        let mut args = Vec::new();
        crud.append_set(&mut sets, &mut args, true, "status=$%v", 3);
        crud.append_set(&mut sets, &mut args, false, "title=$%v", "y");
        args.push(5i64.into());
        q.push_affected(1, None);
        crud.update_row_set(
            &mut q,
            &object(),
            &sets,
            &["tid=$2".into(), "user_id=$2".into()],
            "or",
            &args,
        )
        .await
        .expect("Failed to update the sets");
        assert_eq!(
            q.last().map(|v| v.sql.as_str()),
            Some("update crud_object set status=$1 where tid=$2 or user_id=$2")
        );

        q.push_affected(4, None);
        let affected = crud
            .update(
                &mut q,
                "update crud_object set status=0",
                &[],
                "",
                &[],
            )
            .await
            .expect("Failed to run a raw update");
        assert_eq!(affected, 4);
    }

    #[tokio::test]
    async fn update_row_without_rows() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        let error = crud
            .update_row_filter(
                &mut q,
                &object(),
                "title",
                &["tid=$1".into()],
                "",
                vec![1i64.into()],
            )
            .await
            .expect_err("Nothing was affected");
        assert!(is_no_rows(&error));

        let crud = Crud::new().with_no_rows(|| Error::msg("object not found"));
        let error = crud
            .update_row_filter(
                &mut q,
                &object(),
                "title",
                &["tid=$1".into()],
                "",
                vec![1i64.into()],
            )
            .await
            .expect_err("Nothing was affected");
        assert!(!is_no_rows(&error));
        assert_eq!(error.to_string(), "object not found");

        let error = crud
            .exec_row(&mut q, "delete from crud_object where tid=$1", &[1i64.into()])
            .await
            .expect_err("Nothing was deleted");
        assert_eq!(error.to_string(), "object not found");
    }

    #[tokio::test]
    async fn query_with_page() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_rows(
            &["tid", "title"],
            vec![
                vec![2i64.into(), "b".into()],
                vec![1i64.into(), "a".into()],
            ],
        );
        let page = Page::new("", 0, 10).with_default_order("order by tid desc");
        let mut list = Vec::new();
        crud.query_filter(
            &mut q,
            &Object::default(),
            "tid,title#all",
            &["user_id = $1".into()],
            "",
            &[100i64.into()],
            &page,
            &mut [Dest::append(&mut list)],
        )
        .await
        .expect("Failed to query objects");
        assert_eq!(
            q.sqls(),
            vec![
                "select tid,title from crud_object where user_id = $1 order by tid desc limit 10 offset 0"
            ]
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].tid, 2);
        assert_eq!(list[1].title, "a");

        let mut titles: Vec<String> = Vec::new();
        q.push_rows(&["title"], vec![vec!["a".into()]]);
        crud.query_wheref(
            &mut q,
            &Object::default(),
            "title#all",
            "status=$%v,user_id=$%v#all,+or",
            vec![0i32.into(), 100i64.into()],
            &Page::new("order by title", -1, 0),
            &mut [Dest::field(&mut titles, "title")],
        )
        .await
        .expect("Failed to query titles");
        assert_eq!(
            q.last().map(|v| v.sql.as_str()),
            Some("select title from crud_object where status=$1 or user_id=$2")
        );
        assert_eq!(titles, vec!["a"]);
    }

    #[tokio::test]
    async fn query_row_variants() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        let mut value = Object::default();
        let error = crud
            .query_row_wheref(
                &mut q,
                &Object::default(),
                "tid,title#all",
                "tid=$%v",
                vec![5i64.into()],
                &mut [Dest::assign(&mut value)],
            )
            .await
            .expect_err("No row was queued");
        assert!(is_no_rows(&error));
        assert_eq!(
            q.sqls(),
            vec!["select tid,title from crud_object where tid=$1"]
        );

        q.push_rows(&["tid", "title"], vec![vec![5i64.into(), "e".into()]]);
        crud.query_row_filter(
            &mut q,
            &Object::default(),
            "tid,title#all",
            &["tid=$1".into()],
            "",
            &[5i64.into()],
            &mut [Dest::assign(&mut value)],
        )
        .await
        .expect("Failed to query one object");
        assert_eq!(value.tid, 5);
        assert_eq!(value.title, "e");
    }

    #[tokio::test]
    async fn count_through_meta() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_rows(&["count"], vec![vec![7i64.into()]]);
        let meta = crud.meta_with(&Object::default(), vec![Value::Null]);
        let mut total = 0i64;
        crud.count_filter(
            &mut q,
            &meta,
            "count(*)",
            &["status = $1".into()],
            "",
            &[1i32.into()],
            "",
            &mut [Dest::field(&mut total, "*")],
        )
        .await
        .expect("Failed to count");
        assert_eq!(total, 7);
        assert_eq!(
            q.sqls(),
            vec!["select count(*) from crud_object where status = $1"]
        );

        let meta = crud.meta_with(&Object::default(), vec![Value::Null, Value::Null]);
        q.push_rows(
            &["status", "count"],
            vec![vec![1i32.into(), 3i64.into()], vec![2i32.into(), 4i64.into()]],
        );
        let mut per_status = std::collections::BTreeMap::<i32, i64>::new();
        crud.count_wheref(
            &mut q,
            &meta,
            "status,count(tid)",
            "user_id=$%v",
            vec![100i64.into()],
            "group by status",
            &mut [Dest::map(&mut per_status, "status:tid")],
        )
        .await
        .expect("Failed to count by status");
        assert_eq!(
            q.last().map(|v| v.sql.as_str()),
            Some("select status,count(tid) from crud_object where user_id=$1 group by status")
        );
        // A count reads a single row.
        assert_eq!(per_status.len(), 1);
        assert_eq!(per_status[&1], 3);
    }

    #[tokio::test]
    async fn driver_errors_carry_the_statement() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_error("relation does not exist");
        let error = crud
            .update_filter(&mut q, &object(), "title", &[], "", Vec::new())
            .await
            .expect_err("The driver failed");
        let message = format!("{:#}", error);
        assert!(message.contains("While running exec sql: update crud_object set title=$1"));
        assert!(message.contains("relation does not exist"));
    }

    struct Legacy(MemoryQueryer);

    impl CrudQueryer for Legacy {
        fn crud_exec(
            &mut self,
            sql: &str,
            args: &[Value],
        ) -> impl Future<Output = Result<RowsAffected>> + Send {
            self.0.exec(sql, args)
        }
        fn crud_query(
            &mut self,
            sql: &str,
            args: &[Value],
        ) -> impl Stream<Item = Result<RowLabeled>> + Send {
            self.0.query(sql, args)
        }
    }

    async fn titles(provider: &impl QueryerProvider) -> Result<Vec<String>> {
        let crud = Crud::new();
        let mut q = provider.queryer()?;
        let mut titles = Vec::new();
        crud.query(
            &mut q,
            &String::new(),
            "title",
            "select title from crud_object",
            &[],
            &mut [Dest::append(&mut titles)],
        )
        .await?;
        Ok(titles)
    }

    #[tokio::test]
    async fn adapters_and_providers() {
        let crud = Crud::new();
        let mut inner = MemoryQueryer::new();
        inner.push_affected(1, Some(3));
        let mut q = CrudAdapter(Legacy(inner));
        let id = crud
            .insert_filter(&mut q, &mut object(), "", "", "")
            .await
            .expect("Failed to insert through the adapter");
        assert_eq!(id, Some(3));
        assert_eq!(q.0.0.statements.len(), 1);

        let provider = || -> Result<MemoryQueryer> {
            let mut q = MemoryQueryer::new();
            q.push_rows(&["title"], vec![vec!["a".into()], vec!["b".into()]]);
            Ok(q)
        };
        let result = titles(&provider).await.expect("Failed to query titles");
        assert_eq!(result, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn inserted_columns_read_back() {
        let crud = Crud::new();
        let original = Object {
            tid: 5,
            user_id: 100,
            title: "x".into(),
            amount: None,
            status: 0,
        };
        let cases = [
            ("#all", original.clone()),
            (
                "^tid#all",
                Object {
                    tid: 0,
                    ..original.clone()
                },
            ),
            (
                "user_id,title#all",
                Object {
                    user_id: 100,
                    title: "x".into(),
                    ..Default::default()
                },
            ),
            (
                "tid,amount,status#all",
                Object {
                    tid: 5,
                    ..Default::default()
                },
            ),
        ];
        for (filter, expected) in cases {
            let mut q = MemoryQueryer::new();
            q.push_affected(1, None);
            crud.insert_filter(&mut q, &mut original.clone(), filter, "", "")
                .await
                .expect("Failed to insert");
            let inserted = q.last().cloned().expect("No insert was run");
            let start = inserted.sql.find('(').expect("No column list") + 1;
            let end = inserted.sql.find(')').expect("No column list");
            let columns: Vec<&str> = inserted.sql[start..end].split(',').collect();
            let sql = crud.query_sql(&original, filter, &[]);
            assert_eq!(
                sql,
                format!("select {} from crud_object", columns.join(",")),
                "Same columns with `{}`",
                filter
            );

            q.push_rows(&columns, vec![inserted.args.clone()]);
            let mut back = Object::default();
            crud.query_row(
                &mut q,
                &original,
                filter,
                &sql,
                &[],
                &mut [Dest::assign(&mut back)],
            )
            .await
            .expect("Failed to read back");
            assert_eq!(back, expected, "Read back with `{}`", filter);
        }
    }
}
