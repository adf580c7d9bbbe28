#[cfg(test)]
mod tests {
    use crud::{
        COUNT, Crud, Dest, Meta, Model, Page, QUERY, QUERY_ROW, ScanDests, Target, TargetKind,
        Unify, Value, WhereGroup,
    };
    use crud_tests::{MemoryQueryer, init_logs};
    use std::collections::BTreeMap;

    #[derive(Model, Debug, Default, Clone, PartialEq)]
    #[crud(table = "crud_object")]
    struct Object {
        tid: i64,
        user_id: i64,
        title: String,
    }

    #[derive(Model, Debug, Default, Clone)]
    #[crud(table = "crud_object")]
    struct ObjectWhere {
        user_id: i64,
        #[crud(cmp = "title like $%v")]
        title: String,
    }

    const BY_USER: &str = "ByUser";

    #[derive(Default)]
    struct ObjectSearch {
        model: Object,
        filter: ObjectWhere,
        page: Page,
        objects: Vec<Object>,
        first: Object,
        total: i64,
        per_user: BTreeMap<i64, i64>,
    }

    impl Unify for ObjectSearch {
        type Model = Object;

        fn model(&self) -> &Object {
            &self.model
        }
        fn where_group(&self) -> Option<WhereGroup<'_>> {
            Some(WhereGroup::new(&self.filter, ""))
        }
        fn page(&self) -> Option<Page> {
            Some(self.page.clone())
        }
        fn targets(&self) -> Vec<&'static str> {
            vec![QUERY, QUERY_ROW, COUNT, BY_USER, "Disabled"]
        }
        fn target(&self, name: &str) -> Option<Target<'_>> {
            match name {
                QUERY => Some(Target::new(TargetKind::Query, "#all")),
                QUERY_ROW => Some(Target::new(TargetKind::QueryRow, "#all").explicit()),
                COUNT => Some(Target::new(TargetKind::Count, "")),
                BY_USER => Some(
                    Target::new(TargetKind::Count, "user_id,count(tid)")
                        .with_group("group by user_id")
                        .explicit(),
                ),
                "Titles" => Some(
                    Target::new(TargetKind::Query, "title#all")
                        .with_select("select distinct %v from crud_object"),
                ),
                "Archive" => Some(
                    Target::new(TargetKind::Query, "title#all").with_from("crud_object_archive"),
                ),
                "Disabled" => Some(Target::new(TargetKind::Query, "#all").with_enabled(false)),
                _ => None,
            }
        }
        fn query_dests(&mut self, name: &str) -> Vec<Dest<'_, Object>> {
            match name {
                QUERY_ROW => vec![Dest::assign(&mut self.first)],
                _ => vec![Dest::append(&mut self.objects)],
            }
        }
        fn count_dests(&mut self, name: &str) -> Vec<Dest<'_, Meta>> {
            match name {
                COUNT => vec![Dest::field(&mut self.total, "*")],
                _ => vec![Dest::map(&mut self.per_user, "user_id:tid")],
            }
        }
    }

    fn search() -> ObjectSearch {
        ObjectSearch {
            filter: ObjectWhere {
                user_id: 100,
                ..Default::default()
            },
            page: Page::new("", 0, 10).with_default_order("order by tid desc"),
            ..Default::default()
        }
    }

    fn object(tid: i64, title: &str) -> Vec<Value> {
        vec![tid.into(), 100i64.into(), Value::Varchar(Some(title.into()))]
    }

    #[test]
    fn statements() {
        init_logs();
        let crud = Crud::new();
        let search = search();
        let (sql, args) = crud
            .query_unify_sql(&search, QUERY)
            .expect("Failed to build the query");
        assert_eq!(
            sql,
            "select tid,user_id,title from crud_object where user_id = $1 order by tid desc limit 10 offset 0"
        );
        assert_eq!(args, vec![Value::Int64(Some(100))]);
        let (sql, _) = crud
            .count_unify_sql(&search, COUNT)
            .expect("Failed to build the count");
        assert_eq!(sql, "select count(*) from crud_object where user_id = $1");
        let (sql, _) = crud
            .count_unify_sql(&search, BY_USER)
            .expect("Failed to build the grouped count");
        assert_eq!(
            sql,
            "select user_id,count(tid) from crud_object where user_id = $1 group by user_id"
        );
        let (sql, _) = crud
            .query_unify_sql(&search, "Titles")
            .expect("Failed to build the distinct query");
        assert_eq!(
            sql,
            "select distinct title from crud_object where user_id = $1 order by tid desc limit 10 offset 0"
        );
        let (sql, _) = crud
            .query_unify_sql(&search, "Archive")
            .expect("Failed to build the archive query");
        assert_eq!(
            sql,
            "select title from crud_object_archive where user_id = $1 order by tid desc limit 10 offset 0"
        );
        let error = crud
            .query_unify_sql(&search, "Nope")
            .expect_err("The target does not exist");
        assert_eq!(error.to_string(), "unify target Nope is not found");
    }

    #[test]
    fn keyword_predicates() {
        let crud = Crud::new().with_table_prefix("t_");
        let mut search = search();
        search.filter.title = "%abc%".into();
        search.page = Page::default();
        let (sql, args) = crud
            .query_unify_sql(&search, QUERY)
            .expect("Failed to build the query");
        assert_eq!(
            sql,
            "select tid,user_id,title from t_crud_object where user_id = $1 and title like $2"
        );
        assert_eq!(args.len(), 2);
        let (sql, _) = crud
            .count_unify_sql(&search, COUNT)
            .expect("Failed to build the count");
        assert_eq!(
            sql,
            "select count(*) from t_crud_object where user_id = $1 and title like $2"
        );
    }

    #[tokio::test]
    async fn apply_default_targets() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_rows(
            &["tid", "user_id", "title"],
            vec![object(2, "b"), object(1, "a")],
        );
        q.push_rows(&["count"], vec![vec![2i64.into()]]);
        let mut search = search();
        crud.apply_unify(&mut q, &mut search, &[])
            .await
            .expect("Failed to apply the search");
        assert_eq!(
            q.sqls(),
            vec![
                "select tid,user_id,title from crud_object where user_id = $1 order by tid desc limit 10 offset 0",
                "select count(*) from crud_object where user_id = $1",
            ]
        );
        assert_eq!(search.objects.len(), 2);
        assert_eq!(search.objects[0].title, "b");
        assert_eq!(search.total, 2);
        assert_eq!(search.first, Object::default());
        assert!(search.per_user.is_empty());
    }

    #[tokio::test]
    async fn apply_named_targets() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        q.push_rows(&["tid", "user_id", "title"], vec![object(2, "b")]);
        q.push_rows(&["user_id", "count"], vec![vec![100i64.into(), 5i64.into()]]);
        let mut search = search();
        crud.apply_unify(&mut q, &mut search, &[QUERY_ROW, BY_USER, "Disabled"])
            .await
            .expect("Failed to apply the search");
        assert_eq!(q.statements.len(), 2);
        assert_eq!(search.first.tid, 2);
        assert!(search.objects.is_empty());
        assert_eq!(search.per_user[&100], 5);
        assert_eq!(search.total, 0);
    }

    #[tokio::test]
    async fn count_without_rows() {
        let crud = Crud::new();
        let mut q = MemoryQueryer::new();
        let mut search = search();
        let error = crud
            .count_unify(&mut q, &mut search, COUNT)
            .await
            .expect_err("No count row was queued");
        assert!(crud::is_no_rows(&error));
    }

    #[derive(ScanDests, Default)]
    #[crud(model = "Object")]
    struct ObjectResults {
        objects: Vec<Object>,
        last: Object,
        #[crud(scan = "tid")]
        ids: Vec<i64>,
        #[crud(scan = "tid:title")]
        titles: BTreeMap<i64, String>,
        #[crud(scan = "key:tid,name:title")]
        records: Vec<BTreeMap<String, Value>>,
        #[crud(scan = "-")]
        note: String,
    }

    #[derive(ScanDests, Default)]
    #[crud(model = "crud::Meta")]
    struct ObjectCounts {
        #[crud(scan = "*")]
        total: i64,
    }

    #[derive(Default)]
    struct ObjectListing {
        model: Object,
        filter: ObjectWhere,
        results: ObjectResults,
        counts: ObjectCounts,
    }

    impl Unify for ObjectListing {
        type Model = Object;

        fn model(&self) -> &Object {
            &self.model
        }
        fn where_group(&self) -> Option<WhereGroup<'_>> {
            Some(WhereGroup::new(&self.filter, ""))
        }
        fn target(&self, name: &str) -> Option<Target<'_>> {
            match name {
                QUERY => Some(Target::new(TargetKind::Query, "#all")),
                COUNT => Some(Target::new(TargetKind::Count, "")),
                _ => None,
            }
        }
        fn query_dests(&mut self, _name: &str) -> Vec<Dest<'_, Object>> {
            self.results.dests()
        }
        fn count_dests(&mut self, _name: &str) -> Vec<Dest<'_, Meta>> {
            self.counts.dests()
        }
    }

    #[tokio::test]
    async fn derived_destinations() {
        let crud = Crud::new();
        let mut results = ObjectResults::default();
        assert_eq!(results.dests().len(), 5, "The excluded note has no destination");

        let mut q = MemoryQueryer::new();
        q.push_rows(
            &["tid", "user_id", "title"],
            vec![object(1, "a"), object(2, "b")],
        );
        q.push_rows(&["count"], vec![vec![2i64.into()]]);
        let mut listing = ObjectListing {
            filter: ObjectWhere {
                user_id: 100,
                ..Default::default()
            },
            ..Default::default()
        };
        listing.results.note = "kept".into();
        crud.apply_unify(&mut q, &mut listing, &[])
            .await
            .expect("Failed to apply the listing");
        let results = &listing.results;
        assert_eq!(results.objects.len(), 2);
        assert_eq!(results.last.tid, 2);
        assert_eq!(results.ids, vec![1, 2]);
        assert_eq!(results.titles[&2], "b");
        assert_eq!(results.records[0]["key"], Value::Int64(Some(1)));
        assert_eq!(results.records[1]["name"], Value::Varchar(Some("b".into())));
        assert_eq!(results.note, "kept");
        assert_eq!(listing.counts.total, 2);
    }
}
