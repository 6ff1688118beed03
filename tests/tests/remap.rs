use pretty_assertions::assert_eq;
use std::sync::Arc;
use tabula::{schema::app, Condition, Generation, MappingRule, Session};
use tests::{
    models::{Blog, Comment, Post},
    month_rule, setup, table_names, MonthlyResolver,
};

fn archive_rule() -> MappingRule {
    MappingRule::new::<Blog>(
        |model: &app::Model, _: &Condition| format!("{}_archive", model.name),
        (),
    )
}

#[tokio::test]
async fn default_tables_use_entity_names() {
    let t = setup().await;

    assert_eq!(t.db.generation(), Generation::INITIAL);
    assert_eq!(
        table_names(&t.db.resolve_table_names().unwrap()),
        [("Blog", "Blog"), ("Post", "Post")]
    );
    assert_eq!(t.db.resolve_table_name::<Post>().unwrap().table_name, "Post");
}

#[tokio::test]
async fn remap_resolves_monthly_tables() {
    let t = setup().await;
    let session = Session::new();

    let mapping = t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    assert_eq!(mapping.entity, "Post");
    assert_eq!(mapping.table_name, "Post201909");
    assert_eq!(
        t.db.resolve_table_name::<Post>().unwrap().table_name,
        "Post201909"
    );

    let mapping = t.db.remap_one(session, month_rule("2019-10-31")).await.unwrap();
    assert_eq!(mapping.table_name, "Post201910");
    assert_eq!(
        t.db.table_name::<Post>(session).await.unwrap().table_name,
        "Post201910"
    );

    // Unmapped entity types keep their default table
    assert_eq!(
        t.db.table_name::<Blog>(session).await.unwrap().table_name,
        "Blog"
    );
}

#[tokio::test]
async fn remap_returns_tables_in_rule_order() {
    let t = setup().await;

    let mappings = t
        .db
        .remap(Session::new(), [month_rule("2019-09-05"), archive_rule()])
        .await
        .unwrap();

    assert_eq!(
        table_names(&mappings),
        [("Post", "Post201909"), ("Blog", "Blog_archive")]
    );
}

#[tokio::test]
async fn remap_is_all_or_nothing() {
    let t = setup().await;
    let session = Session::new();

    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();

    let generation = t.db.generation();
    let before = t.db.resolve_table_names().unwrap();
    let opened = t.stats.opened();

    // The first rule is valid; the second names an unregistered entity type
    let err = t
        .db
        .remap(
            session,
            [
                month_rule("2019-10-05"),
                MappingRule::new::<Comment>(MonthlyResolver, tests::day("2019-10-05")),
            ],
        )
        .await
        .unwrap_err();

    assert!(err.is_mapping_not_found(), "{err}");
    assert_eq!(t.db.generation(), generation);
    assert_eq!(t.db.resolve_table_names().unwrap(), before);
    assert_eq!(t.stats.opened(), opened);
    assert_eq!(
        t.db.table_name::<Post>(session).await.unwrap().table_name,
        "Post201909"
    );
}

#[tokio::test]
async fn invalid_resolver_output_is_rejected() {
    let t = setup().await;
    let session = Session::new();

    // Not a date: the resolver yields an empty name
    let err = t
        .db
        .remap_one(session, MappingRule::new::<Post>(MonthlyResolver, "not a date"))
        .await
        .unwrap_err();
    assert!(err.is_invalid_mapping_result(), "{err}");

    // Collides with the default table of `Blog`
    let err = t
        .db
        .remap_one(
            session,
            MappingRule::new::<Post>(|_: &app::Model, _: &Condition| "Blog".to_string(), ()),
        )
        .await
        .unwrap_err();
    assert!(err.is_invalid_mapping_result(), "{err}");

    assert_eq!(t.db.generation(), Generation::INITIAL);
    assert!(!t.db.is_closed(session));
}

#[tokio::test]
async fn unregistered_entity_has_no_mapping() {
    let t = setup().await;

    let err = t.db.resolve_table_name::<Comment>().unwrap_err();
    assert!(err.is_mapping_not_found());

    let err = t
        .db
        .table_name::<Comment>(Session::new())
        .await
        .unwrap_err();
    assert!(err.is_mapping_not_found());
}

#[tokio::test]
async fn generations_increase_by_one_per_remap() {
    let t = setup().await;
    let session = Session::new();

    for (i, date) in ["2019-09-05", "2019-10-05", "2019-11-05"].iter().enumerate() {
        t.db.remap_one(session, month_rule(date)).await.unwrap();

        let expected = i as u64 + 1;
        assert_eq!(t.db.generation().get(), expected);

        let cx = t.db.context(session).await.unwrap();
        assert_eq!(cx.generation().get(), expected);
        assert_eq!(cx.cache_key().generation, cx.generation());
    }
}

#[tokio::test]
async fn remap_replaces_the_whole_rule_set() {
    let t = setup().await;
    let session = Session::new();

    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    t.db.remap_one(session, archive_rule()).await.unwrap();

    // `Post` is not named by the new rule set and reverts to its default
    assert_eq!(
        table_names(&t.db.resolve_table_names().unwrap()),
        [("Blog", "Blog_archive"), ("Post", "Post")]
    );
    assert_eq!(t.db.context(session).await.unwrap().rules().len(), 1);
}

#[tokio::test]
async fn generations_never_share_a_compiled_schema() {
    let t = setup().await;
    let (s1, s2) = (Session::new(), Session::new());

    let a = t.db.context(s1).await.unwrap();
    let b = t.db.context(s2).await.unwrap();

    assert_eq!(a.cache_key(), b.cache_key());
    assert!(Arc::ptr_eq(a.schema(), b.schema()));

    // Same tables, next generation
    t.db.remap(s1, Vec::<MappingRule>::new()).await.unwrap();
    let a = t.db.context(s1).await.unwrap();

    assert_eq!(a.table_names(), b.table_names());
    assert_ne!(a.cache_key(), b.cache_key());
    assert!(!Arc::ptr_eq(a.schema(), b.schema()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_remaps_get_distinct_generations() {
    let t = setup().await;

    let handles = (1..=8)
        .map(|month| {
            let db = t.db.clone();
            tokio::spawn(async move {
                let session = Session::new();
                let date = format!("2019-{month:02}-05");

                let mapping = db.remap_one(session, month_rule(&date)).await.unwrap();
                let cx = db.context(session).await.unwrap();
                let table = cx
                    .table_names()
                    .into_iter()
                    .find(|mapping| mapping.entity == "Post")
                    .unwrap()
                    .table_name;

                (cx.generation().get(), date, mapping.table_name, table)
            })
        })
        .collect::<Vec<_>>();

    let mut generations = vec![];

    for handle in handles {
        let (generation, date, resolved, table) = handle.await.unwrap();

        // Each session's context carries the mapping its own remap installed
        assert_eq!(resolved, format!("Post2019{}", &date[5..7]));
        assert_eq!(table, resolved);

        generations.push(generation);
    }

    generations.sort();
    assert_eq!(generations, (1..=8).collect::<Vec<_>>());
    assert_eq!(t.db.generation().get(), 8);
}

#[tokio::test]
async fn table_name_prefix_applies_to_resolved_tables() {
    let db = tests::models!(Blog, Post)
        .table_name_prefix("t_")
        .build("memory://prefixed", tabula_driver_memory::Memory::new())
        .await
        .unwrap();
    let session = Session::new();

    assert_eq!(db.resolve_table_name::<Blog>().unwrap().table_name, "t_Blog");

    let mapping = db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    assert_eq!(mapping.table_name, "t_Post201909");
}

#[tokio::test]
async fn prefixed_table_names_are_verified_as_a_whole() {
    let db = tests::models!(Blog, Post)
        .table_name_prefix("t_")
        .build("memory://prefixed", tabula_driver_memory::Memory::new())
        .await
        .unwrap();
    let session = Session::new();

    // Valid alone, too long once prefixed
    let long = |_: &app::Model, _: &Condition| "p".repeat(128);
    let err = db
        .remap_one(session, MappingRule::new::<Post>(long, ()))
        .await
        .unwrap_err();

    assert!(err.is_invalid_mapping_result(), "{err}");
    assert_eq!(db.generation(), Generation::INITIAL);
    assert_eq!(db.resolve_table_name::<Post>().unwrap().table_name, "t_Post");
}
