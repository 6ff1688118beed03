use pretty_assertions::assert_eq;
use std::sync::Arc;
use tabula::{
    driver::operation::{Operation, Transaction},
    EntityState, Session,
};
use tests::{
    models::{Blog, Post},
    month_rule, setup,
};

#[tokio::test]
async fn blog_lifecycle() {
    let t = setup().await;
    let session = Session::new();
    t.db.push_schema(session).await.unwrap();

    let blog = t
        .db
        .add(session, Blog::new(2, "https://blog.test", 666))
        .await
        .unwrap();
    assert_eq!(t.db.save(session).await.unwrap(), 1);
    assert_eq!(
        t.db.state_of(session, &blog).await.unwrap(),
        Some(EntityState::Unchanged)
    );

    // Tracked instances are returned as-is
    let found = t.db.get::<Blog>(session, 2_i64).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&blog, &found));

    // Other sessions read the stored entity
    let loaded = t
        .db
        .get::<Blog>(Session::new(), 2_i64)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(*loaded, *blog);

    let mut changed = (*found).clone();
    changed.url = "https://blog.example".to_string();
    t.db.update(session, changed).await.unwrap();
    assert_eq!(t.db.save(session).await.unwrap(), 1);

    let loaded = t
        .db
        .get::<Blog>(Session::new(), 2_i64)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.url, "https://blog.example");

    t.db.delete::<Blog>(session, Blog::new(2, "", 0)).await.unwrap();
    assert_eq!(t.db.save(session).await.unwrap(), 1);
    assert!(t.db.get::<Blog>(session, 2_i64).await.unwrap().is_none());

    // Nothing pending
    assert_eq!(t.db.save(session).await.unwrap(), 0);
}

#[tokio::test]
async fn queries_filter_sort_and_page() {
    let t = setup().await;
    let session = Session::new();
    t.db.push_schema(session).await.unwrap();

    for (id, rating) in [(1, 30), (2, 10), (3, 70), (4, 50), (5, 20), (6, 60), (7, 40)] {
        t.db.add(session, Blog::new(id, &format!("https://{id}.test"), rating))
            .await
            .unwrap();
    }
    assert_eq!(t.db.save(session).await.unwrap(), 7);

    let reader = Session::new();

    assert_eq!(t.db.all::<Blog>(reader).await.unwrap().len(), 7);
    assert_eq!(
        t.db.count::<Blog>(reader, |blog| blog.rating >= 40)
            .await
            .unwrap(),
        4
    );

    let ids = |blogs: Vec<Arc<Blog>>| blogs.iter().map(|blog| blog.blog_id).collect::<Vec<_>>();

    let popular = t
        .db
        .filter::<Blog>(reader, |blog| blog.rating > 45)
        .await
        .unwrap();
    let mut popular = ids(popular);
    popular.sort();
    assert_eq!(popular, [3, 4, 6]);

    let by_rating = t
        .db
        .order_by::<Blog, _>(reader, |blog| blog.rating, false)
        .await
        .unwrap();
    assert_eq!(ids(by_rating), [3, 6, 4, 7, 1, 5, 2]);

    let page = |size, index| {
        let db = t.db.clone();
        async move {
            db.page::<Blog, _>(reader, size, index, |_| true, |blog| blog.blog_id)
                .await
                .unwrap()
        }
    };

    assert_eq!(ids(page(3, 1).await), [1, 2, 3]);
    assert_eq!(ids(page(3, 0).await), [1, 2, 3]);
    assert_eq!(ids(page(3, 2).await), [4, 5, 6]);
    assert_eq!(ids(page(3, 3).await), [7]);
    assert!(page(3, 4).await.is_empty());

    let rated = t
        .db
        .page::<Blog, _>(reader, 2, 2, |blog| blog.rating < 50, |blog| blog.rating)
        .await
        .unwrap();
    assert_eq!(ids(rated), [1, 7]);
}

#[tokio::test]
async fn failed_save_rolls_back_and_keeps_changes_pending() {
    let t = setup().await;
    let writer = Session::new();
    t.db.push_schema(writer).await.unwrap();
    t.db.create(writer, Blog::new(1, "https://one.test", 1))
        .await
        .unwrap();

    // This session does not know blog 1 exists
    let session = Session::new();
    let two = t
        .db
        .add(session, Blog::new(2, "https://two.test", 2))
        .await
        .unwrap();
    t.db.add(session, Blog::new(1, "https://again.test", 1))
        .await
        .unwrap();

    t.stats.clear_ops();

    let err = t.db.save(session).await.unwrap_err();
    assert!(err.is_driver(), "{err}");

    let ops = t.stats.ops();
    assert_eq!(ops.len(), 4);
    assert!(matches!(
        ops[0].operation,
        Operation::Transaction(Transaction::Start)
    ));
    assert!(matches!(ops[1].operation, Operation::Insert(_)));
    assert!(ops[1].response.is_some());
    assert!(ops[2].response.is_none());
    assert!(matches!(
        ops[3].operation,
        Operation::Transaction(Transaction::Rollback)
    ));

    // Blog 2 was rolled back with the failed insert
    assert_eq!(t.stored("Blog"), 1);
    assert_eq!(
        t.db.state_of(session, &two).await.unwrap(),
        Some(EntityState::Added)
    );
}

#[tokio::test]
async fn update_of_a_missing_entity_fails_the_save() {
    let t = setup().await;
    let session = Session::new();
    t.db.push_schema(session).await.unwrap();

    t.db.update(session, Blog::new(9, "https://ghost.test", 0))
        .await
        .unwrap();

    let err = t.db.save(session).await.unwrap_err();
    assert!(err.is_record_not_found(), "{err}");
    assert_eq!(t.stored("Blog"), 0);
}

#[tokio::test]
async fn monthly_tables_hold_their_own_rows() {
    let t = setup().await;
    let session = Session::new();

    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    t.db.push_schema(session).await.unwrap();
    t.db.create(session, Post::new(1, "september", "2019-09-05"))
        .await
        .unwrap();

    t.db.remap_one(session, month_rule("2019-10-05")).await.unwrap();
    t.db.push_schema(session).await.unwrap();
    t.db.create(session, Post::new(2, "october", "2019-10-05"))
        .await
        .unwrap();

    let titles = |posts: Vec<Arc<Post>>| {
        posts
            .iter()
            .map(|post| post.title.clone())
            .collect::<Vec<_>>()
    };

    assert_eq!(titles(t.db.all::<Post>(session).await.unwrap()), ["october"]);

    t.db.remap_one(session, month_rule("2019-09-30")).await.unwrap();
    let september = t.db.all::<Post>(session).await.unwrap();
    assert_eq!(titles(september.clone()), ["september"]);
    assert_eq!(september[0].date(), tests::day("2019-09-05"));

    assert_eq!(t.stored("Post201909"), 1);
    assert_eq!(t.stored("Post201910"), 1);
    assert_eq!(t.stored("Post"), 0);
}
