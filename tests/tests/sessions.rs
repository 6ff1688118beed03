use pretty_assertions::assert_eq;
use tabula::{Generation, Session};
use tests::{
    models::{Blog, Post},
    month_rule, setup,
};

#[tokio::test]
async fn contexts_are_created_lazily() {
    let t = setup().await;
    let session = Session::new();

    assert_eq!(t.stats.opened(), 0);

    t.db.push_schema(session).await.unwrap();
    assert_eq!(t.stats.opened(), 1);

    assert!(t.db.all::<Blog>(session).await.unwrap().is_empty());
    assert_eq!(t.stats.opened(), 1);
}

#[tokio::test]
async fn existing_contexts_keep_their_mapping_after_a_remap() {
    let t = setup().await;
    let (s1, s2) = (Session::new(), Session::new());

    let cx1 = t.db.context(s1).await.unwrap();
    assert_eq!(
        t.db.table_name::<Post>(s1).await.unwrap().table_name,
        "Post"
    );

    t.db.remap_one(s2, month_rule("2019-09-05")).await.unwrap();
    assert_eq!(t.db.generation().get(), 1);

    // s1 keeps the context it had, under the old generation
    assert!(!cx1.is_retired());
    assert_eq!(
        t.db.context(s1).await.unwrap().generation(),
        Generation::INITIAL
    );
    assert_eq!(
        t.db.table_name::<Post>(s1).await.unwrap().table_name,
        "Post"
    );

    // Writes through the stale context land in the old table
    t.db.push_schema(s1).await.unwrap();
    t.db.create(s1, Post::new(1, "stale", "2019-09-05"))
        .await
        .unwrap();
    assert_eq!(t.stored("Post"), 1);
    assert_eq!(t.stored("Post201909"), 0);

    // The remapping session and new sessions see the new mapping
    assert_eq!(
        t.db.table_name::<Post>(s2).await.unwrap().table_name,
        "Post201909"
    );
    assert_eq!(
        t.db.table_name::<Post>(Session::new())
            .await
            .unwrap()
            .table_name,
        "Post201909"
    );

    // s1 picks the new mapping up once its context is recreated
    t.db.close(s1);
    t.db.context(s1).await.unwrap();
    assert_eq!(
        t.db.table_name::<Post>(s1).await.unwrap().table_name,
        "Post201909"
    );
}

#[tokio::test]
async fn remap_disposes_the_replaced_context_once() {
    let t = setup().await;
    let session = Session::new();

    t.db.context(session).await.unwrap();
    assert_eq!((t.stats.opened(), t.stats.closed()), (1, 0));

    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    assert_eq!((t.stats.opened(), t.stats.closed()), (2, 1));

    t.db.remap_one(session, month_rule("2019-10-05")).await.unwrap();
    assert_eq!((t.stats.opened(), t.stats.closed()), (3, 2));

    t.db.close(session);
    assert_eq!((t.stats.opened(), t.stats.closed()), (3, 3));
}

#[tokio::test]
async fn close_is_idempotent() {
    let t = setup().await;
    let session = Session::new();

    let cx = t.db.context(session).await.unwrap();

    t.db.close(session);
    t.db.close(session);

    assert!(t.db.is_closed(session));
    assert!(cx.is_retired());
    assert_eq!(t.stats.closed(), 1);

    drop(cx);
    assert_eq!(t.stats.closed(), 1);
}

#[tokio::test]
async fn dispose_is_idempotent() {
    let t = setup().await;
    let session = Session::new();

    let cx = t.db.context(session).await.unwrap();
    {
        let mut guard = cx.lock().await.unwrap();
        guard.dispose();
        guard.dispose();

        assert!(guard.is_disposed());
        assert!(guard.all::<Blog>().await.unwrap_err().is_context_closed());
    }
    assert_eq!(t.stats.closed(), 1);

    t.db.close(session);
    drop(cx);
    assert_eq!((t.stats.opened(), t.stats.closed()), (1, 1));
}

#[tokio::test]
async fn closed_sessions_reject_operations_until_reopened() {
    let t = setup().await;
    let session = Session::new();

    t.db.push_schema(session).await.unwrap();
    let cx = t.db.context(session).await.unwrap();
    t.db.close(session);

    let err = t.db.all::<Blog>(session).await.unwrap_err();
    assert!(err.is_context_closed(), "{err}");

    let err = t.db.save(session).await.unwrap_err();
    assert!(err.is_context_closed(), "{err}");

    let err = t
        .db
        .change_store(session, "memory://elsewhere")
        .await
        .unwrap_err();
    assert!(err.is_context_closed(), "{err}");

    // Handles taken before the close fail the same way
    assert!(cx.lock().await.unwrap_err().is_context_closed());

    t.db.context(session).await.unwrap();
    assert!(!t.db.is_closed(session));
    assert!(t.db.all::<Blog>(session).await.unwrap().is_empty());
}

#[tokio::test]
async fn remap_of_a_closed_session_fails() {
    let t = setup().await;
    let session = Session::new();

    t.db.context(session).await.unwrap();
    t.db.close(session);

    let err = t
        .db
        .remap_one(session, month_rule("2019-09-05"))
        .await
        .unwrap_err();
    assert!(err.is_context_closed(), "{err}");

    let err = t
        .db
        .remap_store(session, "memory://archive", [month_rule("2019-09-05")])
        .await
        .unwrap_err();
    assert!(err.is_context_closed(), "{err}");

    assert!(t.db.is_closed(session));
    assert_eq!(t.db.generation(), Generation::INITIAL);
    assert_eq!((t.stats.opened(), t.stats.closed()), (1, 1));

    // Reopened, the session remaps again
    t.db.context(session).await.unwrap();
    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    assert_eq!(t.db.generation().get(), 1);
    assert_eq!(
        t.db.table_name::<Post>(session).await.unwrap().table_name,
        "Post201909"
    );
}

#[tokio::test]
async fn closing_a_session_without_a_context_keeps_no_entry() {
    let t = setup().await;

    for _ in 0..1000 {
        t.db.close(Session::new());
    }

    assert_eq!(t.db.session_count(), 0);
    assert_eq!(t.stats.opened(), 0);
}

#[tokio::test]
async fn released_sessions_are_forgotten() {
    let t = setup().await;
    let (open, closed) = (Session::new(), Session::new());

    let cx = t.db.context(open).await.unwrap();
    t.db.context(closed).await.unwrap();
    t.db.close(closed);
    assert_eq!(t.db.session_count(), 2);

    t.db.release(open);
    t.db.release(closed);
    t.db.release(Session::new());

    assert_eq!(t.db.session_count(), 0);
    assert!(cx.is_retired());
    assert_eq!((t.stats.opened(), t.stats.closed()), (2, 2));

    // A released session is not closed
    assert!(!t.db.is_closed(closed));
    assert!(t.db.table_name::<Blog>(closed).await.is_ok());
    assert_eq!(t.db.session_count(), 1);
}

#[tokio::test]
async fn busy_contexts_are_disposed_when_released() {
    let t = setup().await;
    let session = Session::new();

    let cx = t.db.context(session).await.unwrap();
    let guard = cx.lock().await.unwrap();

    // The replaced context is still in use: disposal waits
    t.db.remap_one(session, month_rule("2019-09-05")).await.unwrap();
    assert!(cx.is_retired());
    assert!(!guard.is_disposed());
    assert_eq!((t.stats.opened(), t.stats.closed()), (2, 0));

    drop(guard);

    assert!(cx.lock().await.unwrap_err().is_context_closed());
    assert_eq!((t.stats.opened(), t.stats.closed()), (2, 1));

    drop(cx);
    assert_eq!(t.stats.closed(), 1);
}

#[tokio::test]
async fn driver_errors_keep_the_context() {
    let t = setup().await;
    let session = Session::new();

    // No tables yet
    let err = t.db.all::<Blog>(session).await.unwrap_err();
    assert!(err.is_driver(), "{err}");

    t.db.push_schema(session).await.unwrap();
    assert!(t.db.all::<Blog>(session).await.unwrap().is_empty());
    assert_eq!((t.stats.opened(), t.stats.closed()), (1, 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_lookups_share_one_context() {
    let t = setup().await;
    let session = Session::new();

    let handles = (0..8)
        .map(|_| {
            let db = t.db.clone();
            tokio::spawn(async move { db.context(session).await.unwrap().cache_key() })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        handle.await.unwrap();
    }

    // Contexts built by lookups that lost the race were disposed
    assert_eq!(t.stats.open(), 1);
    assert!(!t.db.is_closed(session));
}
