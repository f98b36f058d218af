use docgate::collection::Filter;
use docgate::errors::ErrorKind;
use docgate::{doc, filter, gateway};
use docgate_int_test::test_util::{
    cleanup, create_batched_test_context, create_john_docs, create_test_context,
    insert_test_documents, run_test, text_field,
};

#[ctor::ctor]
fn init() {
    colog::init();
}

#[test]
fn test_find_one_not_found() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let filter = Filter::eq("first_name", "nobody");
            let err = gateway::find_one(&users, &filter).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::NotFound);
            assert!(err.is_not_found());
            assert_eq!(err.filter(), Some(&filter));
            assert_eq!(err.collection(), Some("users"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_one_by_field() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let found = users.find_one(&Filter::eq("first_name", "fn2")).await?;
            assert_eq!(text_field(&found, "last_name").as_deref(), Some("ln2"));
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_many_with_operators() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let adults = users
                .find_many(&filter! { age: { "$gte": 30 } })
                .await?;
            assert_eq!(adults.len(), 2);

            let same_last_name = users.find_many(&Filter::eq("last_name", "ln2")).await?;
            assert_eq!(same_last_name.len(), 2);

            let none = users.find_many(&Filter::eq("last_name", "ln9")).await?;
            assert!(none.is_empty());
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_many_leaves_filter_untouched() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let filter = filter! { "$or": [{ first_name: "fn1" }, { first_name: "fn3" }] };
            let before = filter.clone();
            let found = users.find_many(&filter).await?;
            assert_eq!(found.len(), 2);
            assert_eq!(filter, before);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_all_returns_everything() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            assert!(users.find_all().await?.is_empty());

            let ids = insert_test_documents(&users).await?;
            let all = gateway::find_all(&users).await?;
            assert_eq!(all.len(), ids.len());
            for document in &all {
                assert!(document.has_id());
            }
            Ok(())
        },
        cleanup,
    )
}

#[cfg(not(feature = "mongodb"))]
#[test]
fn test_find_many_spans_cursor_batches() {
    run_test(
        || create_batched_test_context(1),
        |ctx| async move {
            let users = ctx.collection("users");
            users.insert_many(create_john_docs()).await?;
            users.insert_one(doc! { name: "jane", email: "testEmail3" }).await?;

            let johns = users.find_many(&Filter::eq("name", "john")).await?;
            let emails: Vec<String> = johns
                .iter()
                .filter_map(|d| text_field(d, "email"))
                .collect();
            assert_eq!(emails, vec!["testEmail1", "testEmail2"]);
            Ok(())
        },
        cleanup,
    )
}

#[cfg(not(feature = "mongodb"))]
#[test]
fn test_find_rejects_unknown_operator() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let err = users
                .find_many(&filter! { "$where": "true" })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ReadError);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_by_embedded_field_path() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let parisians = users.find_many(&filter! { "address.city": "Paris" }).await?;
            assert_eq!(parisians.len(), 1);
            assert_eq!(text_field(&parisians[0], "first_name").as_deref(), Some("fn2"));

            let berlin = users.find_many(&Filter::eq("address.zip", 10115)).await?;
            assert_eq!(berlin.len(), 1);

            let nearby = users
                .find_many(&filter! { "address.zip": { "$gte": 10000, "$lt": 20000 } })
                .await?;
            assert_eq!(nearby.len(), 2);
            Ok(())
        },
        cleanup,
    )
}

#[test]
fn test_find_with_invalid_filter_is_read_error() {
    run_test(
        create_test_context,
        |ctx| async move {
            let users = ctx.collection("users");
            insert_test_documents(&users).await?;

            let err = users.find_one(&Filter::eq("_id", "fn1")).await.unwrap_err();
            assert_eq!(err.kind(), &ErrorKind::ReadError);
            assert!(!err.is_not_found());
            assert_eq!(err.root_cause().kind(), &ErrorKind::FilterError);
            Ok(())
        },
        cleanup,
    )
}
