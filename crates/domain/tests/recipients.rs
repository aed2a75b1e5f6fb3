mod common;

use std::collections::HashSet;

use common::{batch, enrolled, services};
use tutorhub_domain::notifications::Recipient;
use tutorhub_domain::recipients::{Scope, UNKNOWN_BATCH};
use tutorhub_domain::students::{BatchRef, Student};

#[tokio::test]
async fn batch_scope_expands_to_members() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let physics = batch(&services, "Physics", None).await;
    let s1 = enrolled(&services, "Asha", &maths.id).await;
    let s2 = enrolled(&services, "Ravi", &maths.id).await;
    enrolled(&services, "Kiran", &physics.id).await;

    let resolved: HashSet<Recipient> = services
        .resolver
        .resolve(&Scope::Batch(maths.id.clone()))
        .await
        .expect("resolve")
        .into_iter()
        .collect();
    let expected: HashSet<Recipient> =
        [Recipient::student(s1.id), Recipient::student(s2.id)].into();
    assert_eq!(resolved, expected);
}

#[tokio::test]
async fn student_and_unaddressed_scopes() {
    let (services, _) = services();
    let direct = services
        .resolver
        .resolve(&Scope::Student("s3".into()))
        .await
        .expect("resolve");
    assert_eq!(direct, vec![Recipient::student("s3")]);

    let none = services
        .resolver
        .resolve(&Scope::from_ids(None, None))
        .await
        .expect("resolve");
    assert!(none.is_empty());
}

#[tokio::test]
async fn missing_batch_degrades_to_placeholder() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    assert_eq!(services.resolver.batch_label(&maths.id).await, "Maths");
    assert_eq!(services.resolver.batch_label("ghost").await, UNKNOWN_BATCH);

    let roster = services
        .resolver
        .resolve(&Scope::Batch("ghost".into()))
        .await
        .expect("resolve");
    assert!(roster.is_empty());
}

#[tokio::test]
async fn enriched_membership_entries_still_match() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    services
        .repos
        .students
        .put(&Student {
            id: "legacy".into(),
            name: "Legacy".into(),
            email: None,
            phone: None,
            grade: None,
            school: None,
            guardian_name: None,
            guardian_phone: None,
            created_at: String::new(),
            batches: vec![BatchRef::Enriched {
                id: maths.id.clone(),
                name: "Maths".into(),
            }],
        })
        .await
        .expect("put");

    let resolved = services
        .resolver
        .resolve(&Scope::Batch(maths.id))
        .await
        .expect("resolve");
    assert_eq!(resolved, vec![Recipient::student("legacy")]);
}
