mod common;

use common::{batch, enrolled, services, student};
use tutorhub_domain::error::DomainError;
use tutorhub_domain::membership::BatchSummary;
use tutorhub_domain::notifications::NotificationType;
use tutorhub_domain::students::{BatchRef, StudentCreate};

#[tokio::test]
async fn adding_twice_is_a_conflict() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let asha = enrolled(&services, "Asha", &maths.id).await;
    assert_eq!(asha.batches, vec![BatchRef::Id(maths.id.clone())]);

    let err = services
        .membership
        .add_student_to_batch(&asha.id, &maths.id)
        .await
        .expect_err("second add");
    assert!(matches!(err, DomainError::Conflict(_)));

    let stored = services.students.get(&asha.id).await.expect("student");
    assert_eq!(stored.batches.len(), 1);
}

#[tokio::test]
async fn adding_to_unknown_student_is_not_found() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let err = services
        .membership
        .add_student_to_batch("ghost", &maths.id)
        .await
        .expect_err("missing student");
    assert!(matches!(err, DomainError::NotFound("student")));
}

#[tokio::test]
async fn teacher_hears_about_new_students() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let asha = enrolled(&services, "Asha", &maths.id).await;

    let items = services
        .notifications
        .list_for_recipient(&maths.teacher_id, false)
        .await
        .expect("notifications");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].notification_type, NotificationType::NewStudent);
    assert_eq!(items[0].object_id, asha.id);
    assert_eq!(items[0].title, "Asha joined Maths");
}

#[tokio::test]
async fn concurrent_adds_keep_both_batches() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let physics = batch(&services, "Physics", None).await;
    let asha = student(&services, "Asha").await;

    let (left, right) = tokio::join!(
        services.membership.add_student_to_batch(&asha.id, &maths.id),
        services.membership.add_student_to_batch(&asha.id, &physics.id),
    );
    left.expect("maths");
    right.expect("physics");

    let stored = services.students.get(&asha.id).await.expect("student");
    let mut ids = stored.batch_ids();
    ids.sort();
    let mut expected = vec![maths.id, physics.id];
    expected.sort();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn enrichment_names_known_batches_and_flags_unknown_ones() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let asha = services
        .students
        .create(StudentCreate {
            name: "Asha".into(),
            batches: vec![BatchRef::Id(maths.id.clone()), BatchRef::Id("B2".into())],
            ..StudentCreate::default()
        })
        .await
        .expect("student");

    let roster = services
        .membership
        .students_by_batch(&maths.id)
        .await
        .expect("roster");
    assert_eq!(roster.len(), 1);
    assert_eq!(
        roster[0].batches,
        vec![
            BatchRef::Enriched {
                id: maths.id.clone(),
                name: "Maths".into()
            },
            BatchRef::Enriched {
                id: "B2".into(),
                name: "Unknown Batch".into()
            },
        ]
    );

    let summaries = services
        .membership
        .batches_for_student(&asha.id)
        .await
        .expect("summaries");
    assert_eq!(
        summaries,
        vec![
            BatchSummary {
                id: maths.id.clone(),
                name: "Maths".into()
            },
            BatchSummary {
                id: "B2".into(),
                name: "Unknown Batch".into()
            },
        ]
    );

    let stored = services.students.get(&asha.id).await.expect("student");
    assert!(
        stored
            .batches
            .iter()
            .all(|entry| matches!(entry, BatchRef::Id(_)))
    );
}

#[tokio::test]
async fn removing_a_membership() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let asha = enrolled(&services, "Asha", &maths.id).await;

    let updated = services
        .membership
        .remove_student_from_batch(&asha.id, &maths.id)
        .await
        .expect("remove");
    assert!(updated.batches.is_empty());

    let err = services
        .membership
        .remove_student_from_batch(&asha.id, &maths.id)
        .await
        .expect_err("not a member");
    assert!(matches!(err, DomainError::NotFound(_)));
}
