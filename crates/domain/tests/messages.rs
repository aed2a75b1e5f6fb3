mod common;

use common::{batch, enrolled, services};
use tutorhub_domain::error::DomainError;
use tutorhub_domain::messages::{MessageCreate, ReplyCreate};
use tutorhub_domain::notifications::{NotificationType, Recipient};

fn reply(content: &str) -> ReplyCreate {
    ReplyCreate {
        content: content.to_string(),
        attachment_urls: Vec::new(),
    }
}

#[tokio::test]
async fn replies_are_appended_in_order() {
    let (services, _) = services();
    let teacher = Recipient::teacher("t-1");
    let message = services
        .messages
        .create(
            teacher.clone(),
            MessageCreate {
                subject: "Timetable".into(),
                content: "Class moves to 5pm".into(),
                student_id: Some("s-1".into()),
                ..MessageCreate::default()
            },
        )
        .await
        .expect("create");

    let first = services.messages.new_reply(Recipient::student("s-1"), reply("ok"));
    services
        .messages
        .add_reply(&message.id, first)
        .await
        .expect("first reply");
    let second = services.messages.new_reply(teacher, reply("thanks"));
    let updated = services
        .messages
        .add_reply(&message.id, second)
        .await
        .expect("second reply");

    let contents: Vec<&str> = updated
        .replies
        .iter()
        .map(|reply| reply.content.as_str())
        .collect();
    assert_eq!(contents, vec!["ok", "thanks"]);
    assert_eq!(
        services.messages.get(&message.id).await.expect("get").replies,
        updated.replies
    );
}

#[tokio::test]
async fn reply_to_unknown_message_persists_nothing() {
    let (services, store) = services();
    let reply = services
        .messages
        .new_reply(Recipient::student("s-1"), reply("hello?"));
    let err = services
        .messages
        .add_reply("missing", reply)
        .await
        .expect_err("missing");
    assert!(matches!(err, DomainError::NotFound("message")));
    assert_eq!(store.len("messages").await, 0);
    assert_eq!(store.len("notifications").await, 0);
}

#[tokio::test]
async fn concurrent_replies_are_all_kept() {
    let (services, _) = services();
    let message = services
        .messages
        .create(
            Recipient::teacher("t-1"),
            MessageCreate {
                subject: "Homework".into(),
                content: "Questions?".into(),
                student_id: Some("s-1".into()),
                ..MessageCreate::default()
            },
        )
        .await
        .expect("create");

    let a = services
        .messages
        .new_reply(Recipient::student("s-1"), reply("a"));
    let b = services
        .messages
        .new_reply(Recipient::student("s-1"), reply("b"));
    let (left, right) = tokio::join!(
        services.messages.add_reply(&message.id, a),
        services.messages.add_reply(&message.id, b),
    );
    left.expect("a");
    right.expect("b");

    let stored = services.messages.get(&message.id).await.expect("get");
    assert_eq!(stored.replies.len(), 2);
}

#[tokio::test]
async fn batch_message_reaches_members_and_replies_reach_sender() {
    let (services, _) = services();
    let maths = batch(&services, "Maths", None).await;
    let asha = enrolled(&services, "Asha", &maths.id).await;
    let ravi = enrolled(&services, "Ravi", &maths.id).await;

    let message = services
        .messages
        .create(
            Recipient::teacher(maths.teacher_id.clone()),
            MessageCreate {
                subject: "Holiday".into(),
                content: "No class on Friday".into(),
                batch_id: Some(maths.id.clone()),
                ..MessageCreate::default()
            },
        )
        .await
        .expect("create");

    for student_id in [&asha.id, &ravi.id] {
        let items = services
            .notifications
            .list_for_recipient(student_id, false)
            .await
            .expect("notifications");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].notification_type, NotificationType::Message);
        assert_eq!(items[0].deeplink, format!("/messages/{}", message.id));
    }

    let answer = services
        .messages
        .new_reply(Recipient::student(asha.id.clone()), reply("Noted"));
    services
        .messages
        .add_reply(&message.id, answer)
        .await
        .expect("reply");
    let teacher_items = services
        .notifications
        .list_for_recipient(&maths.teacher_id, false)
        .await
        .expect("teacher notifications");
    assert!(
        teacher_items
            .iter()
            .any(|item| item.notification_type == NotificationType::MessageReply)
    );
    let ravi_items = services
        .notifications
        .list_for_recipient(&ravi.id, false)
        .await
        .expect("ravi notifications");
    assert_eq!(ravi_items.len(), 1);
}
