mod common;

use chat_protocol::Role;
use chat_service::error::AppError;
use chat_service::models::{Conversation, User};
use common::{test_env, TestEnv};
use std::collections::HashSet;

async fn employer_and_student(env: &TestEnv) -> (User, User, Conversation) {
    let employer = env.user("Erin Employer", Role::Employer).await;
    let student = env.user("Sam Student", Role::Student).await;
    let conversation = env
        .state
        .conversations
        .get_or_create(&employer, student.id, None, None)
        .await
        .unwrap();
    (employer, student, conversation)
}

#[tokio::test]
async fn initiator_speaks_first() {
    let env = test_env();
    let (employer, student, conversation) = employer_and_student(&env).await;
    let messages = &env.state.messages;

    let err = messages
        .send_message(conversation.id, student.id, "hello?")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    messages
        .send_message(conversation.id, employer.id, "Thanks for applying!")
        .await
        .unwrap();
    let reply = messages
        .send_message(conversation.id, student.id, "Thank you!")
        .await
        .unwrap();
    assert_eq!(reply.message.sender_id, student.id);
    assert_eq!(reply.conversation.other_participant(student.id), Some(employer.id));
}

#[tokio::test]
async fn content_is_validated() {
    let env = test_env();
    let (employer, _student, conversation) = employer_and_student(&env).await;
    let messages = &env.state.messages;

    assert!(matches!(
        messages.send_message(conversation.id, employer.id, "   ").await,
        Err(AppError::InvalidInput(_))
    ));
    let too_long = "x".repeat(5001);
    assert!(matches!(
        messages.send_message(conversation.id, employer.id, &too_long).await,
        Err(AppError::InvalidInput(_))
    ));

    let sent = messages
        .send_message(conversation.id, employer.id, "  padded  ")
        .await
        .unwrap();
    assert_eq!(sent.message.content, "padded");
}

#[tokio::test]
async fn outsiders_are_refused_everywhere() {
    let env = test_env();
    let (employer, _student, conversation) = employer_and_student(&env).await;
    let outsider = env.user("Olive Outsider", Role::Admin).await;
    let messages = &env.state.messages;

    messages
        .send_message(conversation.id, employer.id, "hi")
        .await
        .unwrap();

    assert!(matches!(
        messages.send_message(conversation.id, outsider.id, "let me in").await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        messages.list_messages(conversation.id, outsider.id, None, None).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        messages.mark_read(conversation.id, outsider.id).await,
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        messages
            .list_messages(uuid::Uuid::new_v4(), employer.id, None, None)
            .await,
        Err(AppError::NotFound("conversation"))
    ));
}

#[tokio::test]
async fn unread_accounting_and_idempotent_mark_read() {
    let env = test_env();
    let (employer, student, conversation) = employer_and_student(&env).await;

    for text in ["one", "two", "three"] {
        env.state
            .messages
            .send_message(conversation.id, employer.id, text)
            .await
            .unwrap();
    }

    let inbox = env
        .state
        .conversations
        .list_conversations(student.id)
        .await
        .unwrap();
    assert_eq!(inbox[0].unread_count, 3);
    // sender's own messages never count
    let employer_inbox = env
        .state
        .conversations
        .list_conversations(employer.id)
        .await
        .unwrap();
    assert_eq!(employer_inbox[0].unread_count, 0);

    assert_eq!(
        env.state
            .messages
            .mark_read(conversation.id, student.id)
            .await
            .unwrap(),
        3
    );
    let inbox = env
        .state
        .conversations
        .list_conversations(student.id)
        .await
        .unwrap();
    assert_eq!(inbox[0].unread_count, 0);
    assert_eq!(
        env.state
            .messages
            .mark_read(conversation.id, student.id)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn pagination_walks_history_without_gaps() {
    let env = test_env();
    let (employer, student, conversation) = employer_and_student(&env).await;

    for i in 0..120 {
        let sender = if i % 2 == 0 { employer.id } else { student.id };
        env.state
            .messages
            .send_message(conversation.id, sender, &format!("message {i}"))
            .await
            .unwrap();
    }

    let mut pages = Vec::new();
    for page in 1..=3 {
        pages.push(
            env.state
                .messages
                .list_messages(conversation.id, student.id, Some(page), Some(50))
                .await
                .unwrap(),
        );
    }

    assert_eq!(
        pages.iter().map(|p| p.messages.len()).collect::<Vec<_>>(),
        vec![50, 50, 20]
    );
    assert_eq!(pages[0].pagination.total_messages, 120);
    assert_eq!(pages[0].pagination.total_pages, 3);
    assert!(pages[1].pagination.has_more);
    assert!(!pages[2].pagination.has_more);

    // page 1 is the newest slice; oldest history comes from the last page
    let history: Vec<String> = pages
        .iter()
        .rev()
        .flat_map(|p| p.messages.iter().map(|m| m.content.clone()))
        .collect();
    let expected: Vec<String> = (0..120).map(|i| format!("message {i}")).collect();
    assert_eq!(history, expected);

    let ids: HashSet<_> = pages
        .iter()
        .flat_map(|p| p.messages.iter().map(|m| m.id))
        .collect();
    assert_eq!(ids.len(), 120);
}

#[tokio::test]
async fn page_parameters_are_clamped() {
    let env = test_env();
    let (employer, _student, conversation) = employer_and_student(&env).await;
    for i in 0..3 {
        env.state
            .messages
            .send_message(conversation.id, employer.id, &format!("m{i}"))
            .await
            .unwrap();
    }

    let page = env
        .state
        .messages
        .list_messages(conversation.id, employer.id, Some(0), Some(10_000))
        .await
        .unwrap();
    assert_eq!(page.pagination.current_page, 1);
    assert_eq!(page.messages.len(), 3);
    assert_eq!(page.messages[0].content, "m0");

    let default_page = env
        .state
        .messages
        .list_messages(conversation.id, employer.id, None, None)
        .await
        .unwrap();
    assert_eq!(default_page.pagination.total_pages, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_first_sends_respect_the_gate() {
    let env = test_env();
    let (employer, student, conversation) = employer_and_student(&env).await;

    let mut handles = Vec::new();
    for i in 0..10 {
        let svc = env.state.messages.clone();
        let sender = if i % 2 == 0 { student.id } else { employer.id };
        let id = conversation.id;
        handles.push(tokio::spawn(async move {
            (sender, svc.send_message(id, sender, "first!").await)
        }));
    }

    let mut results = Vec::new();
    for h in handles {
        results.push(h.await.unwrap());
    }

    let page = env
        .state
        .messages
        .list_messages(conversation.id, employer.id, None, None)
        .await
        .unwrap();
    assert_eq!(page.messages[0].sender_id, employer.id);

    // every employer send succeeds
    assert!(results
        .iter()
        .filter(|(sender, _)| *sender == employer.id)
        .all(|(_, r)| r.is_ok()));
}
