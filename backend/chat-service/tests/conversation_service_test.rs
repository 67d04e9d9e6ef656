mod common;

use chat_protocol::Role;
use chat_service::error::AppError;
use chat_service::models::ApplicationStatus;
use common::test_env;
use uuid::Uuid;

#[tokio::test]
async fn get_or_create_is_symmetric_for_the_pair() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let admin = env.user("Ada Admin", Role::Admin).await;

    let first = env
        .state
        .conversations
        .get_or_create(&employer, admin.id, None, None)
        .await
        .unwrap();
    let second = env
        .state
        .conversations
        .get_or_create(&admin, employer.id, None, None)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.initiated_by, employer.id);
    assert!(first.user1_id < first.user2_id);
}

#[tokio::test]
async fn repeat_calls_return_identical_conversation() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let student = env.user("Sam Student", Role::Student).await;

    let a = env
        .state
        .conversations
        .get_or_create(&employer, student.id, None, None)
        .await
        .unwrap();
    // the student could not have created it, but an existing row is returned as-is
    let b = env
        .state
        .conversations
        .get_or_create(&student, employer.id, None, None)
        .await
        .unwrap();
    let c = env
        .state
        .conversations
        .get_or_create(&employer, student.id, None, None)
        .await
        .unwrap();

    assert_eq!(a, b);
    assert_eq!(a, c);
    assert_eq!(env.store.conversation_count().await, 1);
}

#[tokio::test]
async fn only_accepted_applications_open_a_conversation() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let student = env.user("Sam Student", Role::Student).await;
    let app = env
        .application(&student, &employer, ApplicationStatus::Pending)
        .await;

    let err = env
        .state
        .conversations
        .get_or_create(&student, employer.id, Some(app.id), None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    assert_eq!(env.store.conversation_count().await, 0);

    assert!(
        env.store
            .set_application_status(app.id, ApplicationStatus::Accepted)
            .await
    );
    let conversation = env
        .state
        .conversations
        .get_or_create(&student, employer.id, Some(app.id), None)
        .await
        .unwrap();
    assert_eq!(conversation.initiated_by, student.id);
    assert_eq!(conversation.application_id, Some(app.id));
    assert_eq!(conversation.job_id, Some(app.job_id));
}

#[tokio::test]
async fn cold_outreach_is_for_employers_and_admins() {
    let env = test_env();
    let student = env.user("Sam Student", Role::Student).await;
    let other_student = env.user("Pat Student", Role::Student).await;
    let employer = env.user("Erin Employer", Role::Employer).await;

    let err = env
        .state
        .conversations
        .get_or_create(&student, other_student.id, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let conversation = env
        .state
        .conversations
        .get_or_create(&employer, student.id, None, None)
        .await
        .unwrap();
    assert_eq!(conversation.initiated_by, employer.id);
}

#[tokio::test]
async fn creation_failures_are_typed() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let student = env.user("Sam Student", Role::Student).await;
    let outsider = env.user("Olive Outsider", Role::Employer).await;
    let app = env
        .application(&student, &employer, ApplicationStatus::Accepted)
        .await;

    let svc = &env.state.conversations;
    assert!(matches!(
        svc.get_or_create(&employer, employer.id, None, None).await,
        Err(AppError::InvalidParticipants)
    ));
    assert!(matches!(
        svc.get_or_create(&employer, Uuid::new_v4(), None, None).await,
        Err(AppError::NotFound("user"))
    ));
    assert!(matches!(
        svc.get_or_create(&employer, student.id, Some(Uuid::new_v4()), None)
            .await,
        Err(AppError::NotFound("application"))
    ));
    // someone else's application
    assert!(matches!(
        svc.get_or_create(&outsider, student.id, Some(app.id), None)
            .await,
        Err(AppError::Forbidden(_))
    ));
}

#[tokio::test]
async fn explicit_job_id_wins_over_application() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let student = env.user("Sam Student", Role::Student).await;
    let app = env
        .application(&student, &employer, ApplicationStatus::Accepted)
        .await;
    let job_id = Uuid::new_v4();

    let conversation = env
        .state
        .conversations
        .get_or_create(&employer, student.id, Some(app.id), Some(job_id))
        .await
        .unwrap();
    assert_eq!(conversation.job_id, Some(job_id));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_calls_create_one_row() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let admin = env.user("Ada Admin", Role::Admin).await;

    let mut handles = Vec::new();
    for i in 0..16 {
        let svc = env.state.conversations.clone();
        let (me, other) = if i % 2 == 0 {
            (employer.clone(), admin.id)
        } else {
            (admin.clone(), employer.id)
        };
        handles.push(tokio::spawn(async move {
            svc.get_or_create(&me, other, None, None).await
        }));
    }

    let mut ids = Vec::new();
    for h in handles {
        ids.push(h.await.unwrap().unwrap().id);
    }
    ids.dedup();
    assert_eq!(ids.len(), 1);
    assert_eq!(env.store.conversation_count().await, 1);
}

#[tokio::test]
async fn inbox_lists_other_user_and_orders_by_activity() {
    let env = test_env();
    let employer = env.user("Erin Employer", Role::Employer).await;
    let first = env.user("Sam Student", Role::Student).await;
    let second = env.user("Pat Student", Role::Student).await;

    let svc = &env.state.conversations;
    let older = svc.get_or_create(&employer, first.id, None, None).await.unwrap();
    let newer = svc.get_or_create(&employer, second.id, None, None).await.unwrap();

    env.state
        .messages
        .send_message(older.id, employer.id, "still there?")
        .await
        .unwrap();

    let inbox = svc.list_conversations(employer.id).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].id, older.id);
    assert_eq!(inbox[0].last_message.as_deref(), Some("still there?"));
    assert_eq!(
        inbox[0].other_user.as_ref().map(|u| u.full_name.as_str()),
        Some("Sam Student")
    );
    assert_eq!(inbox[1].id, newer.id);
    assert_eq!(inbox[1].participants.len(), 2);

    let student_inbox = svc.list_conversations(first.id).await.unwrap();
    assert_eq!(student_inbox.len(), 1);
    assert_eq!(student_inbox[0].unread_count, 1);
}
