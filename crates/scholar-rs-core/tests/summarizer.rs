use pretty_assertions::assert_eq;
use scholar_rs_core::{CoreError, CourseSummarizer, NotFoundReason, SummaryOutcome};
use scholar_rs_memory::{
    CourseMessage, MemoryFilter, MemoryKind, MemoryStore, MessageRole, SummaryPolicy,
};
use scholar_rs_test_utils::{FailingEmbedder, FailingLLM, FixedLLM, RecordingChatLLM, relational_store};
use std::sync::Arc;

const SUMMARY: &str = "Topics Covered: tuples\nCurrent Level: beginner\nProgress: steady\n\
                       Challenges: none\nCurrent Focus: tuples";

async fn record_conversation(store: &dyn MemoryStore, course_id: &str, turns: usize) {
    for turn in 1..=turns {
        store
            .append_message(CourseMessage::new(
                course_id,
                MessageRole::User,
                format!("msg-{turn:02} question"),
            ))
            .await
            .expect("user message");
        store
            .append_message(CourseMessage::new(
                course_id,
                MessageRole::Model,
                format!("msg-{turn:02} answer"),
            ))
            .await
            .expect("model message");
    }
}

async fn summaries(store: &dyn MemoryStore, course_id: &str) -> usize {
    let filter = MemoryFilter::default()
        .course(course_id)
        .kind(MemoryKind::CourseSummary);
    store.list(&filter, None).await.expect("list").len()
}

#[tokio::test]
async fn first_summary_inserts_then_updates_in_place() {
    let store = Arc::new(relational_store());
    record_conversation(store.as_ref(), "c1", 2).await;
    let llm = RecordingChatLLM::new(SUMMARY);
    let summarizer =
        CourseSummarizer::new(store.clone(), Arc::new(llm.clone()), SummaryPolicy::default());

    let created = summarizer.summarize("c1", "u1").await.expect("summarize");
    let SummaryOutcome::Created(memory_id) = created else {
        panic!("expected insert, got {created:?}");
    };
    assert!(llm.last_prompt().contains("Previous summary:\n(none)"));

    let updated = summarizer.summarize("c1", "u1").await.expect("summarize again");
    assert_eq!(updated, SummaryOutcome::Updated(memory_id));
    assert_eq!(llm.calls(), 2);
    assert!(llm.last_prompt().contains("Topics Covered: tuples"));
    assert_eq!(summaries(store.as_ref(), "c1").await, 1);

    let stored = store
        .find_summary("c1", "u1")
        .await
        .expect("find")
        .expect("summary");
    assert_eq!(stored.content, SUMMARY);
    assert_eq!(stored.metadata.kind, MemoryKind::CourseSummary);
}

#[tokio::test]
async fn summary_window_keeps_newest_messages_in_order() {
    let store = Arc::new(relational_store());
    record_conversation(store.as_ref(), "c1", 20).await;
    let llm = RecordingChatLLM::new(SUMMARY);
    let policy = SummaryPolicy {
        message_window: 30,
        ..SummaryPolicy::default()
    };
    CourseSummarizer::new(store.clone(), Arc::new(llm.clone()), policy)
        .summarize("c1", "u1")
        .await
        .expect("summarize");

    let prompt = llm.last_prompt();
    assert!(!prompt.contains("msg-05 answer"));
    assert!(prompt.contains("Student: msg-06 question"));
    let earlier = prompt.find("msg-06 question").expect("msg-06");
    let later = prompt.find("msg-20 answer").expect("msg-20");
    assert!(earlier < later);
}

#[tokio::test]
async fn summarize_without_messages_is_not_found() {
    let store = Arc::new(relational_store());
    let llm = RecordingChatLLM::new(SUMMARY);
    let err = CourseSummarizer::new(store, Arc::new(llm.clone()), SummaryPolicy::default())
        .summarize("c1", "u1")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::NotFound(NotFoundReason::NoMessages)
    ));
    assert_eq!(llm.calls(), 0);
}

#[tokio::test]
async fn llm_errors_and_empty_responses_fail_without_writing() {
    let store = Arc::new(relational_store());
    record_conversation(store.as_ref(), "c1", 1).await;

    let failing = CourseSummarizer::new(
        store.clone(),
        Arc::new(FailingLLM::new("rate limited")),
        SummaryPolicy::default(),
    );
    assert!(matches!(
        failing.summarize("c1", "u1").await,
        Err(CoreError::LlmFailed(_))
    ));

    let empty = CourseSummarizer::new(
        store.clone(),
        Arc::new(FixedLLM::new("   ")),
        SummaryPolicy::default(),
    );
    assert!(matches!(
        empty.summarize("c1", "u1").await,
        Err(CoreError::LlmFailed(_))
    ));
    assert_eq!(summaries(store.as_ref(), "c1").await, 0);
}

#[tokio::test]
async fn embedding_failure_stores_zero_vector() {
    let store = Arc::new(relational_store().with_embedder(Arc::new(FailingEmbedder::new(4))));
    record_conversation(store.as_ref(), "c1", 1).await;
    let outcome = CourseSummarizer::new(
        store.clone(),
        Arc::new(FixedLLM::new(SUMMARY)),
        SummaryPolicy::default(),
    )
    .summarize("c1", "u1")
    .await
    .expect("summarize");
    assert!(matches!(outcome, SummaryOutcome::Created(_)));

    let stored = store
        .find_summary("c1", "u1")
        .await
        .expect("find")
        .expect("summary");
    assert_eq!(stored.embedding, Some(vec![0.0; 4]));
}

#[tokio::test]
async fn summaries_are_per_user() {
    let store = Arc::new(relational_store());
    record_conversation(store.as_ref(), "c1", 1).await;
    let summarizer = CourseSummarizer::new(
        store.clone(),
        Arc::new(FixedLLM::new(SUMMARY)),
        SummaryPolicy::default(),
    );
    let first = summarizer.summarize("c1", "u1").await.expect("u1");
    let second = summarizer.summarize("c1", "u2").await.expect("u2");
    assert!(matches!(first, SummaryOutcome::Created(_)));
    assert!(matches!(second, SummaryOutcome::Created(_)));
    assert_ne!(first.memory_id(), second.memory_id());
}
