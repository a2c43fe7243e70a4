use chrono::Duration;
use course_core::model::{
    Approval, ApprovalPolicy, Course, CourseId, LearnerName, Lesson, LessonId, NewAssignment,
    SubmissionContent, UNTITLED_LESSON,
};
use course_core::time::fixed_now;
use storage::repository::{AssignmentStore, ContentStore, CourseWriter, StorageError};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn build_lesson(id: u64, course_id: CourseId, minutes: i64) -> Lesson {
    Lesson::new(
        LessonId::new(id),
        course_id,
        format!("Lesson {id}"),
        fixed_now() + Duration::minutes(minutes),
    )
    .unwrap()
    .with_content(format!("body {id}"))
}

fn draft(lesson_id: u64, learner: &str, minutes: i64) -> NewAssignment {
    NewAssignment::new(
        LearnerName::parse(learner).unwrap(),
        LessonId::new(lesson_id),
        CourseId::new(1),
        SubmissionContent::parse("my answer").unwrap(),
        fixed_now() + Duration::minutes(minutes),
    )
}

async fn seed_course(repo: &SqliteRepository) -> CourseId {
    let course_id = CourseId::new(1);
    let course = Course::new(course_id, "Rust", fixed_now())
        .unwrap()
        .with_duration("3 weeks")
        .with_category("Programming");
    repo.upsert_course(&course).await.unwrap();
    repo.replace_lessons(
        course_id,
        &[
            build_lesson(3, course_id, 20),
            build_lesson(1, course_id, 0)
                .with_video_url(Some("https://www.youtube.com/watch?v=abc".into()))
                .with_assignment(Some("Explain moves".into())),
            build_lesson(2, course_id, 10),
        ],
    )
    .await
    .unwrap();
    course_id
}

#[tokio::test]
async fn sqlite_roundtrips_course_and_ordered_lessons() {
    let repo = connect("memdb_content").await;
    let course_id = seed_course(&repo).await;

    let course = repo.get_course(course_id).await.unwrap().expect("course");
    assert_eq!(course.title(), "Rust");
    assert_eq!(course.duration(), "3 weeks");
    assert!(repo.get_course(CourseId::new(99)).await.unwrap().is_none());

    let lessons = repo.list_lessons(course_id).await.unwrap();
    let ids: Vec<u64> = lessons.iter().filter_map(|l| l.id().as_u64()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(lessons[0].assignment(), Some("Explain moves"));
    assert_eq!(
        lessons[0].embed_url().unwrap().as_str(),
        "https://www.youtube.com/embed/abc"
    );
    assert!(repo.list_lessons(CourseId::new(99)).await.unwrap().is_empty());

    let courses = repo.list_courses(10).await.unwrap();
    assert_eq!(courses.len(), 1);
}

#[tokio::test]
async fn sqlite_replace_lessons_keeps_surviving_ids() {
    let repo = connect("memdb_replace").await;
    let course_id = seed_course(&repo).await;

    repo.replace_lessons(
        course_id,
        &[build_lesson(1, course_id, 0), build_lesson(4, course_id, 30)],
    )
    .await
    .unwrap();

    let ids: Vec<u64> = repo
        .list_lessons(course_id)
        .await
        .unwrap()
        .iter()
        .filter_map(|l| l.id().as_u64())
        .collect();
    assert_eq!(ids, vec![1, 4]);
}

#[tokio::test]
async fn sqlite_loads_lessons_with_free_text_video_and_blank_title() {
    let repo = connect("memdb_sloppy_rows").await;
    let course_id = seed_course(&repo).await;

    sqlx::query(
        "INSERT INTO lessons (id, course_id, title, video_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(5_i64)
    .bind(1_i64)
    .bind("   ")
    .bind("youtube.com/watch?v=abc")
    .bind(fixed_now() + Duration::minutes(40))
    .execute(repo.pool())
    .await
    .unwrap();

    let lessons = repo.list_lessons(course_id).await.unwrap();
    assert_eq!(lessons.len(), 4);
    let sloppy = &lessons[3];
    assert_eq!(sloppy.id(), LessonId::new(5));
    assert_eq!(sloppy.title(), UNTITLED_LESSON);
    assert_eq!(sloppy.video_url(), Some("youtube.com/watch?v=abc"));
    assert_eq!(
        sloppy.embed_url().unwrap().as_str(),
        "https://youtube.com/embed/abc"
    );
}

#[tokio::test]
async fn sqlite_rejects_uuid_keys() {
    let repo = connect("memdb_uuid_key").await;
    let id: CourseId = "3f1c2a9e-6b7d-4e21-9a0c-1d2e3f4a5b6c".parse().unwrap();
    assert!(matches!(
        repo.get_course(id).await.unwrap_err(),
        StorageError::Serialization(_)
    ));
}

#[tokio::test]
async fn sqlite_assignments_flow_through_approval() {
    let repo = connect("memdb_assignments").await;
    seed_course(&repo).await;
    let alice = LearnerName::parse("alice").unwrap();

    assert_eq!(
        repo.get_approval(LessonId::new(1), &alice, ApprovalPolicy::AnyApproved)
            .await
            .unwrap(),
        None
    );

    let first = repo.create_assignment(draft(1, "alice", 0)).await.unwrap();
    assert!(!first.is_approved());
    assert_eq!(
        repo.get_approval(LessonId::new(1), &alice, ApprovalPolicy::AnyApproved)
            .await
            .unwrap(),
        Some(Approval { approved: false })
    );

    repo.set_approved(first.id(), true).await.unwrap();
    repo.create_assignment(draft(1, "alice", 5)).await.unwrap();

    assert_eq!(
        repo.get_approval(LessonId::new(1), &alice, ApprovalPolicy::AnyApproved)
            .await
            .unwrap(),
        Some(Approval { approved: true })
    );
    assert_eq!(
        repo.get_approval(LessonId::new(1), &alice, ApprovalPolicy::MostRecent)
            .await
            .unwrap(),
        Some(Approval { approved: false })
    );

    let listed = repo.list_assignments(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(!listed[0].assignment.is_approved());
    assert_eq!(listed[1].lesson_title.as_deref(), Some("Lesson 1"));
    assert_eq!(listed[1].course_title.as_deref(), Some("Rust"));

    repo.delete_assignment(first.id()).await.unwrap();
    assert!(matches!(
        repo.delete_assignment(first.id()).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert!(matches!(
        repo.set_approved(first.id(), true).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test]
async fn sqlite_migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
}
