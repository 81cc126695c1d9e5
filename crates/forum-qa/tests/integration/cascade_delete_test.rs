//! Deleting a question removes everything hanging off it.

use crate::fixtures::{count_rows, create_question, create_user, qa_db};
use forum_db::DatabaseConnection;
use forum_qa::{
	QuestionManager, QuestionTarget, ResponseForm, ResponseManager, ResponseTarget, TagManager,
	VoteEngine,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_question_delete_cascades(#[future] qa_db: DatabaseConnection) {
	// Arrange
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let bob = create_user(&db, "bob").await;
	let doomed = create_question(&db, &alice, "Doomed").await;
	let kept = create_question(&db, &alice, "Kept").await;
	let responses = ResponseManager::new(db.clone());
	let answer = responses
		.create(&bob, doomed.id, &ResponseForm::new("An answer"))
		.await
		.unwrap();
	responses
		.create(&bob, kept.id, &ResponseForm::new("Another answer"))
		.await
		.unwrap();
	let votes = VoteEngine::new(db.clone());
	votes.cast_upvote::<QuestionTarget>(bob.id, doomed.id).await.unwrap();
	votes.cast_downvote::<ResponseTarget>(alice.id, answer.id).await.unwrap();

	// Act
	QuestionManager::new(db.clone())
		.delete(&alice, &doomed.slug)
		.await
		.unwrap();

	// Assert
	let by_question = format!("question_id = {}", doomed.id);
	assert_eq!(count_rows(&db, "questions", &format!("id = {}", doomed.id)).await, 0);
	assert_eq!(count_rows(&db, "responses", &by_question).await, 0);
	assert_eq!(count_rows(&db, "question_votes", &by_question).await, 0);
	assert_eq!(count_rows(&db, "question_tags", &by_question).await, 0);
	assert_eq!(
		count_rows(&db, "response_votes", &format!("response_id = {}", answer.id)).await,
		0
	);
	assert_eq!(count_rows(&db, "responses", &format!("question_id = {}", kept.id)).await, 1);
}

#[rstest]
#[tokio::test]
async fn test_tags_outlive_their_questions(#[future] qa_db: DatabaseConnection) {
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let question = create_question(&db, &alice, "Tagged").await;

	QuestionManager::new(db.clone())
		.delete(&alice, &question.slug)
		.await
		.unwrap();

	let tag = TagManager::new(db.clone()).get_by_name("rust").await.unwrap();
	assert!(tag.is_some());
}

#[rstest]
#[tokio::test]
async fn test_user_delete_cascades_to_content(#[future] qa_db: DatabaseConnection) {
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let bob = create_user(&db, "bob").await;
	let question = create_question(&db, &alice, "Leaving soon").await;
	ResponseManager::new(db.clone())
		.create(&bob, question.id, &ResponseForm::new("Bye"))
		.await
		.unwrap();

	db.execute(&format!("DELETE FROM users WHERE id = {}", alice.id))
		.await
		.unwrap();

	assert_eq!(count_rows(&db, "questions", "1 = 1").await, 0);
	assert_eq!(count_rows(&db, "responses", "1 = 1").await, 0);
}
