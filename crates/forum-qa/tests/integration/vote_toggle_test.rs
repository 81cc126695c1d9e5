//! Vote toggling through the engine, checked against the stored rows.

use crate::fixtures::{count_rows, create_question, create_user, qa_db};
use forum_core::exception::Error;
use forum_db::DatabaseConnection;
use forum_qa::{
	QuestionTarget, ResponseForm, ResponseManager, ResponseTarget, VoteDirection, VoteEngine,
	VoteState,
};
use rstest::rstest;

#[rstest]
#[tokio::test]
async fn test_up_then_down_then_down(#[future] qa_db: DatabaseConnection) {
	// Arrange
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let bob = create_user(&db, "bob").await;
	let question = create_question(&db, &alice, "How do lifetimes work?").await;
	let votes = VoteEngine::new(db.clone());

	// Act
	let up = votes.cast_upvote::<QuestionTarget>(bob.id, question.id).await.unwrap();
	let flipped = votes.cast_downvote::<QuestionTarget>(bob.id, question.id).await.unwrap();
	let retracted = votes.cast_downvote::<QuestionTarget>(bob.id, question.id).await.unwrap();

	// Assert
	assert_eq!((up.current, up.upvotes, up.downvotes), (VoteState::Up, 1, 0));
	assert_eq!(
		(flipped.previous, flipped.current, flipped.upvotes, flipped.downvotes),
		(VoteState::Up, VoteState::Down, 0, 1)
	);
	assert_eq!(
		(retracted.previous, retracted.current, retracted.upvotes, retracted.downvotes),
		(VoteState::Down, VoteState::None, 0, 0)
	);
	assert_eq!(count_rows(&db, "question_votes", "1 = 1").await, 0);
}

#[rstest]
#[tokio::test]
async fn test_repeated_upvote_retracts(#[future] qa_db: DatabaseConnection) {
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let question = create_question(&db, &alice, "Own question").await;
	let votes = VoteEngine::new(db.clone());

	votes.cast_upvote::<QuestionTarget>(alice.id, question.id).await.unwrap();
	let second = votes.cast_upvote::<QuestionTarget>(alice.id, question.id).await.unwrap();

	assert_eq!(second.current, VoteState::None);
	assert_eq!((second.upvotes, second.downvotes), (0, 0));
	assert_eq!(
		votes.vote_state::<QuestionTarget>(alice.id, question.id).await.unwrap(),
		VoteState::None
	);
}

#[rstest]
#[tokio::test]
async fn test_response_counters_match_vote_rows(#[future] qa_db: DatabaseConnection) {
	// Arrange
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let question = create_question(&db, &alice, "Borrowing").await;
	let response = ResponseManager::new(db.clone())
		.create(&alice, question.id, &ResponseForm::new("Use a reference"))
		.await
		.unwrap();
	let voters = [
		create_user(&db, "bob").await,
		create_user(&db, "carol").await,
		create_user(&db, "dave").await,
	];
	let votes = VoteEngine::new(db.clone());

	// Act
	votes.cast_upvote::<ResponseTarget>(voters[0].id, response.id).await.unwrap();
	votes.cast_upvote::<ResponseTarget>(voters[1].id, response.id).await.unwrap();
	let last = votes.cast_downvote::<ResponseTarget>(voters[2].id, response.id).await.unwrap();

	// Assert
	let condition = format!("response_id = {}", response.id);
	assert_eq!((last.upvotes, last.downvotes), (2, 1));
	assert_eq!(count_rows(&db, "response_votes", &format!("{} AND vote = 1", condition)).await, 2);
	assert_eq!(count_rows(&db, "response_votes", &format!("{} AND vote = -1", condition)).await, 1);
	let stored = ResponseManager::new(db.clone()).get(response.id).await.unwrap().unwrap();
	assert_eq!((stored.upvotes, stored.downvotes), (2, 1));
}

#[rstest]
#[case(VoteDirection::Up, 1)]
#[case(VoteDirection::Down, -1)]
#[tokio::test]
async fn test_stored_row_follows_last_direction(
	#[future] qa_db: DatabaseConnection,
	#[case] direction: VoteDirection,
	#[case] stored: i64,
) {
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let question = create_question(&db, &alice, "Traits").await;
	let votes = VoteEngine::new(db.clone());
	let opposite = match direction {
		VoteDirection::Up => VoteDirection::Down,
		VoteDirection::Down => VoteDirection::Up,
	};

	votes.cast::<QuestionTarget>(alice.id, question.id, opposite).await.unwrap();
	votes.cast::<QuestionTarget>(alice.id, question.id, direction).await.unwrap();

	let condition = format!(
		"user_id = {} AND question_id = {} AND vote = {}",
		alice.id, question.id, stored
	);
	assert_eq!(count_rows(&db, "question_votes", &condition).await, 1);
	assert_eq!(count_rows(&db, "question_votes", "1 = 1").await, 1);
}

#[rstest]
#[tokio::test]
async fn test_missing_target_writes_nothing(#[future] qa_db: DatabaseConnection) {
	let db = qa_db.await;
	let bob = create_user(&db, "bob").await;
	let votes = VoteEngine::new(db.clone());

	let question = votes.cast_upvote::<QuestionTarget>(bob.id, 404).await;
	let response = votes.cast_downvote::<ResponseTarget>(bob.id, 404).await;

	assert!(matches!(question, Err(Error::NotFound(_))));
	assert!(matches!(response, Err(Error::NotFound(_))));
	assert_eq!(count_rows(&db, "question_votes", "1 = 1").await, 0);
	assert_eq!(count_rows(&db, "response_votes", "1 = 1").await, 0);
}

#[rstest]
#[tokio::test]
async fn test_votes_are_per_voter(#[future] qa_db: DatabaseConnection) {
	let db = qa_db.await;
	let alice = create_user(&db, "alice").await;
	let bob = create_user(&db, "bob").await;
	let question = create_question(&db, &alice, "Closures").await;
	let votes = VoteEngine::new(db.clone());

	votes.cast_upvote::<QuestionTarget>(alice.id, question.id).await.unwrap();
	let outcome = votes.cast_downvote::<QuestionTarget>(bob.id, question.id).await.unwrap();

	assert_eq!((outcome.upvotes, outcome.downvotes), (1, 1));
	assert_eq!(
		votes.vote_state::<QuestionTarget>(alice.id, question.id).await.unwrap(),
		VoteState::Up
	);
	assert_eq!(
		votes.vote_state::<QuestionTarget>(bob.id, question.id).await.unwrap(),
		VoteState::Down
	);
}
