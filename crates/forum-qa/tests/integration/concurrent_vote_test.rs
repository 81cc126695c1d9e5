//! Concurrent casts against a file database with a multi-connection pool.

use crate::fixtures::{count_rows, create_question, create_user, file_db};
use forum_db::DatabaseConnection;
use forum_qa::{QuestionManager, QuestionTarget, VoteEngine, VoteState};
use rstest::rstest;
use tempfile::TempDir;

const CASTS: usize = 20;

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_voter_burst_keeps_one_row(#[future] file_db: (TempDir, DatabaseConnection)) {
	// Arrange
	let (_dir, db) = file_db.await;
	let alice = create_user(&db, "alice").await;
	let bob = create_user(&db, "bob").await;
	let question = create_question(&db, &alice, "Race conditions").await;
	let votes = VoteEngine::new(db.clone());
	let (voter_id, question_id) = (bob.id, question.id);

	// Act
	let handles: Vec<_> = (0..CASTS)
		.map(|_| {
			let votes = votes.clone();
			tokio::spawn(async move { votes.cast_upvote::<QuestionTarget>(voter_id, question_id).await })
		})
		.collect();
	for handle in handles {
		handle.await.unwrap().unwrap();
	}

	// Assert
	let rows = count_rows(&db, "question_votes", &format!("question_id = {}", question.id)).await;
	let stored = QuestionManager::new(db.clone()).get(question.id).await.unwrap().unwrap();
	assert!(rows <= 1);
	assert_eq!(stored.upvotes, rows);
	// An even number of serialized toggles lands back on no vote
	assert_eq!(rows, 0);
	assert_eq!(
		votes.vote_state::<QuestionTarget>(bob.id, question.id).await.unwrap(),
		VoteState::None
	);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_voters_counters_match_rows(#[future] file_db: (TempDir, DatabaseConnection)) {
	// Arrange
	let (_dir, db) = file_db.await;
	let alice = create_user(&db, "alice").await;
	let question = create_question(&db, &alice, "Contention").await;
	let mut voters = Vec::new();
	for i in 0..CASTS {
		voters.push(create_user(&db, &format!("voter{}", i)).await);
	}
	let votes = VoteEngine::new(db.clone());
	let question_id = question.id;

	// Act
	let handles: Vec<_> = voters
		.iter()
		.enumerate()
		.map(|(i, voter)| {
			let votes = votes.clone();
			let voter_id = voter.id;
			tokio::spawn(async move {
				if i % 2 == 0 {
					votes.cast_upvote::<QuestionTarget>(voter_id, question_id).await
				} else {
					votes.cast_downvote::<QuestionTarget>(voter_id, question_id).await
				}
			})
		})
		.collect();
	for handle in handles {
		handle.await.unwrap().unwrap();
	}

	// Assert
	let by_question = format!("question_id = {}", question.id);
	let ups = count_rows(&db, "question_votes", &format!("{} AND vote = 1", by_question)).await;
	let downs = count_rows(&db, "question_votes", &format!("{} AND vote = -1", by_question)).await;
	let stored = QuestionManager::new(db.clone()).get(question.id).await.unwrap().unwrap();
	assert_eq!((ups, downs), ((CASTS / 2) as i64, (CASTS / 2) as i64));
	assert_eq!((stored.upvotes, stored.downvotes), (ups, downs));
}
