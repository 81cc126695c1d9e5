use forum_db::Migration;

/// Depends on `auth.0001_initial` for the `users` table.
pub const MIGRATIONS: &[Migration] = &[Migration::new(
	"qa",
	"0001_initial",
	&[
		"CREATE TABLE tags (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			name VARCHAR(40) NOT NULL UNIQUE
		)",
		"CREATE TABLE questions (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			title VARCHAR(200) NOT NULL,
			description VARCHAR(600) NOT NULL,
			questioner_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			upvotes INTEGER NOT NULL DEFAULT 0,
			downvotes INTEGER NOT NULL DEFAULT 0,
			created_at BIGINT NOT NULL,
			updated_at BIGINT NOT NULL,
			slug VARCHAR(400) NOT NULL UNIQUE
		)",
		"CREATE INDEX questions_questioner_id ON questions (questioner_id)",
		"CREATE TABLE question_tags (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			question_id INTEGER NOT NULL REFERENCES questions (id) ON DELETE CASCADE,
			tag_id INTEGER NOT NULL REFERENCES tags (id) ON DELETE CASCADE,
			UNIQUE (question_id, tag_id)
		)",
		"CREATE INDEX question_tags_tag_id ON question_tags (tag_id)",
		"CREATE TABLE responses (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			content VARCHAR(600) NOT NULL,
			respondent_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			question_id INTEGER NOT NULL REFERENCES questions (id) ON DELETE CASCADE,
			upvotes INTEGER NOT NULL DEFAULT 0,
			downvotes INTEGER NOT NULL DEFAULT 0,
			created_at BIGINT NOT NULL,
			updated_at BIGINT NOT NULL
		)",
		"CREATE INDEX responses_question_id ON responses (question_id)",
		"CREATE TABLE question_votes (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			question_id INTEGER NOT NULL REFERENCES questions (id) ON DELETE CASCADE,
			vote INTEGER NOT NULL CHECK (vote IN (1, -1)),
			UNIQUE (user_id, question_id)
		)",
		"CREATE INDEX question_votes_question_id ON question_votes (question_id)",
		"CREATE TABLE response_votes (
			id INTEGER PRIMARY KEY AUTOINCREMENT,
			user_id INTEGER NOT NULL REFERENCES users (id) ON DELETE CASCADE,
			response_id INTEGER NOT NULL REFERENCES responses (id) ON DELETE CASCADE,
			vote INTEGER NOT NULL CHECK (vote IN (1, -1)),
			UNIQUE (user_id, response_id)
		)",
		"CREATE INDEX response_votes_response_id ON response_votes (response_id)",
	],
)];
