//! Forum views.
//!
//! Reads answer with JSON payloads, successful writes with `302 Found`.
//! Login-required views return `Unauthenticated`, which the route wrapper in
//! [`urls`](crate::urls) turns into a redirect to the login page.

use crate::forms::{QuestionForm, ResponseForm};
use crate::models::{CONTENT_MAX_LENGTH, DESCRIPTION_MAX_LENGTH, TAG_NAME_MAX_LENGTH, TITLE_MAX_LENGTH};
use crate::state::ForumState;
use crate::urls::question_detail_url;
use crate::votes::{QuestionTarget, ResponseTarget, VoteDirection};
use forum_auth::{RequestUserExt, User};
use forum_core::exception::{Error, FieldErrors, Result};
use forum_http::{FormData, Method, Request, Response as HttpResponse, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;

pub type ViewResult = Result<HttpResponse>;

fn viewer(request: &Request) -> Option<User> {
	request.current_user().into_user()
}

/// `next` as a local redirect target, `/` when absent or pointing off-site
fn local_next(next: Option<&str>) -> String {
	match next {
		Some(path) if path.starts_with('/') && !path.starts_with("//") => path.to_string(),
		_ => "/".to_string(),
	}
}

/// 400 listing field errors and echoing what was submitted
fn invalid_form(errors: FieldErrors, input: &FormData) -> ViewResult {
	HttpResponse::new(StatusCode::BAD_REQUEST).with_json(&json!({
		"errors": errors,
		"input": input.to_json(),
	}))
}

fn or_invalid(result: ViewResult, input: &FormData) -> ViewResult {
	match result {
		Err(Error::Validation(errors)) => invalid_form(errors, input),
		other => other,
	}
}

fn question_form_fields() -> Value {
	json!({
		"title": {"required": true, "max_length": TITLE_MAX_LENGTH},
		"description": {"required": true, "max_length": DESCRIPTION_MAX_LENGTH},
		"tags": {"required": true, "multiple": true, "max_length": TAG_NAME_MAX_LENGTH},
	})
}

fn response_form_fields() -> Value {
	json!({
		"content": {"required": true, "max_length": CONTENT_MAX_LENGTH},
	})
}

/// GET `/`
pub async fn home(state: Arc<ForumState>, request: Request) -> ViewResult {
	let questions = state.queries.list_questions(viewer(&request).as_ref()).await?;
	HttpResponse::json(&json!({ "questions": questions }))
}

/// GET `/about`
pub async fn about(_state: Arc<ForumState>, _request: Request) -> ViewResult {
	HttpResponse::json(&json!({
		"name": "forum",
		"description": "Ask questions, answer them, tag them by topic and vote on what helps.",
	}))
}

/// GET, POST `/question/ask`
pub async fn ask_question(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;

	if request.method == Method::POST {
		let input = request.form_data()?;
		let form = QuestionForm::from_form_data(&input);
		let result = state
			.questions
			.create(&user, &form)
			.await
			.map(|_| HttpResponse::redirect("/"));
		return or_invalid(result, &input);
	}

	let tags = state.queries.list_tags().await?;
	HttpResponse::json(&json!({
		"form": question_form_fields(),
		"tags": tags,
	}))
}

/// GET `/question/{slug}`
pub async fn question_detail(state: Arc<ForumState>, request: Request) -> ViewResult {
	let slug = request.path_param("slug")?;
	let viewer = viewer(&request);

	let question = state
		.queries
		.get_question(slug, viewer.as_ref())
		.await?
		.ok_or_else(|| Error::NotFound(format!("question '{}'", slug)))?;
	let responses = state.queries.list_responses(question.id, viewer.as_ref()).await?;

	HttpResponse::json(&json!({
		"question": question,
		"responses": responses,
		"response_form": response_form_fields(),
	}))
}

/// POST `/answer/question/{id}`
pub async fn post_answer(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let question_id: i64 = request.path_param_as("question_id")?;
	let input = request.form_data()?;

	let slug = state.responses.question_slug(question_id).await?;
	let result = state
		.responses
		.create(&user, question_id, &ResponseForm::from_form_data(&input))
		.await
		.map(|_| HttpResponse::redirect(question_detail_url(&slug)));
	or_invalid(result, &input)
}

async fn vote_question(state: Arc<ForumState>, request: Request, direction: VoteDirection) -> ViewResult {
	let user = request.require_user()?;
	let question_id: i64 = request.path_param_as("question_id")?;
	let input = request.form_data()?;

	state
		.votes
		.cast::<QuestionTarget>(user.id, question_id, direction)
		.await?;
	Ok(HttpResponse::redirect(local_next(input.get("next"))))
}

/// POST `/question/{id}/upvote`
pub async fn upvote_question(state: Arc<ForumState>, request: Request) -> ViewResult {
	vote_question(state, request, VoteDirection::Up).await
}

/// POST `/question/{id}/downvote`
pub async fn downvote_question(state: Arc<ForumState>, request: Request) -> ViewResult {
	vote_question(state, request, VoteDirection::Down).await
}

async fn vote_response(state: Arc<ForumState>, request: Request, direction: VoteDirection) -> ViewResult {
	let user = request.require_user()?;
	let response_id: i64 = request.path_param_as("response_id")?;

	state
		.votes
		.cast::<ResponseTarget>(user.id, response_id, direction)
		.await?;
	let response = state
		.responses
		.get(response_id)
		.await?
		.ok_or_else(|| Error::NotFound(format!("response {}", response_id)))?;
	let slug = state.responses.question_slug(response.question_id).await?;
	Ok(HttpResponse::redirect(question_detail_url(&slug)))
}

/// POST `/response/{id}/upvote`
pub async fn upvote_response(state: Arc<ForumState>, request: Request) -> ViewResult {
	vote_response(state, request, VoteDirection::Up).await
}

/// POST `/response/{id}/downvote`
pub async fn downvote_response(state: Arc<ForumState>, request: Request) -> ViewResult {
	vote_response(state, request, VoteDirection::Down).await
}

/// GET `/tags/{tag}/questions`
pub async fn questions_by_tag(state: Arc<ForumState>, request: Request) -> ViewResult {
	let tag = request.path_param("tag")?;
	let questions = state
		.queries
		.list_questions_by_tag(tag, viewer(&request).as_ref())
		.await?;
	HttpResponse::json(&json!({ "tag": tag, "questions": questions }))
}

/// GET `/questions/asked_by/me`
pub async fn my_questions(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let questions = state.queries.list_questions_by_author(&user).await?;
	HttpResponse::json(&json!({ "questions": questions }))
}

/// GET, POST `/question/{slug}/update`
pub async fn update_question(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let slug = request.path_param("slug")?;
	let next = local_next(request.query_param("next").as_deref());

	if request.method == Method::POST {
		let input = request.form_data()?;
		let form = QuestionForm::from_form_data(&input);
		let result = state
			.questions
			.update(&user, slug, &form)
			.await
			.map(|_| HttpResponse::redirect(&next));
		return or_invalid(result, &input);
	}

	let question = owned_question(&state, &user, slug, "edit").await?;
	HttpResponse::json(&json!({
		"form": question_form_fields(),
		"initial": {
			"title": question.title,
			"description": question.description,
			"tags": question.tag_names(),
		},
		"question": question,
		"next": next,
	}))
}

/// GET, POST `/question/{slug}/delete`
pub async fn delete_question(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let slug = request.path_param("slug")?;
	let next = local_next(request.query_param("next").as_deref());

	if request.method == Method::POST {
		state.questions.delete(&user, slug).await?;
		// The detail page of a deleted question would 404
		let detail_url = question_detail_url(slug);
		let target = if next.trim_end_matches('/') == detail_url {
			"/".to_string()
		} else {
			next
		};
		return Ok(HttpResponse::redirect(target));
	}

	let question = owned_question(&state, &user, slug, "delete").await?;
	HttpResponse::json(&json!({
		"question": question,
		"next": next,
	}))
}

/// GET, POST `/response/update/{id}`
pub async fn update_response(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let response_id: i64 = request.path_param_as("response_id")?;

	if request.method == Method::POST {
		let input = request.form_data()?;
		let result = state
			.responses
			.update(&user, response_id, &ResponseForm::from_form_data(&input))
			.await
			.map(|(_, slug)| HttpResponse::redirect(question_detail_url(&slug)));
		return or_invalid(result, &input);
	}

	let response = owned_response(&state, &user, response_id, "edit").await?;
	HttpResponse::json(&json!({
		"form": response_form_fields(),
		"initial": { "content": response.content },
		"response": response,
	}))
}

/// GET, POST `/response/delete/{id}`
pub async fn delete_response(state: Arc<ForumState>, request: Request) -> ViewResult {
	let user = request.require_user()?;
	let response_id: i64 = request.path_param_as("response_id")?;

	if request.method == Method::POST {
		let slug = state.responses.delete(&user, response_id).await?;
		return Ok(HttpResponse::redirect(question_detail_url(&slug)));
	}

	let response = owned_response(&state, &user, response_id, "delete").await?;
	HttpResponse::json(&json!({ "response": response }))
}

async fn owned_question(
	state: &ForumState,
	user: &User,
	slug: &str,
	action: &str,
) -> Result<crate::models::Question> {
	let question = state
		.questions
		.get_by_slug(slug)
		.await?
		.ok_or_else(|| Error::NotFound(format!("question '{}'", slug)))?;
	if question.questioner_id != user.id {
		return Err(Error::Forbidden(format!(
			"You are not allowed to {} this question.",
			action
		)));
	}
	Ok(question)
}

async fn owned_response(
	state: &ForumState,
	user: &User,
	id: i64,
	action: &str,
) -> Result<crate::models::Response> {
	let response = state
		.responses
		.get(id)
		.await?
		.ok_or_else(|| Error::NotFound(format!("response {}", id)))?;
	if response.respondent_id != user.id {
		return Err(Error::Forbidden(format!(
			"You are not authorized to {} this response.",
			action
		)));
	}
	Ok(response)
}
