//! Route table of the forum.

use crate::state::ForumState;
use crate::views::{self, ViewResult};
use forum_auth::redirect_to_login;
use forum_core::exception::Error;
use forum_http::{Handler, Method, Request, handler_fn};
use forum_urls::{PatternError, Router, path};
use std::future::Future;
use std::sync::Arc;

/// Path of the detail page for the question at `slug`
pub fn question_detail_url(slug: &str) -> String {
	format!("/question/{}", slug)
}

/// Bind `inner` to `state`. An `Unauthenticated` outcome becomes a redirect to
/// the login page carrying the requested path.
fn view<F, Fut>(state: &Arc<ForumState>, inner: F) -> Arc<dyn Handler>
where
	F: Fn(Arc<ForumState>, Request) -> Fut + Send + Sync + 'static,
	Fut: Future<Output = ViewResult> + Send + 'static,
{
	let state = state.clone();
	Arc::new(handler_fn(move |request: Request| {
		let state = state.clone();
		let next = request.full_path();
		let response = inner(state.clone(), request);
		async move {
			match response.await {
				Err(Error::Unauthenticated(_)) => {
					tracing::debug!(%next, "login required");
					Ok(redirect_to_login(&state.login_url, &next))
				}
				other => other,
			}
		}
	}))
}

/// Every forum route, in match order
pub fn routes(state: Arc<ForumState>) -> Result<Router, PatternError> {
	let get = &[Method::GET];
	let post = &[Method::POST];
	let get_post = &[Method::GET, Method::POST];

	Ok(Router::new()
		.route(path("/", view(&state, views::home))?.name("home").methods(get))
		.route(path("/about", view(&state, views::about))?.name("about").methods(get))
		.route(
			path("/question/ask", view(&state, views::ask_question))?
				.name("ask_question")
				.methods(get_post),
		)
		.route(
			path("/question/{question_id:int}/upvote", view(&state, views::upvote_question))?
				.name("upvote_question")
				.methods(post),
		)
		.route(
			path("/question/{question_id:int}/downvote", view(&state, views::downvote_question))?
				.name("downvote_question")
				.methods(post),
		)
		.route(
			path("/question/{slug}/update", view(&state, views::update_question))?
				.name("update_question")
				.methods(get_post),
		)
		.route(
			path("/question/{slug}/delete", view(&state, views::delete_question))?
				.name("delete_question")
				.methods(get_post),
		)
		.route(
			path("/question/{slug}", view(&state, views::question_detail))?
				.name("question_detail")
				.methods(get),
		)
		.route(
			path("/answer/question/{question_id:int}", view(&state, views::post_answer))?
				.name("post_answer")
				.methods(post),
		)
		.route(
			path("/response/{response_id:int}/upvote", view(&state, views::upvote_response))?
				.name("upvote_response")
				.methods(post),
		)
		.route(
			path("/response/{response_id:int}/downvote", view(&state, views::downvote_response))?
				.name("downvote_response")
				.methods(post),
		)
		.route(
			path("/response/update/{response_id:int}", view(&state, views::update_response))?
				.name("update_response")
				.methods(get_post),
		)
		.route(
			path("/response/delete/{response_id:int}", view(&state, views::delete_response))?
				.name("delete_response")
				.methods(get_post),
		)
		.route(
			path("/tags/{tag}/questions", view(&state, views::questions_by_tag))?
				.name("questions_by_tag")
				.methods(get),
		)
		.route(
			path("/questions/asked_by/me", view(&state, views::my_questions))?
				.name("current_user_questions")
				.methods(get),
		))
}
