pub mod comments;
pub mod polls;
pub mod votes;

use axum::{
    routing::{get, patch, post},
    Router,
};
use livepoll_core::AppState;

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/polls", get(polls::list_polls).post(polls::create_poll))
        .route(
            "/polls/{poll_id}",
            get(polls::get_poll)
                .patch(polls::update_poll)
                .delete(polls::delete_poll),
        )
        .route("/polls/{poll_id}/options", post(polls::add_options))
        .route("/polls/{poll_id}/votes", post(votes::cast_vote))
        .route("/polls/{poll_id}/results", get(votes::get_results))
        .route(
            "/polls/{poll_id}/comments",
            get(comments::list_top_level).post(comments::create_comment),
        )
        .route("/polls/{poll_id}/comments/replies", get(comments::list_replies))
        .route(
            "/polls/{poll_id}/comments/{comment_id}",
            patch(comments::edit_comment).delete(comments::delete_comment),
        )
}
