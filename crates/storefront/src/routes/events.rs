//! Auth state stream for open dashboard pages.
//!
//! The page keeps an `EventSource` on `/api/auth/events`. When the viewer is
//! signed out anywhere, the stream sends one `signed-out` event carrying the
//! login URL and ends. The subscription lives inside the stream, so it is
//! released when the stream finishes or the browser disconnects.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use tracing::instrument;

use shopwave_core::UserId;

use crate::gateway::{AuthEventKind, AuthSubscription};
use crate::middleware::RequireUser;
use crate::state::AppState;

/// Where a signed-out page should go.
const SIGNED_OUT_REDIRECT: &str = "/login";

/// Stream auth state changes for the signed-in user.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn auth_events(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = state.gateway().auth_events().subscribe();
    Sse::new(signed_out_stream(subscription, user.id)).keep_alive(KeepAlive::default())
}

/// Yields a single `signed-out` event once `user_id` signs out, then ends.
fn signed_out_stream(
    subscription: AuthSubscription,
    user_id: UserId,
) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(Some((subscription, user_id)), |state| async move {
        let (mut subscription, user_id) = state?;
        loop {
            let event = subscription.recv().await?;
            if event.kind == AuthEventKind::SignedOut && event.user_id == user_id {
                let sse = Event::default()
                    .event(AuthEventKind::SignedOut.as_str())
                    .data(SIGNED_OUT_REDIRECT);
                // Dropping the subscription here ends the stream.
                return Some((Ok(sse), None));
            }
        }
    })
}
