use actix::prelude::*;
use dispatch_core::{Client, TokenResponse, User};
use dispatch_observability::annotate_span_with_trace_ids;
use tracing::Instrument;

use crate::api::{DestroyedTokens, OAuthDispatch};
use crate::error::DispatchError;

/// Serializes token operations behind an actor mailbox.
pub struct TokenActor {
    dispatch: OAuthDispatch,
}

impl TokenActor {
    pub fn new(dispatch: OAuthDispatch) -> Self {
        Self { dispatch }
    }
}

impl Actor for TokenActor {
    type Context = Context<Self>;
}

#[derive(Message)]
#[rtype(result = "Result<TokenResponse, DispatchError>")]
pub struct IssueToken {
    pub user: User,
    pub client: Client,
    pub expires_in: Option<i64>,
    pub scope: Option<u32>,
    pub span: tracing::Span,
}

impl Handler<IssueToken> for TokenActor {
    type Result = ResponseFuture<Result<TokenResponse, DispatchError>>;

    fn handle(&mut self, msg: IssueToken, _: &mut Self::Context) -> Self::Result {
        let dispatch = self.dispatch.clone();

        let parent_span = msg.span.clone();
        let actor_span = tracing::info_span!(
            parent: &parent_span,
            "actor.token.issue",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            client_id = %msg.client.client_id,
            user_id = %msg.user.id
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(
            async move {
                dispatch
                    .create_access_token(&msg.user, &msg.client, msg.expires_in, msg.scope)
                    .await
            }
            .instrument(actor_span),
        )
    }
}

#[derive(Message)]
#[rtype(result = "Result<TokenResponse, DispatchError>")]
pub struct RefreshToken {
    pub user: User,
    pub client_id: String,
    pub refresh_token: String,
    pub span: tracing::Span,
}

impl Handler<RefreshToken> for TokenActor {
    type Result = ResponseFuture<Result<TokenResponse, DispatchError>>;

    fn handle(&mut self, msg: RefreshToken, _: &mut Self::Context) -> Self::Result {
        let dispatch = self.dispatch.clone();

        let parent_span = msg.span.clone();
        let token_prefix = msg.refresh_token.chars().take(12).collect::<String>();
        let actor_span = tracing::info_span!(
            parent: &parent_span,
            "actor.token.refresh",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            client_id = %msg.client_id,
            user_id = %msg.user.id,
            token_prefix = %token_prefix
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(
            async move {
                dispatch
                    .refresh_access_token(&msg.user, &msg.client_id, &msg.refresh_token)
                    .await
            }
            .instrument(actor_span),
        )
    }
}

#[derive(Message)]
#[rtype(result = "Result<DestroyedTokens, DispatchError>")]
pub struct DestroyUserTokens {
    pub user: User,
    pub span: tracing::Span,
}

impl Handler<DestroyUserTokens> for TokenActor {
    type Result = ResponseFuture<Result<DestroyedTokens, DispatchError>>;

    fn handle(&mut self, msg: DestroyUserTokens, _: &mut Self::Context) -> Self::Result {
        let dispatch = self.dispatch.clone();

        let parent_span = msg.span.clone();
        let actor_span = tracing::info_span!(
            parent: &parent_span,
            "actor.token.destroy",
            trace_id = tracing::field::Empty,
            span_id = tracing::field::Empty,
            user_id = %msg.user.id
        );
        annotate_span_with_trace_ids(&actor_span);

        Box::pin(async move { dispatch.destroy_oauth_tokens(&msg.user).await }.instrument(actor_span))
    }
}
