mod common;

use actix::Actor;
use oauth_dispatch::actors::{DestroyUserTokens, IssueToken, RefreshToken, TokenActor};
use oauth_dispatch::storage::TokenSchema;
use oauth_dispatch::DispatchError;

#[actix_rt::test]
async fn token_actor_issues_refreshes_and_destroys() {
    let ctx = common::setup().await;
    let user = common::user("alice");
    let client = common::public_client(&ctx, &user, "actor-client").await;
    let actor = TokenActor::new(ctx.dispatch.clone()).start();

    let token = actor
        .send(IssueToken {
            user: user.clone(),
            client: client.clone(),
            expires_in: None,
            scope: None,
            span: tracing::Span::current(),
        })
        .await
        .expect("mailbox")
        .expect("issue");
    assert_eq!(token.scope, "default");

    let refreshed = actor
        .send(RefreshToken {
            user: user.clone(),
            client_id: client.client_id.clone(),
            refresh_token: token.refresh_token.clone(),
            span: tracing::Span::current(),
        })
        .await
        .expect("mailbox")
        .expect("refresh");
    assert_ne!(refreshed.refresh_token, token.refresh_token);

    let destroyed = actor
        .send(DestroyUserTokens {
            user: user.clone(),
            span: tracing::Span::current(),
        })
        .await
        .expect("mailbox")
        .expect("destroy");
    let current = destroyed.get(TokenSchema::Current).unwrap();
    assert_eq!(current.access_tokens, 1);
    assert_eq!(current.refresh_tokens, 2);
}

#[actix_rt::test]
async fn token_actor_passes_errors_through() {
    let ctx = common::setup().await;
    let user = common::user("alice");
    let actor = TokenActor::new(ctx.dispatch.clone()).start();

    let err = actor
        .send(RefreshToken {
            user,
            client_id: "missing-client".to_string(),
            refresh_token: "missing-token".to_string(),
            span: tracing::Span::current(),
        })
        .await
        .expect("mailbox")
        .unwrap_err();

    match err {
        DispatchError::Protocol(err) => assert_eq!(err.error, "invalid_client"),
        other => panic!("expected a protocol error, got {other:?}"),
    }
}
