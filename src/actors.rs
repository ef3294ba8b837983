pub use dispatch_service::actors::token_actor::{
    DestroyUserTokens, IssueToken, RefreshToken, TokenActor,
};
