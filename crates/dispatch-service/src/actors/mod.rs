pub mod token_actor;
