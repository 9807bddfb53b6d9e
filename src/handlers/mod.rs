pub mod action;
pub mod discord;
pub mod discord_responder;
