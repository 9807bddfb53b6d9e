pub mod approval_prompt;
pub mod calendar_service;
pub mod classifier;
pub mod confirmation;
pub mod date_resolver;
pub mod event_matcher;
pub mod openai_service;
pub mod orchestrator;
pub mod title_extractor;
