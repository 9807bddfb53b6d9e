pub mod event;
pub mod intent;
pub mod principal;
pub mod turn;
