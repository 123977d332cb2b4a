pub mod check;
pub mod notify;
pub mod setup;
pub mod ui;
