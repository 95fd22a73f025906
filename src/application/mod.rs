pub mod app_error;
pub mod change_feed;
pub mod use_cases;
