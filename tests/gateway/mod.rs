mod auth_tests;
mod chat_tests;
mod session_tests;
