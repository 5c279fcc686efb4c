mod connection_tests;
mod health_tests;
