pub mod activity;
pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod contact;
pub mod db;
pub mod error;
pub mod extract;
pub mod properties;
pub mod shortlist;
pub mod state;
pub mod storage;
pub mod users;
