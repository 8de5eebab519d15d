pub mod config;
pub mod controller;
pub mod errors;
pub mod helpers;
pub mod models;
pub mod presentation;
pub mod repositories;
pub mod services;
