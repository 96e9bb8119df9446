pub mod app;
pub mod config;
pub mod favorites;
pub mod models;
pub mod pages;
pub mod render;
pub mod tmdb;
