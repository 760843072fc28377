/**
 * Routes Module
 * API route handlers
 */

pub mod auth;
pub mod courses;
pub mod health;
pub mod jobs;
pub mod quiz;
