//! Print web pages to PDF with a pooled headless Chromium session and publish
//! the result to S3.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
