// Chart scraper - extracts table and doughnut data from a rendered HTML report
pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod presentation;
