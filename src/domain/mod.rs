// Domain layer - Payloads, chart observations and selectors
pub mod chart;
pub mod payload;
pub mod selector;
