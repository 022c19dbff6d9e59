// Application layer - The scraping protocol, independent of any concrete browser
pub mod chart_reader;
pub mod extractor;
pub mod interaction;
pub mod locator;
pub mod page_driver;
pub mod scrape_service;
pub mod snapshot_store;
pub mod stabilizer;
