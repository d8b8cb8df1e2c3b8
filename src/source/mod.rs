// Asset sources: remote locators and the transport used to fetch them.

pub mod http_source;
pub mod locator;
pub mod traits;
