pub mod extract;
mod parser;
pub mod pipeline;
pub mod scraper;
pub mod sink;
pub mod types;
pub mod utils;

pub use parser::ParseError;
pub use pipeline::{FailurePolicy, RunError, StatsPipeline};
pub use scraper::{PageSource, ScraperError, WebScraper};

/// Index page of the weekly surveillance bulletins.
pub const LIST_URL: &str = "https://www.chinacdc.cn/jkzt/crb/zl/szkb_11803/jszl_13141/";
