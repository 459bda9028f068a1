pub mod core_api;
pub mod crossref;
pub mod semantic_scholar;
pub mod traits;
pub mod web_search;

pub use core_api::CoreAdapter;
pub use crossref::CrossrefAdapter;
pub use semantic_scholar::SemanticScholarAdapter;
pub use traits::SearchAdapter;
pub use web_search::WebSearchAdapter;
