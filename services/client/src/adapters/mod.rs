pub mod http;
pub mod store;

pub use http::HttpBackendAdapter;
pub use store::JsonFileStore;
