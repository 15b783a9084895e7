pub mod cache;
pub mod config;
pub mod exception;
pub mod form;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod param;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod templates;
pub mod util;
pub mod validator;

pub use cache::AssetCache;
pub use config::Config;
pub use exception::Exception;
pub use form::{FormData, SnippetCreateForm};
pub use handlers::App;
pub use models::{ModelError, Snippet, SnippetModel, SnippetStore};
pub use param::{HttpEncoding, HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use server::ServerState;
pub use templates::{TemplateCache, TemplateData, TemplateError};
pub use util::HtmlBuilder;
pub use validator::Validator;
