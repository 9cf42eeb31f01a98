pub mod completions;
pub(crate) mod http_errors;
