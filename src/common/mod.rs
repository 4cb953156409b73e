pub mod response;
pub mod sanitizer;
pub mod upload;
