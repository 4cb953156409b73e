pub mod files;
pub mod pipeline;
