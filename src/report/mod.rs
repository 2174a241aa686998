pub mod data_file;
pub mod json;
pub mod prompt;
pub mod zip;
