pub mod download_all;
pub mod upload;
