pub mod config;
pub mod error;
pub mod header;
pub mod map_file;
pub mod read_buffer;
