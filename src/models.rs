pub mod geo;
pub mod map_info;
pub mod sub_file;
pub mod tile;
