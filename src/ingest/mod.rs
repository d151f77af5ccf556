pub mod daily_buckets;
pub mod intraday;
pub mod matrix_csv;
pub mod normalize;

pub use normalize::{iso_date_from_folder_name, parse_numeric, slugify, to_number};
