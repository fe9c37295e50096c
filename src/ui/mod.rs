pub mod table;

pub use table::hunters_table;
