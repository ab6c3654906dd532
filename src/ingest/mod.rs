mod table;

pub use table::CsvTable;
