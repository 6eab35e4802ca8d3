pub mod stock;
pub mod financial;
pub mod response;
pub mod table;

pub use stock::*;
pub use financial::*;
pub use response::*;
pub use table::{
    camel_to_snake, f64_to_value, value_as_f64, value_as_i64, ColumnInfo, ColumnType, DataTable,
    Row, TableInfo,
};
