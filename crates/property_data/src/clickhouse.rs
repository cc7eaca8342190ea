mod ddl;
mod property_table_store;

pub use ddl::*;
pub use property_table_store::*;
