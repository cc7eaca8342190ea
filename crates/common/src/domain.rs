mod deadline;
mod device;
mod physical_table;
mod product;
mod property_value;
mod result;
mod thing_model;
mod thing_model_message;

pub use deadline::*;
pub use device::*;
pub use physical_table::*;
pub use product::*;
pub use property_value::*;
pub use result::*;
pub use thing_model::*;
pub use thing_model_message::*;
