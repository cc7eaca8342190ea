mod thing_model_message_producer;

pub use thing_model_message_producer::*;
