pub mod message;

pub use message::{DeviceReading, Message, Payload};
