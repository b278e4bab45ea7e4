pub extern crate serde_json;

mod drawing;
mod message;
mod name;

pub use drawing::*;
pub use message::*;
pub use name::*;
