pub mod album;
pub mod message;
pub mod pack;
pub mod sticker;

pub use album::*;
pub use message::*;
pub use pack::*;
pub use sticker::*;
