pub mod albums;
pub mod collaborators;
pub mod messages;
pub mod packs;
pub mod public;
pub mod share;
pub mod stickers;
