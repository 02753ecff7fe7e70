pub mod access;
pub mod albums;
pub mod archive;
pub mod auth;
pub mod imaging;
pub mod messages;
pub mod packs;
pub mod qr;
pub mod slug;
pub mod stickers;
pub mod whatsapp;
