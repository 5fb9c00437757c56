pub mod mac;
pub mod probe;
pub mod proxy;
pub mod sweep;
pub mod wol;
