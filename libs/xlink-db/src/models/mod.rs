pub mod clash;
pub mod inbound;
pub mod traffic;
