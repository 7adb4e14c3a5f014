pub mod config;
pub mod fields;
pub mod packet;

pub use config::GramstatConfig;
pub use packet::{FieldError, Packet, PacketKind, UsagePacket, timestamp_from_ticks};
