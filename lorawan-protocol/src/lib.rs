//! Protocol definitions for the LoRaWAN network server.
//!
//! This crate holds the side-effect-free half of the server: the MAC header
//! codec, the regional parameter tables with their downstream-frequency
//! resolvers, and the Basics Station JSON message payloads.
//!
//! # MAC header
//!
//! ```text
//! +-------+-----------+-------+
//! | MType |    RFU    | Major |
//! | 3 bit |   3 bit   | 2 bit |
//! +-------+-----------+-------+
//! ```
//!
//! # Example
//!
//! ```rust
//! use lorawan_protocol::{region, LoRaRegionType, MacHeader, MacMessageType};
//!
//! // Decode the first octet of a PHY payload.
//! let header = MacHeader::new(0x00);
//! assert_eq!(header.message_type(), MacMessageType::JoinRequest);
//!
//! // Classify the join channel and compute the downstream reply frequency.
//! let cn470 = region(LoRaRegionType::Cn470);
//! let join_channel = cn470.join_channel_index(470.9);
//! assert_eq!(join_channel, Some(0));
//! assert_eq!(cn470.downstream_frequency(470.3, 1, join_channel), Some(483.9));
//! ```

pub mod error;
pub mod mac_header;
pub mod messages;
pub mod region;

pub use error::{ProtocolError, RegionError};
pub use mac_header::{MacHeader, MacMessageType};
pub use messages::{freq_to_hz, freq_to_mhz, StationMessage, UplinkRadioInfo, MAX_MESSAGE_SIZE};
pub use region::{
    region, DatarateConfig, Direction, LoRaRegionType, Region, RegionLimits, RegionParams,
    RxWindow,
};
