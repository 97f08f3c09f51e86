//! US902-928 regional parameters.
//!
//! Uplinks use datarates 0-4, downlinks 8-13. The downstream channel is the
//! upstream channel number reduced modulo 8 onto the eight 500 kHz downlink
//! channels starting at 923.3 MHz.

use super::{
    channel_number, round_frequency, DatarateConfig, LoRaRegionType, Region, RegionLimits,
    RegionParams, RxWindow,
};

/// Datarate index of the single 500 kHz uplink configuration; it selects
/// the 1.6 MHz channel grid instead of the 200 kHz one.
const DATARATE_500KHZ: u16 = 4;

const DATARATES: [(u16, DatarateConfig); 11] = [
    (0, DatarateConfig { configuration: "SF10BW125", max_payload_size: 19 }),
    (1, DatarateConfig { configuration: "SF9BW125", max_payload_size: 61 }),
    (2, DatarateConfig { configuration: "SF8BW125", max_payload_size: 133 }),
    (3, DatarateConfig { configuration: "SF7BW125", max_payload_size: 250 }),
    (4, DatarateConfig { configuration: "SF8BW500", max_payload_size: 250 }),
    (8, DatarateConfig { configuration: "SF12BW500", max_payload_size: 61 }),
    (9, DatarateConfig { configuration: "SF11BW500", max_payload_size: 137 }),
    (10, DatarateConfig { configuration: "SF10BW500", max_payload_size: 250 }),
    (11, DatarateConfig { configuration: "SF9BW500", max_payload_size: 250 }),
    (12, DatarateConfig { configuration: "SF8BW500", max_payload_size: 250 }),
    (13, DatarateConfig { configuration: "SF7BW500", max_payload_size: 250 }),
];

const TX_POWERS: [f64; 15] = [
    30.0, 28.0, 26.0, 24.0, 22.0, 20.0, 18.0, 16.0, 14.0, 12.0, 10.0, 8.0, 6.0, 4.0, 2.0,
];

const RX1_DR_OFFSETS: [&[u16]; 5] = [
    &[10, 9, 8, 8],
    &[11, 10, 9, 8],
    &[12, 11, 10, 9],
    &[13, 12, 11, 10],
    &[13, 13, 12, 11],
];

const UPLINK_DATARATE_NAMES: [&str; 5] =
    ["SF10BW125", "SF9BW125", "SF8BW125", "SF7BW125", "SF8BW500"];

const DOWNLINK_DATARATE_NAMES: [&str; 6] = [
    "SF12BW500",
    "SF11BW500",
    "SF10BW500",
    "SF9BW500",
    "SF8BW500",
    "SF7BW500",
];

static PARAMS: RegionParams = RegionParams::new(
    LoRaRegionType::Us915,
    RxWindow { frequency: 923.3, datarate: 8 },
    3,
    &DATARATES,
    &TX_POWERS,
    &RX1_DR_OFFSETS,
    RegionLimits {
        frequency_range: (902.3, 927.5),
        uplink_datarates: &UPLINK_DATARATE_NAMES,
        downlink_datarates: &DOWNLINK_DATARATE_NAMES,
    },
);

pub struct Us915;

impl Region for Us915 {
    fn region_type(&self) -> LoRaRegionType {
        LoRaRegionType::Us915
    }

    fn params(&self) -> &RegionParams {
        &PARAMS
    }

    fn downstream_frequency(
        &self,
        upstream_frequency: f64,
        datarate: u16,
        _join_channel_index: Option<usize>,
    ) -> Option<f64> {
        if !PARAMS.is_valid_uplink(upstream_frequency, datarate) {
            return None;
        }
        let channel = if datarate == DATARATE_500KHZ {
            64 + channel_number(upstream_frequency, 903.0, 1.6)
        } else {
            channel_number(upstream_frequency, 902.3, 0.2)
        };
        if !(0..72).contains(&channel) {
            return None;
        }
        Some(round_frequency(923.3 + (channel % 8) as f64 * 0.6))
    }
}
