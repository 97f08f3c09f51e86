//! EU863-870 regional parameters.

use super::{
    DatarateConfig, LoRaRegionType, Region, RegionLimits, RegionParams, RxWindow,
};

const DATARATES: [(u16, DatarateConfig); 8] = [
    (0, DatarateConfig { configuration: "SF12BW125", max_payload_size: 59 }),
    (1, DatarateConfig { configuration: "SF11BW125", max_payload_size: 59 }),
    (2, DatarateConfig { configuration: "SF10BW125", max_payload_size: 59 }),
    (3, DatarateConfig { configuration: "SF9BW125", max_payload_size: 123 }),
    (4, DatarateConfig { configuration: "SF8BW125", max_payload_size: 230 }),
    (5, DatarateConfig { configuration: "SF7BW125", max_payload_size: 230 }),
    (6, DatarateConfig { configuration: "SF7BW250", max_payload_size: 230 }),
    (7, DatarateConfig { configuration: "50", max_payload_size: 230 }),
];

const TX_POWERS: [f64; 8] = [16.0, 14.0, 12.0, 10.0, 8.0, 6.0, 4.0, 2.0];

const RX1_DR_OFFSETS: [&[u16]; 8] = [
    &[0, 0, 0, 0, 0, 0],
    &[1, 0, 0, 0, 0, 0],
    &[2, 1, 0, 0, 0, 0],
    &[3, 2, 1, 0, 0, 0],
    &[4, 3, 2, 1, 0, 0],
    &[5, 4, 3, 2, 1, 0],
    &[6, 5, 4, 3, 2, 1],
    &[7, 6, 5, 4, 3, 2],
];

const VALID_DATARATE_NAMES: [&str; 8] = [
    "SF12BW125",
    "SF11BW125",
    "SF10BW125",
    "SF9BW125",
    "SF8BW125",
    "SF7BW125",
    "SF7BW250",
    "50",
];

static PARAMS: RegionParams = RegionParams::new(
    LoRaRegionType::Eu868,
    RxWindow { frequency: 869.525, datarate: 0 },
    5,
    &DATARATES,
    &TX_POWERS,
    &RX1_DR_OFFSETS,
    RegionLimits {
        frequency_range: (863.0, 870.0),
        uplink_datarates: &VALID_DATARATE_NAMES,
        downlink_datarates: &VALID_DATARATE_NAMES,
    },
);

pub struct Eu868;

impl Region for Eu868 {
    fn region_type(&self) -> LoRaRegionType {
        LoRaRegionType::Eu868
    }

    fn params(&self) -> &RegionParams {
        &PARAMS
    }

    /// RX1 answers on the uplink channel; the join-channel index plays no
    /// role in this region.
    fn downstream_frequency(
        &self,
        upstream_frequency: f64,
        datarate: u16,
        _join_channel_index: Option<usize>,
    ) -> Option<f64> {
        if !PARAMS.is_valid_uplink(upstream_frequency, datarate) {
            return None;
        }
        Some(upstream_frequency)
    }
}
