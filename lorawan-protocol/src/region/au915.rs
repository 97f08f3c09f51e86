//! AU915-928 regional parameters.
//!
//! Same split-table shape as US915: uplinks on datarates 0-6, downlinks on
//! 8-13, downstream channel reduced modulo 8 onto the 923.3 MHz grid.

use super::{
    channel_number, round_frequency, DatarateConfig, LoRaRegionType, Region, RegionLimits,
    RegionParams, RxWindow,
};

/// Datarate index of the 500 kHz uplink configuration.
const DATARATE_500KHZ: u16 = 6;

const DATARATES: [(u16, DatarateConfig); 13] = [
    (0, DatarateConfig { configuration: "SF12BW125", max_payload_size: 59 }),
    (1, DatarateConfig { configuration: "SF11BW125", max_payload_size: 59 }),
    (2, DatarateConfig { configuration: "SF10BW125", max_payload_size: 59 }),
    (3, DatarateConfig { configuration: "SF9BW125", max_payload_size: 123 }),
    (4, DatarateConfig { configuration: "SF8BW125", max_payload_size: 230 }),
    (5, DatarateConfig { configuration: "SF7BW125", max_payload_size: 230 }),
    (6, DatarateConfig { configuration: "SF8BW500", max_payload_size: 230 }),
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

/// Downlink datarate is `uplink + 8 - offset`, clamped to the 8..=13 window.
const RX1_DR_OFFSETS: [&[u16]; 7] = [
    &[8, 8, 8, 8, 8, 8],
    &[9, 8, 8, 8, 8, 8],
    &[10, 9, 8, 8, 8, 8],
    &[11, 10, 9, 8, 8, 8],
    &[12, 11, 10, 9, 8, 8],
    &[13, 12, 11, 10, 9, 8],
    &[13, 13, 12, 11, 10, 9],
];

const UPLINK_DATARATE_NAMES: [&str; 7] = [
    "SF12BW125",
    "SF11BW125",
    "SF10BW125",
    "SF9BW125",
    "SF8BW125",
    "SF7BW125",
    "SF8BW500",
];

const DOWNLINK_DATARATE_NAMES: [&str; 6] = [
    "SF12BW500",
    "SF11BW500",
    "SF10BW500",
    "SF9BW500",
    "SF8BW500",
    "SF7BW500",
];

static PARAMS: RegionParams = RegionParams::new(
    LoRaRegionType::Au915,
    RxWindow { frequency: 923.3, datarate: 8 },
    5,
    &DATARATES,
    &TX_POWERS,
    &RX1_DR_OFFSETS,
    RegionLimits {
        frequency_range: (915.2, 927.8),
        uplink_datarates: &UPLINK_DATARATE_NAMES,
        downlink_datarates: &DOWNLINK_DATARATE_NAMES,
    },
);

pub struct Au915;

impl Region for Au915 {
    fn region_type(&self) -> LoRaRegionType {
        LoRaRegionType::Au915
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
            64 + channel_number(upstream_frequency, 915.9, 1.6)
        } else {
            channel_number(upstream_frequency, 915.2, 0.2)
        };
        if !(0..72).contains(&channel) {
            return None;
        }
        Some(round_frequency(923.3 + (channel % 8) as f64 * 0.6))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_125khz_channels() {
        assert_eq!(Au915.downstream_frequency(915.2, 0, None), Some(923.3));
        assert_eq!(Au915.downstream_frequency(916.6, 5, None), Some(927.5));
        assert_eq!(Au915.downstream_frequency(916.8, 0, None), Some(923.3));
    }

    #[test]
    fn test_downstream_500khz_channels() {
        assert_eq!(Au915.downstream_frequency(915.9, 6, None), Some(923.3));
        assert_eq!(Au915.downstream_frequency(917.5, 6, None), Some(923.9));
    }

    #[test]
    fn test_downstream_fails_closed() {
        assert_eq!(Au915.downstream_frequency(902.3, 0, None), None);
        assert_eq!(Au915.downstream_frequency(915.2, 8, None), None);
        assert_eq!(Au915.downstream_frequency(915.2, 7, None), None);
    }

    #[test]
    fn test_rx1_offsets_stay_in_downlink_window() {
        for row in 0..7u16 {
            for column in 0..6u8 {
                let datarate = PARAMS.rx1_datarate(row, column).unwrap();
                assert!((8..=13).contains(&datarate), "row {} col {}", row, column);
            }
        }
        assert_eq!(PARAMS.rx1_datarate(6, 0).unwrap(), 13);
        assert_eq!(PARAMS.rx1_datarate(0, 5).unwrap(), 8);
    }

    #[test]
    fn test_rx2_default() {
        let rx2 = Au915.rx2_window();
        assert_eq!(rx2.frequency, 923.3);
        assert_eq!(rx2.datarate, 8);
    }
}
