//! AS923 regional parameters.

use super::{
    DatarateConfig, LoRaRegionType, Region, RegionLimits, RegionParams, RxWindow,
};

const DATARATES: [(u16, DatarateConfig); 8] = [
    (0, DatarateConfig { configuration: "SF12BW125", max_payload_size: 59 }),
    (1, DatarateConfig { configuration: "SF11BW125", max_payload_size: 59 }),
    (2, DatarateConfig { configuration: "SF10BW125", max_payload_size: 123 }),
    (3, DatarateConfig { configuration: "SF9BW125", max_payload_size: 123 }),
    (4, DatarateConfig { configuration: "SF8BW125", max_payload_size: 230 }),
    (5, DatarateConfig { configuration: "SF7BW125", max_payload_size: 230 }),
    (6, DatarateConfig { configuration: "SF7BW250", max_payload_size: 230 }),
    (7, DatarateConfig { configuration: "50", max_payload_size: 230 }),
];

const TX_POWERS: [f64; 8] = [16.0, 14.0, 12.0, 10.0, 8.0, 6.0, 4.0, 2.0];

/// Downlink datarate floors at 0 and caps at 5 for offsets 0-5.
const RX1_DR_OFFSETS: [&[u16]; 8] = [
    &[0, 0, 0, 0, 0, 0],
    &[1, 0, 0, 0, 0, 0],
    &[2, 1, 0, 0, 0, 0],
    &[3, 2, 1, 0, 0, 0],
    &[4, 3, 2, 1, 0, 0],
    &[5, 4, 3, 2, 1, 0],
    &[5, 5, 4, 3, 2, 1],
    &[5, 5, 5, 4, 3, 2],
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
    LoRaRegionType::As923,
    RxWindow { frequency: 923.2, datarate: 2 },
    5,
    &DATARATES,
    &TX_POWERS,
    &RX1_DR_OFFSETS,
    RegionLimits {
        frequency_range: (915.0, 928.0),
        uplink_datarates: &VALID_DATARATE_NAMES,
        downlink_datarates: &VALID_DATARATE_NAMES,
    },
);

pub struct As923;

impl Region for As923 {
    fn region_type(&self) -> LoRaRegionType {
        LoRaRegionType::As923
    }

    fn params(&self) -> &RegionParams {
        &PARAMS
    }

    /// RX1 answers on the uplink channel, as in EU868.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downstream_mirrors_upstream() {
        assert_eq!(As923.downstream_frequency(923.2, 2, None), Some(923.2));
        assert_eq!(As923.downstream_frequency(923.4, 5, Some(0)), Some(923.4));
    }

    #[test]
    fn test_downstream_fails_closed_on_invalid_inputs() {
        assert_eq!(As923.downstream_frequency(868.1, 2, None), None);
        assert_eq!(As923.downstream_frequency(923.2, 9, None), None);
    }

    #[test]
    fn test_rx1_offsets_cap_at_dr5() {
        assert_eq!(PARAMS.rx1_datarate(7, 0).unwrap(), 5);
        assert_eq!(PARAMS.rx1_datarate(7, 5).unwrap(), 2);
        assert_eq!(PARAMS.rx1_datarate(2, 1).unwrap(), 1);
    }

    #[test]
    fn test_rx2_default() {
        let rx2 = As923.rx2_window();
        assert_eq!(rx2.frequency, 923.2);
        assert_eq!(rx2.datarate, 2);
    }
}
