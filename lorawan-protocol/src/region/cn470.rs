//! CN470-510 regional parameters.
//!
//! CN470 is the only region whose downstream plan depends on which channel
//! the device joined on: the join-channel index selects one of four
//! downstream sub-plans (two 20 MHz plans, two cyclic 26 MHz plans).

use once_cell::sync::Lazy;

use super::{
    build_frequency_plan, channel_number, plan_frequency, plan_frequency_cyclic, DatarateConfig,
    LoRaRegionType, Region, RegionLimits, RegionParams, RxWindow,
};

const FREQUENCY_INCREMENT: f64 = 0.2;

/// Join-request frequencies, ordered; a device's join-channel index is its
/// position in this list.
const JOIN_FREQUENCIES: [f64; 20] = [
    470.9, 472.5, 474.1, 475.7, 504.1, 505.7, 507.3, 508.9, 479.9, 499.9, 470.3, 472.3, 474.3,
    476.3, 478.3, 480.3, 482.3, 484.3, 486.3, 488.3,
];

const DATARATES: [(u16, DatarateConfig); 8] = [
    (0, DatarateConfig { configuration: "SF12BW125", max_payload_size: 31 }),
    (1, DatarateConfig { configuration: "SF11BW125", max_payload_size: 31 }),
    (2, DatarateConfig { configuration: "SF10BW125", max_payload_size: 94 }),
    (3, DatarateConfig { configuration: "SF9BW125", max_payload_size: 192 }),
    (4, DatarateConfig { configuration: "SF8BW125", max_payload_size: 250 }),
    (5, DatarateConfig { configuration: "SF7BW125", max_payload_size: 250 }),
    (6, DatarateConfig { configuration: "SF7BW500", max_payload_size: 250 }),
    (7, DatarateConfig { configuration: "50", max_payload_size: 250 }),
];

const TX_POWERS: [f64; 8] = [19.0, 17.0, 15.0, 13.0, 11.0, 9.0, 7.0, 5.0];

const RX1_DR_OFFSETS: [&[u16]; 8] = [
    &[0, 0, 0, 0, 0, 0],
    &[1, 1, 1, 1, 1, 1],
    &[2, 1, 1, 1, 1, 1],
    &[3, 2, 1, 1, 1, 1],
    &[4, 3, 2, 1, 1, 1],
    &[5, 4, 3, 2, 1, 1],
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
    "SF7BW500",
    "50",
];

static PARAMS: RegionParams = RegionParams::new(
    LoRaRegionType::Cn470,
    RxWindow { frequency: 485.3, datarate: 1 },
    7,
    &DATARATES,
    &TX_POWERS,
    &RX1_DR_OFFSETS,
    RegionLimits {
        frequency_range: (470.3, 509.7),
        uplink_datarates: &VALID_DATARATE_NAMES,
        downlink_datarates: &VALID_DATARATE_NAMES,
    },
);

/// Downstream frequency lists per sub-plan, in join-partition order:
/// 20 MHz plan A, 20 MHz plan B, 26 MHz plan A, 26 MHz plan B.
static DOWNSTREAM_PLANS: Lazy<[Vec<f64>; 4]> = Lazy::new(|| {
    let mut plan_20a = build_frequency_plan(483.9, FREQUENCY_INCREMENT, 32);
    plan_20a.extend(build_frequency_plan(490.3, FREQUENCY_INCREMENT, 32));
    let mut plan_20b = build_frequency_plan(476.9, FREQUENCY_INCREMENT, 32);
    plan_20b.extend(build_frequency_plan(496.9, FREQUENCY_INCREMENT, 32));
    [
        plan_20a,
        plan_20b,
        build_frequency_plan(490.1, FREQUENCY_INCREMENT, 24),
        build_frequency_plan(500.1, FREQUENCY_INCREMENT, 24),
    ]
});

pub struct Cn470;

impl Region for Cn470 {
    fn region_type(&self) -> LoRaRegionType {
        LoRaRegionType::Cn470
    }

    fn params(&self) -> &RegionParams {
        &PARAMS
    }

    fn join_channel_index(&self, frequency: f64) -> Option<usize> {
        JOIN_FREQUENCIES.iter().position(|&f| f == frequency)
    }

    fn downstream_frequency(
        &self,
        upstream_frequency: f64,
        datarate: u16,
        join_channel_index: Option<usize>,
    ) -> Option<f64> {
        let join_channel_index = join_channel_index?;
        if !PARAMS.is_valid_uplink(upstream_frequency, datarate) {
            return None;
        }

        let plans = &*DOWNSTREAM_PLANS;

        // The join-index partition boundaries are fixed by the number of
        // join channels assigned to each sub-plan; do not re-derive them.
        if join_channel_index <= 7 {
            // 20 MHz plan A
            let channel = if upstream_frequency < 500.0 {
                channel_number(upstream_frequency, 470.3, FREQUENCY_INCREMENT)
            } else {
                32 + channel_number(upstream_frequency, 503.5, FREQUENCY_INCREMENT)
            };
            return plan_frequency(&plans[0], channel);
        }
        if join_channel_index <= 9 {
            // 20 MHz plan B
            let channel = if upstream_frequency < 490.0 {
                channel_number(upstream_frequency, 476.9, FREQUENCY_INCREMENT)
            } else {
                32 + channel_number(upstream_frequency, 496.9, FREQUENCY_INCREMENT)
            };
            return plan_frequency(&plans[1], channel);
        }
        if join_channel_index <= 14 {
            // 26 MHz plan A
            let channel = channel_number(upstream_frequency, 470.3, FREQUENCY_INCREMENT);
            return plan_frequency_cyclic(&plans[2], channel);
        }
        if join_channel_index <= 19 {
            // 26 MHz plan B
            let channel = channel_number(upstream_frequency, 480.3, FREQUENCY_INCREMENT);
            return plan_frequency_cyclic(&plans[3], channel);
        }

        None
    }
}
