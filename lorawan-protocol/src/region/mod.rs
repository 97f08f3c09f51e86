//! Regional parameter tables and downstream-frequency resolution.
//!
//! One module per regulatory region. Every region exposes the same contract
//! through the [`Region`] trait: classify the channel a join request arrived
//! on, and map an upstream transmission to the legal downstream frequency
//! for the RX1 window. The tables themselves are compiled-in constants from
//! the published LoRaWAN regional parameters, built once and shared
//! read-only by every connection.
//!
//! Channel arithmetic rounds half away from zero to one decimal place.
//! Nearest-even rounding produces wrong frequencies at half-increment
//! boundaries, so the helpers here are the only place the math lives.

pub mod as923;
pub mod au915;
pub mod cn470;
pub mod eu868;
pub mod us915;

use serde::{Deserialize, Serialize};

use crate::error::RegionError;

/// Regulatory region identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoRaRegionType {
    Eu868,
    Us915,
    Cn470,
    Au915,
    As923,
}

impl LoRaRegionType {
    /// Canonical region name, as used in configuration and log output.
    pub fn name(&self) -> &'static str {
        match self {
            LoRaRegionType::Eu868 => "EU868",
            LoRaRegionType::Us915 => "US915",
            LoRaRegionType::Cn470 => "CN470",
            LoRaRegionType::Au915 => "AU915",
            LoRaRegionType::As923 => "AS923",
        }
    }

    /// Parse a region name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "EU868" => Some(LoRaRegionType::Eu868),
            "US915" => Some(LoRaRegionType::Us915),
            "CN470" => Some(LoRaRegionType::Cn470),
            "AU915" => Some(LoRaRegionType::Au915),
            "AS923" => Some(LoRaRegionType::As923),
            _ => None,
        }
    }
}

impl std::fmt::Display for LoRaRegionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Transmission direction, for datarate validity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Uplink,
    Downlink,
}

/// One entry of a region's datarate table: the spreading/bandwidth
/// descriptor (`"SF12BW125"`, or the FSK bitrate `"50"`) and the maximum
/// application payload in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatarateConfig {
    pub configuration: &'static str,
    pub max_payload_size: u16,
}

/// A receive-window default: frequency in MHz and datarate index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxWindow {
    pub frequency: f64,
    pub datarate: u16,
}

/// Legal-value limits for a region's frequency plan.
#[derive(Debug)]
pub struct RegionLimits {
    /// Inclusive frequency range in MHz.
    pub frequency_range: (f64, f64),
    pub uplink_datarates: &'static [&'static str],
    pub downlink_datarates: &'static [&'static str],
}

/// The static parameter tables of one region.
#[derive(Debug)]
pub struct RegionParams {
    pub region: LoRaRegionType,
    pub rx2_window: RxWindow,
    pub max_adr_datarate: u16,
    /// Sparse datarate table, sorted by index.
    datarates: &'static [(u16, DatarateConfig)],
    /// TX power index -> max EIRP in dBm.
    tx_powers: &'static [f64],
    /// RX1 datarate-offset matrix: row = uplink datarate, column = offset.
    rx1_dr_offsets: &'static [&'static [u16]],
    pub limits: RegionLimits,
}

impl RegionParams {
    pub(crate) const fn new(
        region: LoRaRegionType,
        rx2_window: RxWindow,
        max_adr_datarate: u16,
        datarates: &'static [(u16, DatarateConfig)],
        tx_powers: &'static [f64],
        rx1_dr_offsets: &'static [&'static [u16]],
        limits: RegionLimits,
    ) -> Self {
        Self {
            region,
            rx2_window,
            max_adr_datarate,
            datarates,
            tx_powers,
            rx1_dr_offsets,
            limits,
        }
    }

    /// Look up the spreading configuration and payload ceiling for a
    /// datarate index. Absent indices are an error, never a default.
    pub fn datarate_config(&self, datarate: u16) -> Result<DatarateConfig, RegionError> {
        self.datarates
            .iter()
            .find(|(index, _)| *index == datarate)
            .map(|(_, config)| *config)
            .ok_or(RegionError::UnknownDatarate(datarate))
    }

    /// Maximum EIRP in dBm for a TX power index.
    pub fn max_eirp(&self, tx_power: u8) -> Result<f64, RegionError> {
        self.tx_powers
            .get(usize::from(tx_power))
            .copied()
            .ok_or(RegionError::UnknownTxPower(tx_power))
    }

    /// Downstream datarate for the RX1 window, from the offset matrix.
    pub fn rx1_datarate(&self, uplink_datarate: u16, offset: u8) -> Result<u16, RegionError> {
        let out_of_range = RegionError::IndexOutOfRange {
            row: uplink_datarate,
            column: offset,
        };
        let row = self
            .rx1_dr_offsets
            .get(usize::from(uplink_datarate))
            .ok_or(out_of_range)?;
        row.get(usize::from(offset)).copied().ok_or(out_of_range)
    }

    /// Whether a frequency lies inside the region's plan.
    pub fn is_valid_frequency(&self, frequency: f64) -> bool {
        let (min, max) = self.limits.frequency_range;
        frequency >= min && frequency <= max
    }

    /// Whether a spreading-configuration name is legal for a direction.
    pub fn is_valid_datarate_name(&self, name: &str, direction: Direction) -> bool {
        let names = match direction {
            Direction::Uplink => self.limits.uplink_datarates,
            Direction::Downlink => self.limits.downlink_datarates,
        };
        names.contains(&name)
    }

    /// Combined validity check used by downstream resolution: frequency in
    /// range and datarate index mapping to a legal uplink configuration.
    pub fn is_valid_uplink(&self, frequency: f64, datarate: u16) -> bool {
        if !self.is_valid_frequency(frequency) {
            return false;
        }
        match self.datarate_config(datarate) {
            Ok(config) => self.is_valid_datarate_name(config.configuration, Direction::Uplink),
            Err(_) => false,
        }
    }

    /// All datarate table entries, sorted by index.
    pub fn datarates(&self) -> impl Iterator<Item = (u16, DatarateConfig)> + '_ {
        self.datarates.iter().copied()
    }
}

/// Uniform per-region contract consumed by upstream message handlers.
pub trait Region: Send + Sync {
    fn region_type(&self) -> LoRaRegionType;

    /// The region's static parameter tables.
    fn params(&self) -> &RegionParams;

    /// Position of `frequency` in the region's fixed join-frequency list.
    /// The match is exact: join frequencies are drawn from the same constant
    /// list the downstream tables are built from, so the wire carries exact
    /// values. Regions without join sub-plans return `None` for every input.
    fn join_channel_index(&self, _frequency: f64) -> Option<usize> {
        None
    }

    /// Legal downstream (RX1) frequency for an upstream transmission, or
    /// `None` when no mapping applies: invalid frequency/datarate, missing
    /// join-channel index where the region requires one, or a channel
    /// number outside the plan.
    fn downstream_frequency(
        &self,
        upstream_frequency: f64,
        datarate: u16,
        join_channel_index: Option<usize>,
    ) -> Option<f64>;

    /// RX2 window default.
    fn rx2_window(&self) -> RxWindow {
        self.params().rx2_window
    }
}

/// Resolve the shared, read-only resolver for a region. The set is closed
/// and known at build time; no registration happens at runtime.
pub fn region(region_type: LoRaRegionType) -> &'static dyn Region {
    match region_type {
        LoRaRegionType::Eu868 => &eu868::Eu868,
        LoRaRegionType::Us915 => &us915::Us915,
        LoRaRegionType::Cn470 => &cn470::Cn470,
        LoRaRegionType::Au915 => &au915::Au915,
        LoRaRegionType::As923 => &as923::As923,
    }
}

/// Round a frequency half away from zero to one decimal place.
pub(crate) fn round_frequency(mhz: f64) -> f64 {
    // f64::round ties away from zero, matching the regional tables.
    (mhz * 10.0).round() / 10.0
}

/// Channel number of `frequency` on a grid starting at `start` with the
/// given increment, rounding half away from zero. Negative when the
/// frequency sits below the grid start; callers index with a checked
/// conversion so those fall out as "no mapping".
pub(crate) fn channel_number(frequency: f64, start: f64, increment: f64) -> i64 {
    ((frequency - start) / increment).round() as i64
}

/// Build a downstream frequency list: `count` channels from
/// `start_frequency` spaced by `increment`, each rounded to one decimal.
pub(crate) fn build_frequency_plan(start_frequency: f64, increment: f64, count: usize) -> Vec<f64> {
    let mut frequencies = Vec::with_capacity(count);
    let mut current = start_frequency;
    for _ in 0..count {
        frequencies.push(round_frequency(current));
        current += increment;
    }
    frequencies
}

/// Index a plan list by a possibly negative channel number.
pub(crate) fn plan_frequency(plan: &[f64], channel_number: i64) -> Option<f64> {
    usize::try_from(channel_number)
        .ok()
        .and_then(|index| plan.get(index))
        .copied()
}

/// Index a cyclic plan list, reducing the channel number modulo its length.
pub(crate) fn plan_frequency_cyclic(plan: &[f64], channel_number: i64) -> Option<f64> {
    usize::try_from(channel_number)
        .ok()
        .map(|index| index % plan.len())
        .and_then(|index| plan.get(index))
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_REGIONS: [LoRaRegionType; 5] = [
        LoRaRegionType::Eu868,
        LoRaRegionType::Us915,
        LoRaRegionType::Cn470,
        LoRaRegionType::Au915,
        LoRaRegionType::As923,
    ];

    #[test]
    fn test_region_names_round_trip() {
        for region_type in ALL_REGIONS {
            assert_eq!(
                LoRaRegionType::from_name(region_type.name()),
                Some(region_type)
            );
        }
        assert_eq!(LoRaRegionType::from_name("cn470"), Some(LoRaRegionType::Cn470));
        assert_eq!(LoRaRegionType::from_name("MARS"), None);
    }

    #[test]
    fn test_datarate_tables_are_unique_and_bounded() {
        for region_type in ALL_REGIONS {
            let params = region(region_type).params();
            let entries: Vec<_> = params.datarates().collect();
            for (index, config) in &entries {
                assert!(*index <= 15, "{}: datarate index {}", region_type, index);
                let duplicates = entries.iter().filter(|(i, _)| i == index).count();
                assert_eq!(duplicates, 1, "{}: duplicate datarate {}", region_type, index);
                assert!(
                    !config.configuration.is_empty(),
                    "{}: empty configuration for datarate {}",
                    region_type,
                    index
                );
            }
        }
    }

    #[test]
    fn test_absent_datarate_reports_unknown() {
        for region_type in ALL_REGIONS {
            let params = region(region_type).params();
            assert_eq!(
                params.datarate_config(15),
                Err(RegionError::UnknownDatarate(15)),
                "{}",
                region_type
            );
        }
    }

    #[test]
    fn test_absent_tx_power_reports_unknown() {
        for region_type in ALL_REGIONS {
            let params = region(region_type).params();
            assert_eq!(
                params.max_eirp(100),
                Err(RegionError::UnknownTxPower(100)),
                "{}",
                region_type
            );
        }
    }

    #[test]
    fn test_rx1_offset_out_of_range_is_an_error_not_a_wrap() {
        for region_type in ALL_REGIONS {
            let params = region(region_type).params();
            assert!(
                matches!(
                    params.rx1_datarate(200, 0),
                    Err(RegionError::IndexOutOfRange { row: 200, .. })
                ),
                "{}",
                region_type
            );
            assert!(
                matches!(
                    params.rx1_datarate(0, 200),
                    Err(RegionError::IndexOutOfRange { column: 200, .. })
                ),
                "{}",
                region_type
            );
        }
    }

    #[test]
    fn test_rx2_defaults_are_inside_each_plan() {
        for region_type in ALL_REGIONS {
            let params = region(region_type).params();
            let rx2 = region(region_type).rx2_window();
            // RX2 frequencies sit in the downlink band, which for some
            // regions extends past the uplink limits; they must at least be
            // positive and carry a known datarate for US915/AU915-style
            // split tables.
            assert!(rx2.frequency > 0.0, "{}", region_type);
            assert!(
                params.datarate_config(rx2.datarate).is_ok(),
                "{}: RX2 datarate {} missing from table",
                region_type,
                rx2.datarate
            );
        }
    }

    #[test]
    fn test_round_frequency_ties_away_from_zero() {
        assert_eq!(round_frequency(483.25), 483.3);
        assert_eq!(round_frequency(483.24), 483.2);
        assert_eq!(round_frequency(470.3), 470.3);
    }

    #[test]
    fn test_channel_number_grid_round_trip() {
        for k in 0..64 {
            let frequency = 470.3 + f64::from(k) * 0.2;
            assert_eq!(channel_number(frequency, 470.3, 0.2), i64::from(k));
        }
    }

    #[test]
    fn test_plan_frequency_rejects_negative_and_overflow() {
        let plan = build_frequency_plan(483.9, 0.2, 32);
        assert_eq!(plan_frequency(&plan, -1), None);
        assert_eq!(plan_frequency(&plan, 32), None);
        assert_eq!(plan_frequency(&plan, 0), Some(483.9));
        assert_eq!(plan_frequency_cyclic(&plan, 33), Some(plan[1]));
    }
}
