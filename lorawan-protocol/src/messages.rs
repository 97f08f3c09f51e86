//! Basics Station message payloads.
//!
//! The station protocol carries JSON text frames over the gateway
//! connection, discriminated by a `msgtype` field. Only the messages the
//! protocol core dispatches on are modelled here; business-level fields it
//! never touches ride along untyped where possible.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Maximum accepted size of one assembled station message.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Radio metadata attached to every upstream frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UplinkRadioInfo {
    #[serde(default)]
    pub rctx: i64,
    #[serde(default)]
    pub xtime: i64,
    #[serde(default)]
    pub gpstime: i64,
    #[serde(default)]
    pub rssi: f64,
    #[serde(default)]
    pub snr: f64,
}

/// One station-protocol message, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum StationMessage {
    /// Station introduces itself right after the connection upgrade.
    Version {
        #[serde(default)]
        station: Option<String>,
        #[serde(default)]
        firmware: Option<String>,
        #[serde(default)]
        package: Option<String>,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        protocol: Option<u32>,
    },

    /// Server reply to `version`: the channel plan the station must use.
    #[serde(rename = "router_config")]
    RouterConfig {
        region: String,
        hwspec: String,
        /// Inclusive frequency range in Hz.
        freq_range: (u64, u64),
        /// Datarate table rows: (spreading factor, bandwidth kHz, downlink
        /// only); unassigned indices carry -1.
        #[serde(rename = "DRs")]
        datarates: Vec<(i16, u16, u8)>,
        /// Upstream channels: (frequency Hz, min datarate, max datarate).
        upchannels: Vec<(u64, u16, u16)>,
    },

    /// Join request forwarded by the station.
    Jreq {
        #[serde(rename = "MHdr")]
        mhdr: u8,
        #[serde(rename = "JoinEui")]
        join_eui: String,
        #[serde(rename = "DevEui")]
        dev_eui: String,
        #[serde(rename = "DevNonce")]
        dev_nonce: u32,
        #[serde(rename = "MIC")]
        mic: i64,
        #[serde(rename = "DR")]
        datarate: u16,
        #[serde(rename = "Freq")]
        frequency_hz: u64,
        #[serde(default)]
        upinfo: UplinkRadioInfo,
    },

    /// Uplink data frame forwarded by the station.
    Updf {
        #[serde(rename = "MHdr")]
        mhdr: u8,
        #[serde(rename = "DevAddr")]
        dev_addr: i64,
        #[serde(rename = "FCnt")]
        fcnt: u32,
        #[serde(rename = "FPort")]
        #[serde(default)]
        fport: Option<i32>,
        #[serde(rename = "FRMPayload")]
        #[serde(default)]
        frm_payload: Option<String>,
        #[serde(rename = "MIC")]
        mic: i64,
        #[serde(rename = "DR")]
        datarate: u16,
        #[serde(rename = "Freq")]
        frequency_hz: u64,
        #[serde(default)]
        upinfo: UplinkRadioInfo,
    },

    /// Downlink scheduling request sent back to the station.
    Dnmsg {
        #[serde(rename = "dC")]
        device_class: u8,
        diid: i64,
        pdu: String,
        #[serde(rename = "RxDelay")]
        rx_delay: u8,
        #[serde(rename = "RX1DR")]
        rx1_datarate: u16,
        #[serde(rename = "RX1Freq")]
        rx1_frequency_hz: u64,
        #[serde(rename = "RX2DR")]
        rx2_datarate: u16,
        #[serde(rename = "RX2Freq")]
        rx2_frequency_hz: u64,
        priority: u8,
        xtime: i64,
        rctx: i64,
    },
}

impl StationMessage {
    /// Parse one assembled text message.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))
    }

    /// Serialize for the wire.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))
    }
}

/// Wire frequencies are integer Hz; the regional tables work in MHz with
/// one decimal of precision.
pub fn freq_to_mhz(hz: u64) -> f64 {
    (hz as f64 / 100_000.0).round() / 10.0
}

/// MHz back to integer Hz for the wire.
pub fn freq_to_hz(mhz: f64) -> u64 {
    (mhz * 1_000_000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version() {
        let msg = StationMessage::parse(
            r#"{"msgtype":"version","station":"2.0.6","firmware":"1.0","model":"corecell","protocol":2}"#,
        )
        .unwrap();
        match msg {
            StationMessage::Version { station, protocol, .. } => {
                assert_eq!(station.as_deref(), Some("2.0.6"));
                assert_eq!(protocol, Some(2));
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_jreq() {
        let msg = StationMessage::parse(
            r#"{"msgtype":"jreq","MHdr":0,"JoinEui":"47-62-78-C8-E5-D2-83-2C","DevEui":"47-9C-85-48-46-91-10-44","DevNonce":54360,"MIC":-1056607131,"DR":1,"Freq":470900000,"upinfo":{"rctx":0,"xtime":40250921680313459,"gpstime":0,"rssi":-36,"snr":9.25}}"#,
        )
        .unwrap();
        match msg {
            StationMessage::Jreq { mhdr, datarate, frequency_hz, upinfo, .. } => {
                assert_eq!(mhdr, 0);
                assert_eq!(datarate, 1);
                assert_eq!(frequency_hz, 470_900_000);
                assert_eq!(upinfo.snr, 9.25);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_msgtype() {
        let result = StationMessage::parse(r#"{"msgtype":"selfdestruct"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedMessage(_))));
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(StationMessage::parse("not json").is_err());
    }

    #[test]
    fn test_dnmsg_serializes_with_msgtype() {
        let msg = StationMessage::Dnmsg {
            device_class: 0,
            diid: 1,
            pdu: "60FFFF".to_string(),
            rx_delay: 1,
            rx1_datarate: 1,
            rx1_frequency_hz: 483_900_000,
            rx2_datarate: 1,
            rx2_frequency_hz: 485_300_000,
            priority: 0,
            xtime: 0,
            rctx: 0,
        };
        let json = msg.to_json().unwrap();
        assert!(json.contains(r#""msgtype":"dnmsg""#));
        assert!(json.contains(r#""RX1Freq":483900000"#));
        assert_eq!(StationMessage::parse(&json).unwrap(), msg);
    }

    #[test]
    fn test_frequency_conversions() {
        assert_eq!(freq_to_mhz(470_300_000), 470.3);
        assert_eq!(freq_to_mhz(869_525_000), 869.5);
        assert_eq!(freq_to_hz(483.9), 483_900_000);
    }
}
