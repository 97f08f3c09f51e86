//! Dispatch of assembled station messages.
//!
//! This is the handler the server wires into every session. It parses the
//! station JSON, classifies join requests against the region's join-channel
//! plan and answers uplinks with a downlink scheduling request on the legal
//! RX1/RX2 frequencies. Device identity, MIC validation and session
//! persistence live behind external collaborators and are not handled here;
//! without a device session the downstream resolution fails closed and no
//! downlink is produced.

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use lorawan_protocol::{
    freq_to_hz, freq_to_mhz, region, Direction, LoRaRegionType, MacHeader, MacMessageType,
    ProtocolError, Region, StationMessage, UplinkRadioInfo,
};

use crate::server::session::{HandlerError, MessageHandler};
use crate::server::transport::Transport;

/// Station message handler backed by one region resolver.
pub struct UplinkDispatcher {
    region: &'static dyn Region,
    /// Downlink id handed to the station, monotonic per process.
    diid: AtomicI64,
}

impl UplinkDispatcher {
    pub fn new(region_type: LoRaRegionType) -> Self {
        Self {
            region: region(region_type),
            diid: AtomicI64::new(1),
        }
    }

    /// The channel-plan reply to a `version` message.
    fn router_config(&self) -> StationMessage {
        let params = self.region.params();
        let (min, max) = params.limits.frequency_range;
        let datarates = (0..=15u16)
            .map(|index| match params.datarate_config(index) {
                Ok(config) => {
                    let downlink_only = !params
                        .is_valid_datarate_name(config.configuration, Direction::Uplink);
                    let (sf, bw) = parse_spreading(config.configuration);
                    (sf, bw, u8::from(downlink_only))
                }
                Err(_) => (-1, 0, 0),
            })
            .collect();
        StationMessage::RouterConfig {
            region: params.region.name().to_string(),
            hwspec: "sx1301/1".to_string(),
            freq_range: (freq_to_hz(min), freq_to_hz(max)),
            datarates,
            // Channel assignment is owned by the join server collaborator.
            upchannels: Vec::new(),
        }
    }

    /// Build the downlink reply for an upstream frame, or `None` when the
    /// region yields no legal downstream mapping.
    fn downlink_for(
        &self,
        reply_header: MacHeader,
        upstream_mhz: f64,
        datarate: u16,
        join_channel_index: Option<usize>,
        upinfo: &UplinkRadioInfo,
    ) -> Option<StationMessage> {
        let rx1_frequency = self
            .region
            .downstream_frequency(upstream_mhz, datarate, join_channel_index)?;
        let rx1_datarate = self.region.params().rx1_datarate(datarate, 0).ok()?;
        let rx2 = self.region.rx2_window();
        Some(StationMessage::Dnmsg {
            device_class: 0,
            diid: self.diid.fetch_add(1, Ordering::SeqCst),
            pdu: encode_mhdr_pdu(reply_header).ok()?,
            rx_delay: 1,
            rx1_datarate,
            rx1_frequency_hz: freq_to_hz(rx1_frequency),
            rx2_datarate: rx2.datarate,
            rx2_frequency_hz: freq_to_hz(rx2.frequency),
            priority: 0,
            xtime: upinfo.xtime,
            rctx: upinfo.rctx,
        })
    }
}

#[async_trait]
impl MessageHandler for UplinkDispatcher {
    async fn handle(
        &self,
        message: &str,
        transport: &mut dyn Transport,
        _cancel: &CancellationToken,
    ) -> Result<bool, HandlerError> {
        match StationMessage::parse(message)? {
            StationMessage::Version { station, protocol, .. } => {
                info!(
                    "Station connected: {} (protocol {})",
                    station.as_deref().unwrap_or("unknown"),
                    protocol.unwrap_or(0)
                );
                let reply = self.router_config().to_json()?;
                transport.send_text(reply).await?;
                Ok(false)
            }

            StationMessage::Jreq { mhdr, dev_eui, datarate, frequency_hz, upinfo, .. } => {
                let header = MacHeader::new(mhdr);
                if header.message_type() != MacMessageType::JoinRequest {
                    return Err(ProtocolError::MalformedMessage(format!(
                        "jreq carries MHDR {} ({:?})",
                        header,
                        header.message_type()
                    ))
                    .into());
                }
                let upstream = freq_to_mhz(frequency_hz);
                let join_channel = self.region.join_channel_index(upstream);
                info!(
                    "Join request from {} at {} MHz DR{} (join channel {:?})",
                    dev_eui, upstream, datarate, join_channel
                );
                let reply_header = MacHeader::compose(MacMessageType::JoinAccept, header.major());
                match self.downlink_for(reply_header, upstream, datarate, join_channel, &upinfo) {
                    Some(reply) => {
                        transport.send_text(reply.to_json()?).await?;
                    }
                    None => {
                        debug!("No downstream mapping for join request at {} MHz", upstream)
                    }
                }
                Ok(false)
            }

            StationMessage::Updf { mhdr, dev_addr, fcnt, datarate, frequency_hz, upinfo, .. } => {
                let header = MacHeader::new(mhdr);
                let reply_type = match header.message_type() {
                    MacMessageType::UnconfirmedDataUp => MacMessageType::UnconfirmedDataDown,
                    MacMessageType::ConfirmedDataUp => MacMessageType::ConfirmedDataDown,
                    other => {
                        return Err(ProtocolError::MalformedMessage(format!(
                            "updf carries MHDR {} ({:?})",
                            header, other
                        ))
                        .into());
                    }
                };
                let upstream = freq_to_mhz(frequency_hz);
                debug!(
                    "Uplink from {:08X} fcnt {} at {} MHz DR{}",
                    dev_addr, fcnt, upstream, datarate
                );
                // The device's join channel comes from its stored session;
                // without one, regions with join sub-plans fail closed and
                // no downlink is scheduled.
                let reply_header = MacHeader::compose(reply_type, header.major());
                match self.downlink_for(reply_header, upstream, datarate, None, &upinfo) {
                    Some(reply) => {
                        transport.send_text(reply.to_json()?).await?;
                    }
                    None => debug!("No downstream mapping for uplink at {} MHz", upstream),
                }
                Ok(false)
            }

            other => {
                warn!("Ignoring unexpected station message: {:?}", other);
                Ok(false)
            }
        }
    }
}

/// Spreading factor and bandwidth from a configuration descriptor;
/// FSK descriptors carry the bitrate in the bandwidth column.
fn parse_spreading(configuration: &str) -> (i16, u16) {
    match configuration.split_once("BW") {
        Some((sf, bw)) => (
            sf.trim_start_matches("SF").parse().unwrap_or(-1),
            bw.parse().unwrap_or(0),
        ),
        None => (0, configuration.parse().unwrap_or(0)),
    }
}

/// Hex-encode a downlink PHY payload stub: just the MHDR octet, written
/// through the header codec. The full payload (join-accept, MAC commands,
/// MIC) is assembled by collaborators outside this core.
fn encode_mhdr_pdu(header: MacHeader) -> Result<String, ProtocolError> {
    let mut buf = [0u8; MacHeader::SIZE];
    header.write(&mut buf)?;
    Ok(buf.iter().map(|byte| format!("{:02X}", byte)).collect())
}
