//! Protobuf messages exchanged with the radio.
//!
//! This is the subset of the device's `ToRadio` / `FromRadio` schema the
//! session needs. Field tags follow the firmware's wire schema; fields this
//! client does not use are left out and skipped by the decoder.

use serde::Serialize;

/// Host → radio envelope.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ToRadio {
    #[prost(oneof = "to_radio::Variant", tags = "1, 100, 101")]
    pub variant: Option<to_radio::Variant>,
}

pub mod to_radio {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, prost::Oneof)]
    pub enum Variant {
        /// A packet to transmit on the mesh.
        #[prost(message, tag = "1")]
        Packet(super::MeshPacket),
        /// Ask the radio to stream its identity, config and node database.
        #[prost(uint32, tag = "100")]
        WantConfigId(u32),
        /// Replace the radio configuration.
        #[prost(message, tag = "101")]
        SetRadio(super::RadioConfig),
    }
}

/// Radio → host envelope.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct FromRadio {
    /// Monotonic message number assigned by the radio.
    #[prost(uint32, tag = "1")]
    pub num: u32,
    #[prost(oneof = "from_radio::Variant", tags = "2, 3, 4, 6, 8, 9")]
    pub variant: Option<from_radio::Variant>,
}

pub mod from_radio {
    use serde::Serialize;

    #[derive(Clone, PartialEq, Serialize, prost::Oneof)]
    pub enum Variant {
        #[prost(message, tag = "2")]
        Packet(super::MeshPacket),
        #[prost(message, tag = "3")]
        MyInfo(super::MyNodeInfo),
        #[prost(message, tag = "4")]
        NodeInfo(super::NodeInfo),
        #[prost(message, tag = "6")]
        Radio(super::RadioConfig),
        /// Echo of the `want_config_id` nonce once the config stream is done.
        #[prost(uint32, tag = "8")]
        ConfigCompleteId(u32),
        #[prost(bool, tag = "9")]
        Rebooted(bool),
    }
}

/// Identity of the locally attached radio.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct MyNodeInfo {
    #[prost(uint32, tag = "1")]
    pub my_node_num: u32,
    #[prost(bool, tag = "2")]
    pub has_gps: bool,
    #[prost(int32, tag = "3")]
    pub num_channels: i32,
    #[prost(string, tag = "4")]
    pub region: String,
    #[prost(string, tag = "5")]
    pub hw_model: String,
    #[prost(string, tag = "6")]
    pub firmware_version: String,
}

/// Radio configuration: user preferences plus the active channel.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct RadioConfig {
    #[prost(message, optional, tag = "1")]
    pub preferences: Option<UserPreferences>,
    #[prost(message, optional, tag = "2")]
    pub channel_settings: Option<ChannelSettings>,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct UserPreferences {
    #[prost(uint32, tag = "1")]
    pub position_broadcast_secs: u32,
    #[prost(uint32, tag = "2")]
    pub send_owner_interval: u32,
    #[prost(uint32, tag = "5")]
    pub screen_on_secs: u32,
    #[prost(string, tag = "12")]
    pub wifi_ssid: String,
    /// Sent to the radio in clear text; never logged.
    #[serde(skip_serializing)]
    #[prost(string, tag = "13")]
    pub wifi_password: String,
    #[prost(bool, tag = "14")]
    pub wifi_ap_mode: bool,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct ChannelSettings {
    #[prost(int32, tag = "1")]
    pub tx_power: i32,
    #[prost(int32, tag = "3")]
    pub modem_config: i32,
    /// Channel pre-shared key (AES-128/256).
    #[serde(skip_serializing)]
    #[prost(bytes = "vec", tag = "4")]
    pub psk: Vec<u8>,
    #[prost(string, tag = "5")]
    pub name: String,
}

/// A node in the radio's mesh database.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct NodeInfo {
    #[prost(uint32, tag = "1")]
    pub num: u32,
    #[prost(message, optional, tag = "2")]
    pub user: Option<User>,
    #[prost(message, optional, tag = "3")]
    pub position: Option<Position>,
    #[prost(float, tag = "7")]
    pub snr: f32,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct User {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub long_name: String,
    #[prost(string, tag = "3")]
    pub short_name: String,
}

#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Position {
    #[prost(int32, tag = "3")]
    pub altitude: i32,
    #[prost(int32, tag = "4")]
    pub battery_level: i32,
    /// Latitude in 1e-7 degrees.
    #[prost(sfixed32, tag = "7")]
    pub latitude_i: i32,
    /// Longitude in 1e-7 degrees.
    #[prost(sfixed32, tag = "8")]
    pub longitude_i: i32,
    /// Seconds since the Unix epoch.
    #[prost(fixed32, tag = "9")]
    pub time: u32,
}

/// A packet heard on (or destined for) the mesh.
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct MeshPacket {
    #[prost(uint32, tag = "1")]
    pub from: u32,
    #[prost(uint32, tag = "2")]
    pub to: u32,
    #[prost(message, optional, tag = "3")]
    pub decoded: Option<Data>,
    #[prost(uint32, tag = "6")]
    pub id: u32,
    #[prost(float, tag = "7")]
    pub rx_snr: f32,
    #[prost(fixed32, tag = "9")]
    pub rx_time: u32,
    #[prost(uint32, tag = "10")]
    pub hop_limit: u32,
    #[prost(bool, tag = "11")]
    pub want_ack: bool,
}

/// Application payload carried by a [`MeshPacket`].
#[derive(Clone, PartialEq, Serialize, prost::Message)]
pub struct Data {
    #[prost(int32, tag = "1")]
    pub portnum: i32,
    #[prost(bytes = "vec", tag = "2")]
    pub payload: Vec<u8>,
}
