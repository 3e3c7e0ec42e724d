use prost::Message;
use tracing::debug;

use crate::message::{
    from_radio, to_radio, FromRadio, MeshPacket, MyNodeInfo, NodeInfo, RadioConfig, ToRadio,
};

/// Errors produced by a [`MessageCodec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload is not a valid message.
    #[error("failed to decode message: {0}")]
    Decode(#[from] prost::DecodeError),

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(#[from] prost::EncodeError),
}

/// A decoded message received from the radio.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// Identity of the attached radio.
    Identity(MyNodeInfo),
    /// Current radio configuration.
    DeviceConfig(RadioConfig),
    /// A node database entry, sent during the config stream and on changes.
    NodeEvent(NodeInfo),
    /// A packet heard on the mesh.
    Packet(MeshPacket),
    /// The config stream for the given nonce is complete.
    HandshakeComplete(u32),
    /// A message kind this client does not handle.
    Unknown(&'static str),
}

impl Envelope {
    /// Short name of the envelope kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::Identity(_) => "identity",
            Envelope::DeviceConfig(_) => "device-config",
            Envelope::NodeEvent(_) => "node-event",
            Envelope::Packet(_) => "packet",
            Envelope::HandshakeComplete(_) => "handshake-complete",
            Envelope::Unknown(kind) => *kind,
        }
    }
}

/// A message sent to the radio.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Start the config handshake; the radio echoes the nonce when done.
    WantConfigId(u32),
    /// Replace the radio configuration.
    SetDeviceConfig(RadioConfig),
    /// Transmit a packet on the mesh.
    Packet(MeshPacket),
}

/// Serializes requests and deserializes envelopes.
///
/// The session only ever sees [`Request`] and [`Envelope`]; the byte-level
/// schema lives behind this trait.
pub trait MessageCodec: Send + Sync {
    /// Serialize one outbound request into a frame payload.
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError>;

    /// Deserialize one frame payload into an envelope.
    fn decode_envelope(&self, payload: &[u8]) -> Result<Envelope, CodecError>;
}

/// [`MessageCodec`] for the radio's protobuf `ToRadio` / `FromRadio` schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtobufCodec;

impl ProtobufCodec {
    /// Build the protobuf message for a request.
    pub fn to_radio(request: &Request) -> ToRadio {
        let variant = match request {
            Request::WantConfigId(nonce) => to_radio::Variant::WantConfigId(*nonce),
            Request::SetDeviceConfig(config) => to_radio::Variant::SetRadio(config.clone()),
            Request::Packet(packet) => to_radio::Variant::Packet(packet.clone()),
        };
        ToRadio {
            variant: Some(variant),
        }
    }

    /// Map a decoded protobuf message to an envelope.
    pub fn envelope(message: FromRadio) -> Envelope {
        match message.variant {
            Some(from_radio::Variant::MyInfo(info)) => Envelope::Identity(info),
            Some(from_radio::Variant::Radio(config)) => Envelope::DeviceConfig(config),
            Some(from_radio::Variant::NodeInfo(node)) => Envelope::NodeEvent(node),
            Some(from_radio::Variant::Packet(packet)) => Envelope::Packet(packet),
            Some(from_radio::Variant::ConfigCompleteId(id)) => Envelope::HandshakeComplete(id),
            Some(from_radio::Variant::Rebooted(_)) => Envelope::Unknown("rebooted"),
            None => Envelope::Unknown("empty"),
        }
    }
}

impl MessageCodec for ProtobufCodec {
    fn encode_request(&self, request: &Request) -> Result<Vec<u8>, CodecError> {
        let message = Self::to_radio(request);
        let mut payload = Vec::with_capacity(message.encoded_len());
        message.encode(&mut payload)?;
        Ok(payload)
    }

    fn decode_envelope(&self, payload: &[u8]) -> Result<Envelope, CodecError> {
        let message = FromRadio::decode(payload)?;
        debug!(num = message.num, "decoded FromRadio message");
        Ok(Self::envelope(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChannelSettings, User, UserPreferences};

    fn from_radio(variant: from_radio::Variant) -> Vec<u8> {
        FromRadio {
            num: 7,
            variant: Some(variant),
        }
        .encode_to_vec()
    }

    #[test]
    fn want_config_id_encodes_as_to_radio() {
        let payload = ProtobufCodec
            .encode_request(&Request::WantConfigId(0xDEAD_BEEF))
            .unwrap();
        let decoded = ToRadio::decode(payload.as_slice()).unwrap();
        assert_eq!(
            decoded.variant,
            Some(to_radio::Variant::WantConfigId(0xDEAD_BEEF))
        );
    }

    #[test]
    fn set_device_config_carries_config() {
        let config = RadioConfig {
            preferences: Some(UserPreferences {
                screen_on_secs: 120,
                ..UserPreferences::default()
            }),
            channel_settings: Some(ChannelSettings {
                name: "lora1".to_string(),
                ..ChannelSettings::default()
            }),
        };
        let payload = ProtobufCodec
            .encode_request(&Request::SetDeviceConfig(config.clone()))
            .unwrap();
        let decoded = ToRadio::decode(payload.as_slice()).unwrap();
        assert_eq!(decoded.variant, Some(to_radio::Variant::SetRadio(config)));
    }

    #[test]
    fn decodes_each_envelope_kind() {
        let info = MyNodeInfo {
            my_node_num: 123_456,
            ..MyNodeInfo::default()
        };
        assert_eq!(
            ProtobufCodec
                .decode_envelope(&from_radio(from_radio::Variant::MyInfo(info.clone())))
                .unwrap(),
            Envelope::Identity(info)
        );

        let node = NodeInfo {
            num: 42,
            user: Some(User {
                long_name: "base camp".to_string(),
                ..User::default()
            }),
            ..NodeInfo::default()
        };
        assert_eq!(
            ProtobufCodec
                .decode_envelope(&from_radio(from_radio::Variant::NodeInfo(node.clone())))
                .unwrap(),
            Envelope::NodeEvent(node)
        );

        assert_eq!(
            ProtobufCodec
                .decode_envelope(&from_radio(from_radio::Variant::ConfigCompleteId(1234)))
                .unwrap(),
            Envelope::HandshakeComplete(1234)
        );

        let envelope = ProtobufCodec
            .decode_envelope(&from_radio(from_radio::Variant::Radio(
                RadioConfig::default(),
            )))
            .unwrap();
        assert_eq!(envelope.kind(), "device-config");
    }

    #[test]
    fn unhandled_variants_are_unknown() {
        assert_eq!(
            ProtobufCodec
                .decode_envelope(&from_radio(from_radio::Variant::Rebooted(true)))
                .unwrap(),
            Envelope::Unknown("rebooted")
        );
        assert_eq!(
            ProtobufCodec.decode_envelope(&[]).unwrap(),
            Envelope::Unknown("empty")
        );
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = ProtobufCodec
            .decode_envelope(&[0xFF, 0xFF, 0xFF])
            .unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
