use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use meshwire_session::message::{MeshPacket, MyNodeInfo, NodeInfo, RadioConfig};
use meshwire_session::Event;
use meshwire_transport::PortEntry;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// What `info` and `set-config` report about a radio.
#[derive(Serialize)]
pub struct DeviceReport<'a> {
    pub port: &'a str,
    pub config_id: u32,
    pub identity: Option<MyNodeInfo>,
    pub config: Option<RadioConfig>,
}

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
    usb_id: Option<&'a str>,
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_device(report: &DeviceReport<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FIELD", "VALUE"]);
            for (field, value) in device_rows(report) {
                table.add_row(vec![field.to_string(), value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("Radio on {}:", report.port);
            for (field, value) in device_rows(report) {
                println!("  {:<24}{value}", format!("{field}:"));
            }
        }
    }
}

fn device_rows(report: &DeviceReport<'_>) -> Vec<(&'static str, String)> {
    let mut rows = vec![("port", report.port.to_string())];
    match &report.identity {
        Some(info) => {
            rows.push(("node", node_id(info.my_node_num)));
            rows.push(("hardware", info.hw_model.clone()));
            rows.push(("firmware", info.firmware_version.clone()));
            rows.push(("region", info.region.clone()));
            rows.push(("channels", info.num_channels.to_string()));
            rows.push(("gps", info.has_gps.to_string()));
        }
        None => rows.push(("node", "unknown".to_string())),
    }
    match &report.config {
        Some(config) => rows.extend(config_rows(config)),
        None => rows.push(("config", "not reported".to_string())),
    }
    rows
}

/// Radio config as display rows. Secrets are never shown.
pub fn config_rows(config: &RadioConfig) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    if let Some(prefs) = &config.preferences {
        rows.push((
            "position_broadcast_secs",
            prefs.position_broadcast_secs.to_string(),
        ));
        rows.push(("send_owner_interval", prefs.send_owner_interval.to_string()));
        rows.push(("screen_on_secs", prefs.screen_on_secs.to_string()));
        rows.push(("wifi_ssid", prefs.wifi_ssid.clone()));
        rows.push(("wifi_ap_mode", prefs.wifi_ap_mode.to_string()));
    }
    if let Some(channel) = &config.channel_settings {
        rows.push(("channel_name", channel.name.clone()));
        rows.push(("tx_power", channel.tx_power.to_string()));
        rows.push(("modem_config", channel.modem_config.to_string()));
    }
    rows
}

pub fn print_event(event: &Event, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TOPIC", "NODE", "DETAIL"])
                .add_row(event_row(event));
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let [topic, node, detail] = event_row(event);
            println!("{topic} {node} {detail}");
        }
    }
}

fn event_row(event: &Event) -> [String; 3] {
    match event {
        Event::Node(node) => [
            event.topic().to_string(),
            node_id(node.num),
            node_detail(node),
        ],
        Event::Packet(packet) => [
            event.topic().to_string(),
            node_id(packet.from),
            packet_detail(packet),
        ],
    }
}

fn node_detail(node: &NodeInfo) -> String {
    let mut parts = Vec::new();
    if let Some(user) = &node.user {
        parts.push(format!("name={:?}", user.long_name));
    }
    if let Some(pos) = &node.position {
        parts.push(format!(
            "pos={:.5},{:.5}",
            f64::from(pos.latitude_i) * 1e-7,
            f64::from(pos.longitude_i) * 1e-7
        ));
        if pos.battery_level > 0 {
            parts.push(format!("battery={}%", pos.battery_level));
        }
    }
    parts.push(format!("snr={:.1}", node.snr));
    parts.join(" ")
}

fn packet_detail(packet: &MeshPacket) -> String {
    let payload = packet
        .decoded
        .as_ref()
        .map(|data| payload_preview(&data.payload))
        .unwrap_or_else(|| "<encrypted>".to_string());
    format!(
        "id={} to={} snr={:.1} payload={payload}",
        packet.id,
        node_id(packet.to),
        packet.rx_snr
    )
}

pub fn print_ports(ports: &[PortEntry], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out: Vec<PortOutput<'_>> = ports
                .iter()
                .map(|p| PortOutput {
                    name: &p.name,
                    kind: p.kind,
                    product: p.product.as_deref(),
                    usb_id: p.usb_id.as_deref(),
                })
                .collect();
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PORT", "TYPE", "PRODUCT", "USB ID"]);
            for port in ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.product.clone().unwrap_or_default(),
                    port.usb_id.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if ports.is_empty() {
                println!("no serial ports found");
            }
            for port in ports {
                println!(
                    "{} ({}){}",
                    port.name,
                    port.kind,
                    port.product
                        .as_deref()
                        .map(|p| format!(" {p}"))
                        .unwrap_or_default()
                );
            }
        }
    }
}

/// Node number in the `!xxxxxxxx` form radios display.
pub fn node_id(num: u32) -> String {
    format!("!{num:08x}")
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

#[cfg(test)]
mod tests {
    use meshwire_session::message::{ChannelSettings, Position, User, UserPreferences};

    use super::*;

    #[test]
    fn node_ids_are_zero_padded_hex() {
        assert_eq!(node_id(0xABCD), "!0000abcd");
        assert_eq!(node_id(u32::MAX), "!ffffffff");
    }

    #[test]
    fn config_rows_hide_secrets() {
        let config = RadioConfig {
            preferences: Some(UserPreferences {
                wifi_ssid: "base".to_string(),
                wifi_password: "hunter2".to_string(),
                ..UserPreferences::default()
            }),
            channel_settings: Some(ChannelSettings {
                name: "lora1".to_string(),
                psk: vec![1, 2, 3],
                ..ChannelSettings::default()
            }),
        };
        let rows = config_rows(&config);
        assert!(rows.iter().any(|(k, v)| *k == "channel_name" && v == "lora1"));
        assert!(rows.iter().all(|(_, v)| v != "hunter2"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("psk"));
    }

    #[test]
    fn node_event_row() {
        let event = Event::Node(NodeInfo {
            num: 1,
            user: Some(User {
                long_name: "summit".to_string(),
                ..User::default()
            }),
            position: Some(Position {
                latitude_i: 475_000_000,
                longitude_i: -1_220_000_000,
                battery_level: 80,
                ..Position::default()
            }),
            snr: 6.5,
        });
        let [topic, node, detail] = event_row(&event);
        assert_eq!(topic, "node-events");
        assert_eq!(node, "!00000001");
        assert_eq!(
            detail,
            "name=\"summit\" pos=47.50000,-122.00000 battery=80% snr=6.5"
        );
    }

    #[test]
    fn packet_without_payload_is_encrypted() {
        let detail = packet_detail(&MeshPacket {
            id: 5,
            to: u32::MAX,
            ..MeshPacket::default()
        });
        assert_eq!(detail, "id=5 to=!ffffffff snr=0.0 payload=<encrypted>");
    }
}
