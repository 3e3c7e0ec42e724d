use meshwire_session::message::RadioConfig;
use tracing::info;

use crate::cmd::SetConfigArgs;
use crate::exit::{session_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_device, DeviceReport, OutputFormat};

pub fn run(args: SetConfigArgs, format: OutputFormat) -> CliResult<i32> {
    if !has_changes(&args) {
        return Err(CliError::new(
            USAGE,
            "nothing to change; pass at least one setting (see --help)",
        ));
    }

    let (session, config_id) = args.device.connect()?;
    let mut config = session
        .device_config()
        .ok_or_else(|| CliError::new(DATA_INVALID, "radio did not report its configuration"))?;

    apply_changes(&args, &mut config);
    session
        .set_device_config(config.clone())
        .map_err(|err| session_error("write config failed", err))?;
    info!(port = %args.device.port, "radio config written");

    let report = DeviceReport {
        port: &args.device.port,
        config_id,
        identity: session.identity(),
        config: Some(config),
    };
    print_device(&report, format);

    session.close();
    Ok(SUCCESS)
}

fn has_changes(args: &SetConfigArgs) -> bool {
    args.channel_name.is_some()
        || args.position_broadcast_secs.is_some()
        || args.screen_on_secs.is_some()
        || args.wifi_ssid.is_some()
        || args.wifi_password.is_some()
        || args.wifi_ap_mode.is_some()
        || args.psk.is_some()
}

/// Overlay the requested settings on the radio's current config.
fn apply_changes(args: &SetConfigArgs, config: &mut RadioConfig) {
    let prefs = config.preferences.get_or_insert_with(Default::default);
    if let Some(secs) = args.position_broadcast_secs {
        prefs.position_broadcast_secs = secs;
    }
    if let Some(secs) = args.screen_on_secs {
        prefs.screen_on_secs = secs;
    }
    if let Some(ssid) = &args.wifi_ssid {
        prefs.wifi_ssid = ssid.clone();
    }
    if let Some(password) = &args.wifi_password {
        prefs.wifi_password = password.clone();
    }
    if let Some(ap_mode) = args.wifi_ap_mode {
        prefs.wifi_ap_mode = ap_mode;
    }

    if args.channel_name.is_none() && args.psk.is_none() {
        return;
    }
    let channel = config.channel_settings.get_or_insert_with(Default::default);
    if let Some(name) = &args.channel_name {
        channel.name = name.clone();
    }
    if let Some(psk) = &args.psk {
        channel.psk = psk.0.clone();
    }
}

#[cfg(test)]
mod tests {
    use meshwire_session::message::{ChannelSettings, UserPreferences};

    use super::*;
    use crate::cmd::{DeviceArgs, Psk};

    fn args() -> SetConfigArgs {
        SetConfigArgs {
            device: DeviceArgs {
                port: "/dev/ttyUSB0".to_string(),
                baud: 921_600,
                timeout: "1s".to_string(),
                config: None,
            },
            channel_name: None,
            position_broadcast_secs: None,
            screen_on_secs: None,
            wifi_ssid: None,
            wifi_password: None,
            wifi_ap_mode: None,
            psk: None,
        }
    }

    #[test]
    fn no_flags_means_no_changes() {
        assert!(!has_changes(&args()));
    }

    #[test]
    fn only_requested_fields_change() {
        let mut config = RadioConfig {
            preferences: Some(UserPreferences {
                position_broadcast_secs: 900,
                screen_on_secs: 60,
                wifi_ssid: "home".to_string(),
                ..UserPreferences::default()
            }),
            channel_settings: Some(ChannelSettings {
                name: "Default".to_string(),
                tx_power: 17,
                ..ChannelSettings::default()
            }),
        };
        let args = SetConfigArgs {
            screen_on_secs: Some(300),
            channel_name: Some("hikers".to_string()),
            ..args()
        };
        assert!(has_changes(&args));

        apply_changes(&args, &mut config);
        let prefs = config.preferences.unwrap();
        assert_eq!(prefs.screen_on_secs, 300);
        assert_eq!(prefs.position_broadcast_secs, 900);
        assert_eq!(prefs.wifi_ssid, "home");
        let channel = config.channel_settings.unwrap();
        assert_eq!(channel.name, "hikers");
        assert_eq!(channel.tx_power, 17);
    }

    #[test]
    fn psk_replaces_channel_key_only() {
        let mut config = RadioConfig {
            preferences: None,
            channel_settings: Some(ChannelSettings {
                name: "Default".to_string(),
                psk: vec![1; 16],
                ..ChannelSettings::default()
            }),
        };
        let args = SetConfigArgs {
            psk: Some(Psk(vec![0xEE; 32])),
            ..args()
        };
        assert!(has_changes(&args));

        apply_changes(&args, &mut config);
        let channel = config.channel_settings.unwrap();
        assert_eq!(channel.psk, vec![0xEE; 32]);
        assert_eq!(channel.name, "Default");
    }

    #[test]
    fn missing_sections_are_created() {
        let mut config = RadioConfig::default();
        let args = SetConfigArgs {
            wifi_ap_mode: Some(true),
            channel_name: Some("ops".to_string()),
            ..args()
        };
        apply_changes(&args, &mut config);
        assert!(config.preferences.unwrap().wifi_ap_mode);
        assert_eq!(config.channel_settings.unwrap().name, "ops");
    }
}
