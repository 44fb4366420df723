//! Wi-Fi network listing through the platform's command-line tools.
//!
//! - Windows: `netsh wlan show networks mode=bssid`
//! - Linux: `nmcli -t -f SSID,SIGNAL device wifi list`
//!
//! Both tools report signal quality as a percentage, converted to dBm with
//! [`percent_to_dbm`]. Hidden networks (empty SSID) are skipped.

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use super::{ProbeError, ProbeResult, WifiProbe};
use crate::config::{WifiBackend, WifiConfig};
use crate::types::{percent_to_dbm, WifiObservation};

static NETSH_SSID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SSID\s+\d+\s*:\s?(.*)$").expect("valid SSID regex"));
static NETSH_SIGNAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Signal\s*:\s*(\d{1,3})\s*%").expect("valid signal regex"));

/// Run a listing command and return its stdout.
async fn run_listing(program: &str, args: &[&str]) -> ProbeResult<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => ProbeError::unavailable(format!("{program} not found")),
            _ => ProbeError::failed(format!("failed to run {program}: {e}")),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProbeError::failed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

// ============================================================================
// netsh
// ============================================================================

/// Wi-Fi probe backed by `netsh wlan` (Windows).
#[derive(Debug, Clone, Default)]
pub struct NetshWifiProbe;

#[async_trait]
impl WifiProbe for NetshWifiProbe {
    async fn list_networks(&self) -> ProbeResult<Vec<WifiObservation>> {
        let stdout = run_listing("netsh", &["wlan", "show", "networks", "mode=bssid"]).await?;
        let networks = parse_netsh(&stdout);
        debug!(count = networks.len(), "netsh listed networks");
        Ok(networks)
    }
}

/// Parse `netsh wlan show networks mode=bssid` output.
///
/// Every `Signal` line after an `SSID n :` header yields one observation for
/// that SSID, so an SSID served by several BSSIDs appears once per BSSID.
/// Signal lines that fail to parse are skipped.
#[must_use]
pub fn parse_netsh(output: &str) -> Vec<WifiObservation> {
    let mut networks = Vec::new();
    let mut current: Option<String> = None;

    for line in output.lines().map(str::trim) {
        if let Some(caps) = NETSH_SSID.captures(line) {
            let ssid = caps[1].trim();
            current = (!ssid.is_empty()).then(|| ssid.to_string());
        } else if let Some(ssid) = &current {
            if let Some(caps) = NETSH_SIGNAL.captures(line) {
                if let Ok(percent) = caps[1].parse::<u8>() {
                    networks.push(WifiObservation::new(
                        ssid.clone(),
                        percent_to_dbm(percent.min(100)),
                    ));
                }
            }
        }
    }

    networks
}

// ============================================================================
// nmcli
// ============================================================================

/// Wi-Fi probe backed by NetworkManager's `nmcli` (Linux).
#[derive(Debug, Clone, Default)]
pub struct NmcliWifiProbe {
    interface: Option<String>,
}

impl NmcliWifiProbe {
    /// Create a probe, optionally restricted to one interface.
    #[must_use]
    pub const fn new(interface: Option<String>) -> Self {
        Self { interface }
    }
}

#[async_trait]
impl WifiProbe for NmcliWifiProbe {
    async fn list_networks(&self) -> ProbeResult<Vec<WifiObservation>> {
        let mut args = vec!["-t", "-f", "SSID,SIGNAL", "device", "wifi", "list"];
        if let Some(interface) = &self.interface {
            args.extend(["ifname", interface.as_str()]);
        }

        let stdout = run_listing("nmcli", &args).await?;
        let networks = parse_nmcli(&stdout);
        debug!(count = networks.len(), "nmcli listed networks");
        Ok(networks)
    }
}

/// Parse terse `nmcli -t -f SSID,SIGNAL device wifi list` output.
///
/// Colons inside an SSID are escaped as `\:` and backslashes as `\\`.
#[must_use]
pub fn parse_nmcli(output: &str) -> Vec<WifiObservation> {
    output
        .lines()
        .filter_map(|line| {
            let fields = split_terse(line);
            let [ssid, signal] = fields.as_slice() else {
                return None;
            };
            if ssid.is_empty() {
                return None;
            }
            let percent = signal.trim().parse::<u8>().ok()?;
            Some(WifiObservation::new(
                ssid.clone(),
                percent_to_dbm(percent.min(100)),
            ))
        })
        .collect()
}

/// Split one line of nmcli terse output on unescaped colons.
fn split_terse(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    field.push(escaped);
                }
            }
            ':' => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

// ============================================================================
// Platform selection
// ============================================================================

/// The Wi-Fi probe for this host, chosen from configuration.
#[derive(Debug, Clone)]
pub enum SystemWifiProbe {
    /// `netsh wlan`.
    Netsh(NetshWifiProbe),
    /// `nmcli`.
    Nmcli(NmcliWifiProbe),
}

impl SystemWifiProbe {
    /// Pick the backend named in `config`, or the platform default for `auto`.
    #[must_use]
    pub fn from_config(config: &WifiConfig) -> Self {
        match config.backend {
            WifiBackend::Netsh => Self::Netsh(NetshWifiProbe),
            WifiBackend::Nmcli => Self::Nmcli(NmcliWifiProbe::new(config.interface.clone())),
            WifiBackend::Auto if cfg!(windows) => Self::Netsh(NetshWifiProbe),
            WifiBackend::Auto => Self::Nmcli(NmcliWifiProbe::new(config.interface.clone())),
        }
    }
}

#[async_trait]
impl WifiProbe for SystemWifiProbe {
    async fn list_networks(&self) -> ProbeResult<Vec<WifiObservation>> {
        match self {
            Self::Netsh(probe) => probe.list_networks().await,
            Self::Nmcli(probe) => probe.list_networks().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NETSH_OUTPUT: &str = "
Interface name : Wi-Fi
There are 3 networks currently visible.

SSID 1 : HomeNet
    Network type            : Infrastructure
    Authentication          : WPA2-Personal
    Encryption              : CCMP
    BSSID 1                 : aa:bb:cc:dd:ee:01
         Signal             : 100%
         Radio type         : 802.11ax
    BSSID 2                 : aa:bb:cc:dd:ee:02
         Signal             : 60%
         Radio type         : 802.11ac

SSID 2 :
    Network type            : Infrastructure
    BSSID 1                 : aa:bb:cc:dd:ee:03
         Signal             : 40%

SSID 3 : Cafe Guest
    Network type            : Infrastructure
    BSSID 1                 : aa:bb:cc:dd:ee:04
         Signal             : n/a
    BSSID 2                 : aa:bb:cc:dd:ee:05
         Signal             : 81%
";

    #[test]
    fn test_parse_netsh() {
        let networks = parse_netsh(NETSH_OUTPUT);
        assert_eq!(
            networks,
            vec![
                WifiObservation::new("HomeNet", -50.0),
                WifiObservation::new("HomeNet", -70.0),
                WifiObservation::new("Cafe Guest", -59.5),
            ]
        );
    }

    #[test]
    fn test_parse_netsh_empty_output() {
        assert!(parse_netsh("").is_empty());
        assert!(parse_netsh("There are 0 networks currently visible.").is_empty());
    }

    #[test]
    fn test_parse_nmcli() {
        let output = "HomeNet:100\n:40\nMy\\:Net:50\nBack\\\\slash:20\nbroken line\nNoSignal:\n";
        let networks = parse_nmcli(output);
        assert_eq!(
            networks,
            vec![
                WifiObservation::new("HomeNet", -50.0),
                WifiObservation::new("My:Net", -75.0),
                WifiObservation::new("Back\\slash", -90.0),
            ]
        );
    }

    #[test]
    fn test_split_terse() {
        assert_eq!(split_terse("a:b"), vec!["a", "b"]);
        assert_eq!(split_terse("a\\:b:c"), vec!["a:b", "c"]);
        assert_eq!(split_terse(""), vec![""]);
    }

    #[test]
    fn test_system_probe_from_config() {
        let config = WifiConfig {
            backend: WifiBackend::Nmcli,
            interface: Some("wlan1".into()),
        };
        assert!(matches!(
            SystemWifiProbe::from_config(&config),
            SystemWifiProbe::Nmcli(NmcliWifiProbe { interface: Some(ref i) }) if i == "wlan1"
        ));

        let config = WifiConfig {
            backend: WifiBackend::Netsh,
            interface: None,
        };
        assert!(matches!(
            SystemWifiProbe::from_config(&config),
            SystemWifiProbe::Netsh(_)
        ));
    }
}
