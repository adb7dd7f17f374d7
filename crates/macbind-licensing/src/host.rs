//! ---
//! macbind_section: "02-license-core"
//! macbind_subsection: "module"
//! macbind_type: "source"
//! macbind_scope: "code"
//! macbind_description: "Enumerates MAC addresses of the local host's active interfaces."
//! macbind_version: "v0.1.0"
//! macbind_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::fingerprint::{normalize_mac, FingerprintSet, ZERO_MAC};

/// Default sysfs directory listing network interfaces on Linux.
pub const SYSFS_NET_ROOT: &str = "/sys/class/net";

const IFF_UP: u32 = 0x1;
const IFF_LOOPBACK: u32 = 0x8;

/// Source of the MAC addresses a license is checked against.
pub trait MacAddressSource: Send + Sync {
    /// Normalized, deduplicated addresses of non-loopback interfaces.
    /// All-zero addresses are never reported.
    fn active_mac_addresses(&self) -> Result<FingerprintSet>;
}

/// Reads interfaces from the operating system.
///
/// Linux walks sysfs; other unix systems parse `ifconfig`; Windows parses
/// `getmac /fo csv /nh`.
#[derive(Debug, Clone, Default)]
pub struct SystemInterfaces {
    sysfs_root: Option<PathBuf>,
}

impl SystemInterfaces {
    /// Platform default enumeration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read interfaces from a sysfs-shaped directory instead of the platform default.
    #[must_use]
    pub fn with_sysfs_root(root: impl Into<PathBuf>) -> Self {
        Self {
            sysfs_root: Some(root.into()),
        }
    }
}

impl MacAddressSource for SystemInterfaces {
    fn active_mac_addresses(&self) -> Result<FingerprintSet> {
        let macs = match &self.sysfs_root {
            Some(root) => read_sysfs(root)?,
            None => platform_mac_addresses()?,
        };
        debug!(count = macs.len(), "enumerated host MAC addresses");
        Ok(macs)
    }
}

#[cfg(target_os = "linux")]
fn platform_mac_addresses() -> Result<FingerprintSet> {
    read_sysfs(Path::new(SYSFS_NET_ROOT))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn platform_mac_addresses() -> Result<FingerprintSet> {
    Ok(parse_ifconfig_output(&run("ifconfig", &[])?))
}

#[cfg(windows)]
fn platform_mac_addresses() -> Result<FingerprintSet> {
    Ok(parse_getmac_output(&run("getmac", &["/fo", "csv", "/nh"])?))
}

#[cfg(not(any(unix, windows)))]
fn platform_mac_addresses() -> Result<FingerprintSet> {
    Ok(FingerprintSet::new())
}

#[cfg(not(target_os = "linux"))]
fn run(program: &str, args: &[&str]) -> Result<String> {
    let output = std::process::Command::new(program).args(args).output()?;
    if !output.status.success() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("{program} exited with {}", output.status),
        )
        .into());
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Collect addresses from a `/sys/class/net` style tree.
///
/// Each interface directory must carry `address` and `flags` files;
/// interfaces missing either are skipped.
pub fn read_sysfs(root: &Path) -> Result<FingerprintSet> {
    let mut macs = FingerprintSet::new();
    for entry in fs::read_dir(root)? {
        let dir = entry?.path();
        let Some(flags) = read_trimmed(&dir.join("flags")).and_then(|raw| parse_flags(&raw)) else {
            continue;
        };
        if flags & IFF_LOOPBACK != 0 || flags & IFF_UP == 0 {
            continue;
        }
        if let Some(address) = read_trimmed(&dir.join("address")) {
            insert_hardware_address(&mut macs, &address);
        }
    }
    Ok(macs)
}

/// Extract `ether` addresses from BSD/macOS `ifconfig` output.
#[must_use]
pub fn parse_ifconfig_output(output: &str) -> FingerprintSet {
    let mut macs = FingerprintSet::new();
    for line in output.lines() {
        let mut words = line.split_whitespace();
        if words.next() == Some("ether") {
            if let Some(address) = words.next() {
                insert_hardware_address(&mut macs, address);
            }
        }
    }
    macs
}

/// Extract addresses from `getmac /fo csv /nh` output.
///
/// Each row looks like `"F0-18-98-32-4E-E5","\Device\Tcpip_{...}"`; rows
/// for disconnected adapters carry `N/A` and are dropped by the address check.
#[must_use]
pub fn parse_getmac_output(output: &str) -> FingerprintSet {
    let mut macs = FingerprintSet::new();
    for line in output.lines() {
        if let Some(first) = line.split(',').next() {
            insert_hardware_address(&mut macs, first.trim().trim_matches('"'));
        }
    }
    macs
}

/// Static address list, used for `mac_override` and tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticMacAddresses {
    macs: FingerprintSet,
}

impl StaticMacAddresses {
    /// Normalize `macs`, dropping zero and malformed entries.
    pub fn new<I, S>(macs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = FingerprintSet::new();
        for mac in macs {
            insert_hardware_address(&mut set, mac.as_ref());
        }
        Self { macs: set }
    }
}

impl MacAddressSource for StaticMacAddresses {
    fn active_mac_addresses(&self) -> Result<FingerprintSet> {
        Ok(self.macs.clone())
    }
}

fn insert_hardware_address(macs: &mut FingerprintSet, raw: &str) {
    let normalized = normalize_mac(raw);
    if is_hardware_address(&normalized) {
        macs.insert(&normalized);
    }
}

fn is_hardware_address(normalized: &str) -> bool {
    normalized != ZERO_MAC
        && normalized.len() == ZERO_MAC.len()
        && normalized
            .split(':')
            .all(|octet| octet.len() == 2 && octet.chars().all(|ch| ch.is_ascii_hexdigit()))
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|raw| raw.trim().to_owned())
}

fn parse_flags(raw: &str) -> Option<u32> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fake_interface(root: &Path, name: &str, address: &str, flags: &str) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("address"), format!("{address}\n")).unwrap();
        fs::write(dir.join("flags"), format!("{flags}\n")).unwrap();
    }

    #[test]
    fn sysfs_skips_loopback_down_and_zero_interfaces() {
        let root = tempdir().unwrap();
        fake_interface(root.path(), "lo", "00:00:00:00:00:00", "0x9");
        fake_interface(root.path(), "eth0", "80:18:44:E6:28:F4", "0x1003");
        fake_interface(root.path(), "eth1", "80:18:44:e6:d1:74", "0x1002");
        fake_interface(root.path(), "tun0", "00:00:00:00:00:00", "0x1091");
        fake_interface(root.path(), "wlan0", "80:18:44:e6:28:f4", "0x1003");

        let macs = SystemInterfaces::with_sysfs_root(root.path())
            .active_mac_addresses()
            .unwrap();
        assert_eq!(macs.iter().collect::<Vec<_>>(), vec!["80:18:44:e6:28:f4"]);
    }

    #[test]
    fn sysfs_ignores_incomplete_entries() {
        let root = tempdir().unwrap();
        fs::create_dir_all(root.path().join("bond0")).unwrap();
        fake_interface(root.path(), "eth0", "02:42:ac:11:00:02", "0x1003");
        let macs = read_sysfs(root.path()).unwrap();
        assert_eq!(macs.len(), 1);
    }

    #[test]
    fn missing_sysfs_root_is_an_error() {
        let root = tempdir().unwrap();
        assert!(read_sysfs(&root.path().join("absent")).is_err());
    }

    #[test]
    fn parses_ifconfig_ether_lines() {
        let output = "\
lo0: flags=8049<UP,LOOPBACK,RUNNING,MULTICAST> mtu 16384
\tinet 127.0.0.1 netmask 0xff000000
en0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tether a4:83:e7:1c:22:9b
\tinet 192.168.1.20 netmask 0xffffff00 broadcast 192.168.1.255
bridge0: flags=8863<UP,BROADCAST,SMART,RUNNING,SIMPLEX,MULTICAST> mtu 1500
\tether 00:00:00:00:00:00
";
        let macs = parse_ifconfig_output(output);
        assert_eq!(macs.iter().collect::<Vec<_>>(), vec!["a4:83:e7:1c:22:9b"]);
    }

    #[test]
    fn parses_getmac_csv() {
        let output = "\
\"F0-18-98-32-4E-E5\",\"\\Device\\Tcpip_{4D36E972-E325-11CE-BFC1-08002BE10318}\"
\"N/A\",\"Media disconnected\"
\"0A-00-27-00-00-0C\",\"\\Device\\Tcpip_{1B6C7D3E-0000-0000-0000-000000000000}\"
";
        let macs = parse_getmac_output(output);
        assert!(macs.contains("f0:18:98:32:4e:e5"));
        assert!(macs.contains("0a:00:27:00:00:0c"));
        assert_eq!(macs.len(), 2);
    }

    #[test]
    fn static_source_normalizes_and_filters() {
        let source = StaticMacAddresses::new([
            "AA-BB-CC-DD-EE-FF",
            "00:00:00:00:00:00",
            "aa:bb:cc:dd:ee:ff",
        ]);
        let macs = source.active_mac_addresses().unwrap();
        assert_eq!(macs.iter().collect::<Vec<_>>(), vec!["aa:bb:cc:dd:ee:ff"]);
    }
}
