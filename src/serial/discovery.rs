//! Serial ports and the USB devices behind them.
//!
//! Ports are enumerated with [serial2]. Vendor and product ids, the device
//! release number and the descriptor strings are read from sysfs, where the
//! `device` link of `/sys/class/tty/<port>` points into the USB interface of
//! the board. A [ModelTable] then names the board.

use super::SerialError;

use log::debug;
use serde::{Deserialize, Serialize};
use serial2::SerialPort;

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

/// Default root of the sysfs tree.
pub const SYSFS_ROOT: &str = "/sys";

/// A known board type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceModel {
    /// USB vendor id.
    pub vendor_id: u16,
    /// USB product id.
    pub product_id: u16,
    /// Device release number identifying the exact board, any if `None`.
    #[serde(default)]
    pub bcd_device: Option<u16>,
    /// Contained in the manufacturer string reported by the board.
    #[serde(default)]
    pub manufacturer: Option<String>,
    /// Name of the board type.
    pub model: String,
}

impl DeviceModel {
    fn new(vendor_id: u16, product_id: u16, bcd_device: Option<u16>, model: &str) -> Self {
        Self {
            vendor_id,
            product_id,
            bcd_device,
            manufacturer: None,
            model: model.to_owned(),
        }
    }

    fn made_by(mut self, manufacturer: &str) -> Self {
        self.manufacturer = Some(manufacturer.to_owned());
        self
    }

    fn matches(&self, usb: &UsbInfo) -> bool {
        let manufacturer_ok = match (&self.manufacturer, &usb.manufacturer) {
            (Some(expected), Some(reported)) => reported
                .to_lowercase()
                .contains(&expected.to_lowercase()),
            _ => true,
        };
        self.vendor_id == usb.vendor_id
            && self.product_id == usb.product_id
            && self.bcd_device.map_or(true, |bcd| Some(bcd) == usb.bcd_device)
            && manufacturer_ok
    }
}

const TEENSY_VID: u16 = 0x16C0;
const TEENSY_PIDS: [u16; 3] = [0x0483, 0x048B, 0x048C];
const TEENSY_BOARDS: [(u16, &str); 8] = [
    (0x0273, "Teensy LC"),
    (0x0274, "Teensy 3.0"),
    (0x0275, "Teensy 3.2"),
    (0x0276, "Teensy 3.5"),
    (0x0277, "Teensy 3.6"),
    (0x0279, "Teensy 4.0"),
    (0x0280, "Teensy 4.1"),
    (0x0281, "Teensy MicroMod"),
];

/// Board types to look for on the serial ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelTable {
    /// Entries in no particular order.
    pub models: Vec<DeviceModel>,
}

impl Default for ModelTable {
    fn default() -> Self {
        let mut models = Vec::new();
        for pid in TEENSY_PIDS {
            for (bcd, name) in TEENSY_BOARDS {
                models.push(DeviceModel::new(TEENSY_VID, pid, Some(bcd), name).made_by("Teensy"));
            }
            models.push(DeviceModel::new(TEENSY_VID, pid, None, "Teensy").made_by("Teensy"));
        }
        models.extend([
            DeviceModel::new(0x2341, 0x0043, None, "Arduino Uno"),
            DeviceModel::new(0x2341, 0x0042, None, "Arduino Mega 2560"),
            DeviceModel::new(0x2341, 0x003D, None, "Arduino Due"),
            DeviceModel::new(0x2341, 0x8036, None, "Arduino Leonardo"),
            DeviceModel::new(0x2E8A, 0x000A, None, "Raspberry Pi Pico"),
        ]);
        Self { models }
    }
}

impl ModelTable {
    /// Parses a table written in RON, a list of [DeviceModel]s.
    pub fn from_ron_str(text: &str) -> Result<Self, SerialError> {
        Ok(ron::de::from_str(text)?)
    }

    /// Reads a table written in RON from `path`.
    pub fn from_ron(path: impl AsRef<Path>) -> Result<Self, SerialError> {
        let text = fs::read(path)?;
        Ok(ron::de::from_bytes(&text)?)
    }

    /// The best matching model. Entries for the exact device release win
    /// over generic ones.
    pub fn lookup(&self, usb: &UsbInfo) -> Option<&DeviceModel> {
        self.models
            .iter()
            .filter(|m| m.matches(usb))
            .max_by_key(|m| m.bcd_device.is_some() as u8 * 2 + m.manufacturer.is_some() as u8)
    }
}

/// USB descriptor of the device behind a serial port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsbInfo {
    /// `idVendor`.
    pub vendor_id: u16,
    /// `idProduct`.
    pub product_id: u16,
    /// `bcdDevice`, the device release number.
    pub bcd_device: Option<u16>,
    /// Manufacturer string descriptor.
    pub manufacturer: Option<String>,
    /// Product string descriptor.
    pub product: Option<String>,
    /// Serial number string descriptor.
    pub serial_number: Option<String>,
}

fn read_attribute(dir: &Path, name: &str) -> Option<String> {
    let text = fs::read_to_string(dir.join(name)).ok()?;
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_owned())
}

fn read_hex(dir: &Path, name: &str) -> Option<u16> {
    u16::from_str_radix(&read_attribute(dir, name)?, 16).ok()
}

impl UsbInfo {
    /// Reads the USB descriptor of port `name` (e.g. `ttyACM0`) below
    /// `sysfs_root`. `None` for ports that are not USB devices.
    pub fn from_sysfs(sysfs_root: impl AsRef<Path>, name: &str) -> Option<Self> {
        let device = sysfs_root
            .as_ref()
            .join("class/tty")
            .join(name)
            .join("device");
        let device = device.canonicalize().unwrap_or(device);
        // interface, then the device itself, deeper for usb-serial adapters
        let dir = device
            .ancestors()
            .take(4)
            .find(|dir| dir.join("idVendor").is_file())?;
        debug!("usb attributes of {} in {}", name, dir.display());
        Some(Self {
            vendor_id: read_hex(dir, "idVendor")?,
            product_id: read_hex(dir, "idProduct")?,
            bcd_device: read_hex(dir, "bcdDevice"),
            manufacturer: read_attribute(dir, "manufacturer"),
            product: read_attribute(dir, "product"),
            serial_number: read_attribute(dir, "serial"),
        })
    }
}

/// A serial port and what is known about the board on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device node of the port.
    pub path: PathBuf,
    /// `None` for ports that are not USB devices.
    pub usb: Option<UsbInfo>,
    /// Board type from the model table.
    pub model: Option<DeviceModel>,
}

impl Device {
    /// Describes the port at `path`.
    pub fn describe(path: PathBuf, table: &ModelTable, sysfs_root: impl AsRef<Path>) -> Self {
        let usb = path
            .file_name()
            .and_then(|name| UsbInfo::from_sysfs(sysfs_root, &name.to_string_lossy()));
        let model = usb.as_ref().and_then(|usb| table.lookup(usb)).cloned();
        Self { path, usb, model }
    }

    /// Whether the board is in the model table.
    pub fn is_known(&self) -> bool {
        self.model.is_some()
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(usb) = &self.usb {
            let show = |s: &Option<String>| s.clone().unwrap_or_else(|| "-".to_owned());
            write!(
                f,
                " {:04X}:{:04X} {} {} {}",
                usb.vendor_id,
                usb.product_id,
                show(&usb.manufacturer),
                show(&usb.product),
                show(&usb.serial_number)
            )?;
        }
        if let Some(model) = &self.model {
            write!(f, " [{}]", model.model)?;
        }
        Ok(())
    }
}

/// All serial ports with their USB descriptors and board models.
pub fn discover(table: &ModelTable, sysfs_root: impl AsRef<Path>) -> Result<Vec<Device>, SerialError> {
    let mut ports = SerialPort::available_ports()?;
    ports.sort();
    Ok(ports
        .into_iter()
        .map(|path| Device::describe(path, table, sysfs_root.as_ref()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn usb(vid: u16, pid: u16, bcd: Option<u16>, manufacturer: Option<&str>) -> UsbInfo {
        UsbInfo {
            vendor_id: vid,
            product_id: pid,
            bcd_device: bcd,
            manufacturer: manufacturer.map(str::to_owned),
            ..UsbInfo::default()
        }
    }

    fn sysfs_port(root: &Path, name: &str, attributes: &[(&str, &str)]) {
        let port = root.join("class/tty").join(name);
        fs::create_dir_all(port.join("device")).unwrap();
        for (file, content) in attributes {
            fs::write(port.join(file), format!("{}\n", content)).unwrap();
        }
    }

    #[test]
    fn teensy_boards_by_release() {
        let table = ModelTable::default();
        let teensy41 = usb(0x16C0, 0x0483, Some(0x0280), Some("Teensyduino"));
        assert_eq!(table.lookup(&teensy41).unwrap().model, "Teensy 4.1");
        let unknown_release = usb(0x16C0, 0x048B, Some(0x0999), None);
        assert_eq!(table.lookup(&unknown_release).unwrap().model, "Teensy");
        let other_vendor = usb(0x16C0, 0x0483, Some(0x0280), Some("ACME"));
        assert!(table.lookup(&other_vendor).is_none());
        let pico = usb(0x2E8A, 0x000A, Some(0x0100), Some("Raspberry Pi"));
        assert_eq!(table.lookup(&pico).unwrap().model, "Raspberry Pi Pico");
        assert!(table.lookup(&usb(0x1234, 0x5678, None, None)).is_none());
    }

    #[test]
    fn model_table_from_ron() {
        let table = ModelTable::from_ron_str(
            r#"[
                (vendor_id: 0x16C0, product_id: 0x0483, bcd_device: Some(0x0280),
                 model: "recorder R4"),
                (vendor_id: 0x0403, product_id: 0x6001, manufacturer: Some("FTDI"),
                 model: "FTDI adapter"),
            ]"#,
        )
        .unwrap();
        assert_eq!(table.models.len(), 2);
        assert_eq!(table.models[1].manufacturer.as_deref(), Some("FTDI"));
        let teensy41 = usb(0x16C0, 0x0483, Some(0x0280), None);
        assert_eq!(table.lookup(&teensy41).unwrap().model, "recorder R4");
        assert!(ModelTable::from_ron_str("[(model: 3)]").is_err());

        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), ron::ser::to_string(&ModelTable::default()).unwrap()).unwrap();
        assert_eq!(ModelTable::from_ron(file.path()).unwrap(), ModelTable::default());
    }

    #[test]
    fn usb_info_from_sysfs() {
        let root = TempDir::new().unwrap();
        sysfs_port(
            root.path(),
            "ttyACM0",
            &[
                ("idVendor", "16c0"),
                ("idProduct", "0483"),
                ("bcdDevice", "0279"),
                ("manufacturer", "Teensyduino"),
                ("product", "USB Serial"),
                ("serial", "12345670"),
            ],
        );
        sysfs_port(root.path(), "ttyS0", &[]);

        let info = UsbInfo::from_sysfs(root.path(), "ttyACM0").unwrap();
        assert_eq!(info.vendor_id, 0x16C0);
        assert_eq!(info.bcd_device, Some(0x0279));
        assert_eq!(info.serial_number.as_deref(), Some("12345670"));
        assert!(UsbInfo::from_sysfs(root.path(), "ttyS0").is_none());

        let table = ModelTable::default();
        let device = Device::describe(PathBuf::from("/dev/ttyACM0"), &table, root.path());
        assert!(device.is_known());
        assert_eq!(
            device.to_string(),
            "/dev/ttyACM0 16C0:0483 Teensyduino USB Serial 12345670 [Teensy 4.0]"
        );
        let plain = Device::describe(PathBuf::from("/dev/ttyS0"), &table, root.path());
        assert!(!plain.is_known());
        assert_eq!(plain.to_string(), "/dev/ttyS0");
    }
}
