/// A physical unit found during enumeration.
///
/// Rebuilt on every device-list poll. Two devices are the same device when
/// their OS ids match; serial number and product are informational.
#[derive(Debug, Clone, Default)]
pub struct Device {
    pub product: u32,
    pub serial_number: String,
    pub os_id: String,
    pub firmware_version: u16,
}

impl Device {
    pub fn new(product: u32, serial_number: impl Into<String>, os_id: impl Into<String>) -> Self {
        Self {
            product,
            serial_number: serial_number.into(),
            os_id: os_id.into(),
            firmware_version: 0x0100,
        }
    }

    /// "#SERIAL" label used by device selectors.
    pub fn label(&self) -> String {
        format!("#{}", self.serial_number)
    }
}

impl PartialEq for Device {
    fn eq(&self, other: &Self) -> bool {
        self.os_id == other.os_id
    }
}

impl Eq for Device {}

/// Finds the device with the given OS id in `list`.
pub fn find_by_os_id<'a>(list: &'a [Device], os_id: &str) -> Option<&'a Device> {
    list.iter().find(|d| d.os_id == os_id)
}

/// True when both lists hold the same OS ids in the same order.
pub fn same_device_list(a: &[Device], b: &[Device]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.os_id == y.os_id)
}
