//! Serial port enumeration.
//!
//! Device paths are not stable across board resets: the OS may hand out a new
//! path, or reuse one that belonged to another device a moment ago. Nothing in
//! this crate relies on a path staying the same. Instead every query produces
//! a fresh [`PortSnapshot`], and newly attached devices are found by set
//! difference between two snapshots.
//!
//! ```text
//! +---------------------+        +----------------------+
//! |  verify / discover  | -----> |  PortEnumerator      |
//! +---------------------+        +----------+-----------+
//!                                           |
//!                       +-------------------+------------------+
//!                       v                                      v
//!            +----------+-----------+             +------------+---------+
//!            | NativePortEnumerator |             |  scripted (tests)    |
//!            |     (serialport)     |             |                      |
//!            +----------------------+             +----------------------+
//! ```

#[cfg(feature = "native")]
pub mod native;

use std::collections::BTreeSet;

use crate::device::UsbIdentity;
use crate::error::Result;

/// Serial port information.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortInfo {
    /// Port name/path.
    pub name: String,
    /// USB vendor ID (if available).
    pub vid: Option<u16>,
    /// USB product ID (if available).
    pub pid: Option<u16>,
    /// Manufacturer string (if available).
    pub manufacturer: Option<String>,
    /// Product string (if available).
    pub product: Option<String>,
    /// Serial number (if available).
    pub serial_number: Option<String>,
}

/// Set of port names captured at one instant for one device identity.
///
/// Ordered so that "the first new port" is deterministic when more than one
/// device appears between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSnapshot {
    ports: BTreeSet<String>,
}

impl PortSnapshot {
    /// Build a snapshot from the ports matching `identity`.
    pub fn from_ports(ports: &[PortInfo], identity: UsbIdentity) -> Self {
        ports
            .iter()
            .filter(|p| identity.matches(p))
            .map(|p| p.name.clone())
            .collect()
    }

    /// Check whether the snapshot contains `port`.
    pub fn contains(&self, port: &str) -> bool {
        self.ports.contains(port)
    }

    /// Ports present in `self` but not in `earlier`.
    #[must_use]
    pub fn difference(&self, earlier: &Self) -> Self {
        self.ports
            .difference(&earlier.ports)
            .cloned()
            .collect()
    }

    /// Whether no ports were captured.
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Number of captured ports.
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Iterate port names in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ports.iter().map(String::as_str)
    }

    /// First port name in order.
    pub fn first(&self) -> Option<&str> {
        self.ports.first().map(String::as_str)
    }

    /// Port names as an owned, ordered vector.
    pub fn to_vec(&self) -> Vec<String> {
        self.ports.iter().cloned().collect()
    }
}

impl FromIterator<String> for PortSnapshot {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

/// Source of attached serial ports.
///
/// Implementations only report what is attached; they never open a port.
pub trait PortEnumerator {
    /// List all available serial ports.
    fn list_ports(&mut self) -> Result<Vec<PortInfo>>;

    /// Snapshot the ports whose USB identity matches `identity` exactly.
    ///
    /// Zero matches is an empty snapshot, not an error.
    fn snapshot(&mut self, identity: UsbIdentity) -> Result<PortSnapshot> {
        let ports = self.list_ports()?;
        Ok(PortSnapshot::from_ports(&ports, identity))
    }
}

impl<E: PortEnumerator + ?Sized> PortEnumerator for &mut E {
    fn list_ports(&mut self) -> Result<Vec<PortInfo>> {
        (**self).list_ports()
    }
}

#[cfg(feature = "native")]
pub use native::NativePortEnumerator;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted enumerator for state-machine tests.

    use std::collections::VecDeque;

    use super::{PortEnumerator, PortInfo};
    use crate::device::UsbIdentity;
    use crate::error::Result;

    /// Returns a queued port list per call; repeats the last list when the
    /// queue runs dry.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedEnumerator {
        queue: VecDeque<Vec<PortInfo>>,
        last: Vec<PortInfo>,
        pub(crate) calls: usize,
    }

    impl ScriptedEnumerator {
        pub(crate) fn new<I>(lists: I) -> Self
        where
            I: IntoIterator<Item = Vec<PortInfo>>,
        {
            Self {
                queue: lists.into_iter().collect(),
                ..Self::default()
            }
        }
    }

    impl PortEnumerator for ScriptedEnumerator {
        fn list_ports(&mut self) -> Result<Vec<PortInfo>> {
            self.calls += 1;
            if let Some(next) = self.queue.pop_front() {
                self.last = next;
            }
            Ok(self.last.clone())
        }
    }

    /// A USB port entry carrying `identity`.
    pub(crate) fn usb_port(name: &str, identity: UsbIdentity) -> PortInfo {
        PortInfo {
            name: name.to_string(),
            vid: Some(identity.vid),
            pid: Some(identity.pid),
            ..PortInfo::default()
        }
    }
}
