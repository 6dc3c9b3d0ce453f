//! Platform capability lookup, keyed by platform identifier.

use serde::Serialize;

/// How a platform's commands reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    /// Run on the routing host through a local shell (`birdc`, `vtysh`, `ping`).
    Shell,
    /// Sent to the device's own CLI over a management session.
    DeviceCli,
}

impl Interface {
    /// Characters refused in user values on top of the common set.
    ///
    /// A shell expands `$VAR` even inside double quotes, so values bound for
    /// `birdc "..."` or `vtysh -c "..."` must not carry `$`. Device CLIs treat
    /// `$` literally, where it anchors AS path regexes.
    pub fn forbidden_chars(self) -> &'static [char] {
        match self {
            Interface::Shell => &['$'],
            Interface::DeviceCli => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Platform {
    pub id: &'static str,
    pub name: &'static str,
    pub interface: Interface,
}

static PLATFORMS: &[Platform] = &[
    Platform {
        id: "arista_eos",
        name: "Arista EOS",
        interface: Interface::DeviceCli,
    },
    Platform {
        id: "bird",
        name: "BIRD",
        interface: Interface::Shell,
    },
    Platform {
        id: "cisco_ios",
        name: "Cisco IOS",
        interface: Interface::DeviceCli,
    },
    Platform {
        id: "frr",
        name: "FRRouting",
        interface: Interface::Shell,
    },
    Platform {
        id: "juniper",
        name: "Juniper Junos",
        interface: Interface::DeviceCli,
    },
];

/// Capabilities of a built-in platform.
pub fn lookup(id: &str) -> Option<&'static Platform> {
    PLATFORMS.iter().find(|p| p.id == id)
}

/// All built-in platform ids.
pub fn known() -> impl Iterator<Item = &'static str> {
    PLATFORMS.iter().map(|p| p.id)
}

/// Display name, falling back to the id for operator-defined platforms.
pub fn display_name(id: &str) -> &str {
    lookup(id).map(|p| p.name).unwrap_or(id)
}

/// Operator-defined platforms are assumed to be device CLIs.
pub fn interface(id: &str) -> Interface {
    lookup(id).map(|p| p.interface).unwrap_or(Interface::DeviceCli)
}
