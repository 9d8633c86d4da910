//! Assertion type tags.

use std::fmt;

/// The type tag of an assertion document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssertionKind {
    /// A device's request for a serial assertion, signed by the device.
    SerialRequest,
    /// The authority-signed serial assertion issued back to the device.
    Serial,
    /// A brand/model identity assertion.
    Model,
}

impl AssertionKind {
    /// The wire name of the type tag.
    pub fn name(self) -> &'static str {
        match self {
            Self::SerialRequest => "serial-request",
            Self::Serial => "serial",
            Self::Model => "model",
        }
    }

    /// Parse a wire type tag.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "serial-request" => Some(Self::SerialRequest),
            "serial" => Some(Self::Serial),
            "model" => Some(Self::Model),
            _ => None,
        }
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
