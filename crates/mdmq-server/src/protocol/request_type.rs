//! Request type tags.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The operation a command asks a device to perform.
///
/// Only the first three variants carry reconciled responses; every other
/// type is acknowledged purely to drain the queue. Tags this build does not
/// know are kept verbatim in [`RequestType::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    DeviceInformation,
    InstalledApplicationList,
    CertificateList,
    DeviceConfigured,
    ProfileList,
    InstallProfile,
    RemoveProfile,
    InstallApplication,
    RestartDevice,
    DeviceLock,
    EraseDevice,
    Other(String),
}

impl RequestType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::DeviceInformation => "DeviceInformation",
            Self::InstalledApplicationList => "InstalledApplicationList",
            Self::CertificateList => "CertificateList",
            Self::DeviceConfigured => "DeviceConfigured",
            Self::ProfileList => "ProfileList",
            Self::InstallProfile => "InstallProfile",
            Self::RemoveProfile => "RemoveProfile",
            Self::InstallApplication => "InstallApplication",
            Self::RestartDevice => "RestartDevice",
            Self::DeviceLock => "DeviceLock",
            Self::EraseDevice => "EraseDevice",
            Self::Other(tag) => tag,
        }
    }
}

impl From<&str> for RequestType {
    fn from(tag: &str) -> Self {
        match tag {
            "DeviceInformation" => Self::DeviceInformation,
            "InstalledApplicationList" => Self::InstalledApplicationList,
            "CertificateList" => Self::CertificateList,
            "DeviceConfigured" => Self::DeviceConfigured,
            "ProfileList" => Self::ProfileList,
            "InstallProfile" => Self::InstallProfile,
            "RemoveProfile" => Self::RemoveProfile,
            "InstallApplication" => Self::InstallApplication,
            "RestartDevice" => Self::RestartDevice,
            "DeviceLock" => Self::DeviceLock,
            "EraseDevice" => Self::EraseDevice,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RequestType {
    fn from(tag: String) -> Self {
        Self::from(tag.as_str())
    }
}

impl From<RequestType> for String {
    fn from(request_type: RequestType) -> Self {
        match request_type {
            RequestType::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for RequestType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
