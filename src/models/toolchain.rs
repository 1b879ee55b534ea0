//! Toolchain architecture inference
//!
//! Cross-toolchain packages follow a naming convention that encodes the
//! architecture family of the sysroots they build for. The family decides
//! how the sandbox is initialized: whether CPU emulation is needed, which
//! cross compiler to register, and whether host tools stay visible.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};

/// Architecture family of a cross-toolchain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolchainArch {
    /// ARM family (armv6/armv7/aarch32 sysroots)
    Arm,
    /// MIPS family
    Mips,
    /// x86 family (i486 and friends, runs natively)
    X86,
}

impl ToolchainArch {
    /// Infer the family from a toolchain package name.
    ///
    /// A name matching none of the known families is an error; silently
    /// initializing a sandbox with unset parameters would produce a target
    /// that looks installed but cannot compile anything.
    pub fn from_toolchain_name(name: &str) -> Result<Self> {
        let lower = name.to_lowercase();
        if lower.contains("arm") {
            Ok(Self::Arm)
        } else if lower.contains("mips") {
            Ok(Self::Mips)
        } else if lower.contains("i486") || lower.contains("x86") {
            Ok(Self::X86)
        } else {
            Err(SdkError::Toolchain(format!(
                "cannot infer architecture from toolchain name {:?}",
                name
            )))
        }
    }

    /// CPU emulator binary for transparent execution of target binaries,
    /// if the family needs one
    pub fn emulator(&self) -> Option<&'static str> {
        match self {
            Self::Arm => Some("qemu-arm-dynamic"),
            Self::Mips => Some("qemu-mipsel-dynamic"),
            Self::X86 => None,
        }
    }

    /// Cross-compiler path registered with the sandbox
    pub fn compiler(&self) -> &'static str {
        match self {
            Self::Arm => "/opt/cross/bin/armv7hl-sdk-linux-gnueabi-gcc",
            Self::Mips => "/opt/cross/bin/mipsel-sdk-linux-gnu-gcc",
            Self::X86 => "/opt/cross/bin/i486-sdk-linux-gnu-gcc",
        }
    }

    /// Host tools directory mapped into the sandbox
    pub fn toolsdir(&self) -> &'static str {
        match self {
            Self::Arm | Self::Mips => "/opt/cross",
            Self::X86 => "/",
        }
    }

    /// Short family label
    pub fn name(&self) -> &'static str {
        match self {
            Self::Arm => "arm",
            Self::Mips => "mips",
            Self::X86 => "x86",
        }
    }
}

impl FromStr for ToolchainArch {
    type Err = SdkError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_toolchain_name(s)
    }
}

impl fmt::Display for ToolchainArch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
