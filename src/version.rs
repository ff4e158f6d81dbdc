use crate::error::Error;
use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// OpenCL execution environment the translated source targets. Chosen at
/// construction and passed through to the external validator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, Serialize, Deserialize,
)]
#[repr(u8)]
pub enum TargetEnv {
    #[default]
    #[serde(rename = "opencl-1.2")]
    OpenCL1_2,
    #[serde(rename = "opencl-2.0")]
    OpenCL2_0,
    #[serde(rename = "opencl-2.1")]
    OpenCL2_1,
    #[serde(rename = "opencl-2.2")]
    OpenCL2_2,
}

impl TargetEnv {
    /// The canonical IL version string an embedding layer should report for
    /// this environment (`CL_DEVICE_IL_VERSION`).
    pub const fn il_version(self) -> &'static str {
        match self {
            TargetEnv::OpenCL1_2 | TargetEnv::OpenCL2_0 => "SPIR-V_1.0",
            TargetEnv::OpenCL2_1 | TargetEnv::OpenCL2_2 => "SPIR-V_1.2",
        }
    }
}

impl FromStr for TargetEnv {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        return match s {
            "1.2" | "opencl-1.2" => Ok(TargetEnv::OpenCL1_2),
            "2.0" | "opencl-2.0" => Ok(TargetEnv::OpenCL2_0),
            "2.1" | "opencl-2.1" => Ok(TargetEnv::OpenCL2_1),
            "2.2" | "opencl-2.2" => Ok(TargetEnv::OpenCL2_2),
            _ => Err(Error::msg(format!("unknown target environment '{s}'"))),
        };
    }
}

impl fmt::Display for TargetEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEnv::OpenCL1_2 => f.write_str("opencl-1.2"),
            TargetEnv::OpenCL2_0 => f.write_str("opencl-2.0"),
            TargetEnv::OpenCL2_1 => f.write_str("opencl-2.1"),
            TargetEnv::OpenCL2_2 => f.write_str("opencl-2.2"),
        }
    }
}

impl From<TargetEnv> for spirv_tools::TargetEnv {
    fn from(value: TargetEnv) -> Self {
        return match value {
            TargetEnv::OpenCL1_2 => spirv_tools::TargetEnv::OpenCL_1_2,
            TargetEnv::OpenCL2_0 => spirv_tools::TargetEnv::OpenCL_2_0,
            TargetEnv::OpenCL2_1 => spirv_tools::TargetEnv::OpenCL_2_1,
            TargetEnv::OpenCL2_2 => spirv_tools::TargetEnv::OpenCL_2_2,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(TargetEnv::from_str("1.2").unwrap(), TargetEnv::OpenCL1_2);
        assert_eq!(
            TargetEnv::from_str("opencl-2.1").unwrap(),
            TargetEnv::OpenCL2_1
        );
        assert!(TargetEnv::from_str("3.0").is_err());
    }

    #[test]
    fn il_version_is_canonical_per_env() {
        assert_eq!(TargetEnv::OpenCL1_2.il_version(), "SPIR-V_1.0");
        assert_eq!(TargetEnv::OpenCL2_0.il_version(), "SPIR-V_1.0");
        assert_eq!(TargetEnv::OpenCL2_1.il_version(), "SPIR-V_1.2");
        assert_eq!(TargetEnv::OpenCL2_2.il_version(), "SPIR-V_1.2");
    }

    #[test]
    fn default_is_opencl_1_2() {
        assert_eq!(TargetEnv::default(), TargetEnv::OpenCL1_2);
    }
}
