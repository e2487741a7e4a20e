use std::fmt;

/// CPU architectures bakery can name in package metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
  X86_64,
  Aarch64,
  X86,
  Arm,
}

impl Arch {
  /// Detect the host CPU architecture
  pub fn current() -> Option<Self> {
    match std::env::consts::ARCH {
      "x86_64" => Some(Self::X86_64),
      "aarch64" => Some(Self::Aarch64),
      "x86" => Some(Self::X86),
      "arm" => Some(Self::Arm),
      _ => None,
    }
  }

  /// Rust-style architecture identifier
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::X86_64 => "x86_64",
      Self::Aarch64 => "aarch64",
      Self::X86 => "x86",
      Self::Arm => "arm",
    }
  }

  /// Architecture name as used in the `Architecture:` control field
  pub fn package_name(&self) -> &'static str {
    match self {
      Self::X86_64 => "amd64",
      Self::Aarch64 => "arm64",
      Self::X86 => "i386",
      Self::Arm => "armhf",
    }
  }
}

impl fmt::Display for Arch {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn package_names_follow_debian_conventions() {
    assert_eq!(Arch::X86_64.package_name(), "amd64");
    assert_eq!(Arch::Aarch64.package_name(), "arm64");
    assert_eq!(Arch::X86.package_name(), "i386");
  }
}
