//! Platform identification for release asset selection.
//!
//! Release assets usually carry the target platform in their file name
//! (`desktop-1.2.0-macos-arm64.zip`, `desktop_linux_x86_64.tar.gz`). These
//! helpers list the spellings that identify the platform this binary was
//! compiled for.

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Checks if the current platform is macOS.
#[must_use]
pub const fn is_macos() -> bool {
    cfg!(target_os = "macos")
}

/// Spellings of the current operating system found in asset names.
#[must_use]
pub fn os_aliases() -> &'static [&'static str] {
    os_aliases_for(std::env::consts::OS)
}

/// Spellings of the current CPU architecture found in asset names.
#[must_use]
pub fn arch_aliases() -> &'static [&'static str] {
    arch_aliases_for(std::env::consts::ARCH)
}

/// Every architecture spelling this crate knows about, for any target.
///
/// Used to tell "names no architecture" apart from "names another one".
#[must_use]
pub fn known_arch_aliases() -> &'static [&'static str] {
    &[
        "aarch64", "arm64", "x86_64", "x86-64", "x64", "amd64", "i686", "x86", "i386", "armv7",
        "universal",
    ]
}

pub(crate) fn os_aliases_for(os: &str) -> &'static [&'static str] {
    match os {
        "macos" => &["macos", "darwin", "mac", "osx"],
        "linux" => &["linux"],
        "windows" => &["windows", "win", "win64", "win32"],
        "freebsd" => &["freebsd"],
        _ => &[],
    }
}

pub(crate) fn arch_aliases_for(arch: &str) -> &'static [&'static str] {
    match arch {
        "aarch64" => &["aarch64", "arm64", "universal"],
        "x86_64" => &["x86_64", "x86-64", "x64", "amd64", "universal"],
        "x86" => &["x86", "i686", "i386"],
        "arm" => &["armv7"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_current_platform_is_known() {
        #[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
        assert!(!os_aliases().is_empty());

        #[cfg(any(target_arch = "aarch64", target_arch = "x86_64"))]
        assert!(arch_aliases().contains(&"universal"));
    }

    #[test]
    fn test_alias_tables() {
        assert!(os_aliases_for("macos").contains(&"darwin"));
        assert!(arch_aliases_for("x86_64").contains(&"amd64"));
        assert!(os_aliases_for("plan9").is_empty());
        for alias in arch_aliases_for("aarch64") {
            assert!(known_arch_aliases().contains(alias));
        }
    }

    #[test]
    fn test_platform_flags() {
        assert_eq!(is_windows(), cfg!(windows));
        assert_eq!(is_macos(), cfg!(target_os = "macos"));
    }
}
