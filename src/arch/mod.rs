//! Architecture alias table.
//!
//! Maps canonical CPU architecture ids to the spellings vendors put in release
//! filenames. The table is an immutable value built once and handed to the
//! candidate filter; nothing mutates it after startup.

use std::collections::BTreeMap;

/// Canonical architecture id of the running host.
pub fn host_arch() -> &'static str {
    #[cfg(target_arch = "x86_64")]
    {
        "amd64"
    }
    #[cfg(target_arch = "aarch64")]
    {
        "arm64"
    }
    #[cfg(target_arch = "x86")]
    {
        "386"
    }
    #[cfg(target_arch = "arm")]
    {
        "arm"
    }
    #[cfg(all(target_arch = "powerpc64", target_endian = "little"))]
    {
        "ppc64le"
    }
    #[cfg(target_arch = "riscv64")]
    {
        "riscv64"
    }
    #[cfg(target_arch = "s390x")]
    {
        "s390x"
    }
    #[cfg(not(any(
        target_arch = "x86_64",
        target_arch = "aarch64",
        target_arch = "x86",
        target_arch = "arm",
        all(target_arch = "powerpc64", target_endian = "little"),
        target_arch = "riscv64",
        target_arch = "s390x"
    )))]
    {
        std::env::consts::ARCH
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArchAliases {
    table: BTreeMap<String, Vec<String>>,
}

impl ArchAliases {
    /// Build a table from explicit `(canonical, aliases)` pairs.
    pub fn from_pairs<I, A, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, A)>,
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = pairs
            .into_iter()
            .map(|(arch, aliases)| {
                let aliases = aliases
                    .into_iter()
                    .map(|a| a.into().to_lowercase())
                    .collect();
                (arch.into(), aliases)
            })
            .collect();
        Self { table }
    }

    /// Aliases for one canonical architecture. Unknown ids have none.
    pub fn aliases_for(&self, arch: &str) -> &[String] {
        self.table.get(arch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Union of every alias across all architectures.
    pub fn all_aliases(&self) -> impl Iterator<Item = &str> {
        self.table.values().flatten().map(String::as_str)
    }

    /// Canonical architecture ids in the table.
    pub fn arches(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

impl Default for ArchAliases {
    fn default() -> Self {
        // armhf and armel are distinct ABIs but both map to 32-bit arm here.
        Self::from_pairs([
            ("386", vec!["i386", "i686", "ia32", "x86"]),
            ("amd64", vec!["amd64", "x86_64", "x86-64", "x64"]),
            ("arm", vec!["armhf", "armel", "armv7"]),
            ("arm64", vec!["arm64", "aarch64", "armv8"]),
            ("ppc64le", vec!["ppc64le", "ppc64el"]),
            ("riscv64", vec!["riscv64", "rv64", "risc-v64"]),
            ("s390x", vec!["s390x"]),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amd64_aliases() {
        let table = ArchAliases::default();
        let aliases = table.aliases_for("amd64");
        for expected in ["amd64", "x86_64", "x86-64", "x64"] {
            assert!(aliases.iter().any(|a| a == expected), "missing {}", expected);
        }
    }

    #[test]
    fn test_unknown_arch_has_no_aliases() {
        let table = ArchAliases::default();
        assert!(table.aliases_for("mips").is_empty());
        assert!(!table.arches().any(|a| a == "mips"));
    }

    #[test]
    fn test_all_aliases_is_union() {
        let table = ArchAliases::from_pairs([("a", vec!["a1", "a2"]), ("b", vec!["b1"])]);
        let mut all: Vec<_> = table.all_aliases().collect();
        all.sort();
        assert_eq!(all, vec!["a1", "a2", "b1"]);
    }

    #[test]
    fn test_host_arch_is_in_default_table_on_common_targets() {
        let table = ArchAliases::default();
        #[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
        assert!(table.arches().any(|a| a == host_arch()));
        assert!(!host_arch().is_empty());
        let _ = table;
    }

    #[test]
    fn test_big_endian_ppc64_is_not_reported_as_ppc64le() {
        if cfg!(all(target_arch = "powerpc64", target_endian = "big")) {
            assert_ne!(host_arch(), "ppc64le");
        }
        if cfg!(all(target_arch = "powerpc64", target_endian = "little")) {
            assert_eq!(host_arch(), "ppc64le");
        }
    }
}
