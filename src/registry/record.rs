//! Installed-package records and their on-disk encoding.
//!
//! The store file holds one TOML table per tracked package, named after the
//! normalized source link:
//!
//! ```toml
//! ["https://github.com/acme/tool"]
//! systemPackageName = "tool"
//! installedTag = "v2.0"
//! installDate = "2026-01-31"
//! lastUpdateDate = "2026-02-14"
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledRecord {
    pub source_link: String,
    pub system_package_name: String,
    pub installed_tag: String,
    pub install_date: NaiveDate,
    pub last_update_date: NaiveDate,
}

/// Records keyed by source link.
pub type Records = BTreeMap<String, InstalledRecord>;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    system_package_name: String,
    installed_tag: String,
    install_date: String,
    last_update_date: String,
}

impl InstalledRecord {
    fn to_entry(&self) -> Entry {
        Entry {
            system_package_name: self.system_package_name.clone(),
            installed_tag: self.installed_tag.clone(),
            install_date: self.install_date.format(DATE_FORMAT).to_string(),
            last_update_date: self.last_update_date.format(DATE_FORMAT).to_string(),
        }
    }

    fn from_entry(source_link: String, entry: Entry) -> Result<Self> {
        let install_date = parse_date(&entry.install_date)
            .with_context(|| format!("Bad installDate for {}", source_link))?;
        let last_update_date = parse_date(&entry.last_update_date)
            .with_context(|| format!("Bad lastUpdateDate for {}", source_link))?;

        Ok(Self {
            source_link,
            system_package_name: entry.system_package_name,
            installed_tag: entry.installed_tag,
            install_date,
            last_update_date,
        })
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .with_context(|| format!("'{}' is not a YYYY-MM-DD date", s))
}

pub fn decode(content: &str) -> Result<Records> {
    let entries: BTreeMap<String, Entry> = toml::from_str(content)?;
    entries
        .into_iter()
        .map(|(link, entry)| {
            let record = InstalledRecord::from_entry(link.clone(), entry)?;
            Ok((link, record))
        })
        .collect()
}

pub fn encode(records: &Records) -> Result<String> {
    let entries: BTreeMap<&str, Entry> = records
        .iter()
        .map(|(link, record)| (link.as_str(), record.to_entry()))
        .collect();
    Ok(toml::to_string(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(link: &str, tag: &str) -> InstalledRecord {
        InstalledRecord {
            source_link: link.to_string(),
            system_package_name: "tool".to_string(),
            installed_tag: tag.to_string(),
            install_date: date(2026, 1, 31),
            last_update_date: date(2026, 2, 14),
        }
    }

    #[test]
    fn test_decode_existing_file() {
        let content = r#"
["https://github.com/acme/tool"]
systemPackageName = "acme-tool"
installedTag = "v2.0"
installDate = "2026-01-31"
lastUpdateDate = "2026-02-14"
"#;
        let records = decode(content).unwrap();
        let rec = &records["https://github.com/acme/tool"];
        assert_eq!(rec.source_link, "https://github.com/acme/tool");
        assert_eq!(rec.system_package_name, "acme-tool");
        assert_eq!(rec.installed_tag, "v2.0");
        assert_eq!(rec.install_date, date(2026, 1, 31));
        assert_eq!(rec.last_update_date, date(2026, 2, 14));
    }

    #[test]
    fn test_encode_uses_camel_case_and_iso_dates() {
        let mut records = Records::new();
        records.insert(
            "https://github.com/acme/tool".into(),
            record("https://github.com/acme/tool", "v1"),
        );

        let out = encode(&records).unwrap();
        assert!(out.contains(r#"["https://github.com/acme/tool"]"#));
        assert!(out.contains(r#"systemPackageName = "tool""#));
        assert!(out.contains(r#"installedTag = "v1""#));
        assert!(out.contains(r#"installDate = "2026-01-31""#));
        assert!(out.contains(r#"lastUpdateDate = "2026-02-14""#));
    }

    #[test]
    fn test_encode_orders_tables_by_link() {
        let mut records = Records::new();
        for link in ["https://github.com/zed/z", "https://github.com/acme/a"] {
            records.insert(link.into(), record(link, "v1"));
        }

        let out = encode(&records).unwrap();
        let a = out.find("acme/a").unwrap();
        let z = out.find("zed/z").unwrap();
        assert!(a < z);
        assert_eq!(decode(&out).unwrap(), records);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_bad_date() {
        let content = r#"
["https://github.com/acme/tool"]
systemPackageName = "tool"
installedTag = "v1"
installDate = "31/01/2026"
lastUpdateDate = "2026-02-14"
"#;
        let err = decode(content).unwrap_err();
        assert!(format!("{:#}", err).contains("installDate"));
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let content = r#"
["https://github.com/acme/tool"]
systemPackageName = "tool"
"#;
        assert!(decode(content).is_err());
    }
}
