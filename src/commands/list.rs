use log::debug;

use crate::{
    error::Result,
    registry::{InstalledRecord, PackageRegistry},
    runtime::Runtime,
};

use super::config::Config;

/// List all tracked packages
#[tracing::instrument(skip(runtime, config))]
pub fn list<R: Runtime>(runtime: &R, config: &Config) -> Result<()> {
    let registry = PackageRegistry::new(runtime, &config.config_dir);
    debug!("Listing packages from {:?}", registry.path());

    let records = registry.get_all()?;
    print!("{}", format_records(&records));
    Ok(())
}

/// One aligned row per record under a header line.
pub fn format_records(records: &[InstalledRecord]) -> String {
    if records.is_empty() {
        return "No packages installed.\n".to_string();
    }

    let header = ["SOURCE", "PACKAGE", "TAG", "INSTALLED", "UPDATED"];
    let rows: Vec<[String; 5]> = records
        .iter()
        .map(|r| {
            [
                r.source_link.clone(),
                r.system_package_name.clone(),
                r.installed_tag.clone(),
                r.install_date.to_string(),
                r.last_update_date.to_string(),
            ]
        })
        .collect();

    let mut widths = header.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let mut out = String::new();
    let header = header.map(str::to_string);
    for row in std::iter::once(&header).chain(&rows) {
        let line = row
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ");
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
