//! Export file naming convention.
//!
//! Every rendered visualization export is stored as a single file whose name
//! carries its identity, version and pixel size:
//!
//! ```text
//! <key>_v<version>_<width>x<height>.svg
//! co2-emissions_v12_850x600.svg
//! gdp-3f2a9c01b7de_v4_850x600.svg     # keyed with a query hash
//! ```
//!
//! The exports directory is therefore its own index: listing it is enough to
//! know which version of which visualization has been baked.

/// Extension of rendered exports.
pub const EXPORT_EXTENSION: &str = "svg";

/// Result of parsing an export file name like `co2-emissions_v12_850x600.svg`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedExportName {
    /// Visualization key (slug, optionally with a query hash suffix).
    pub key: String,
    pub version: u64,
    pub width: u32,
    pub height: u32,
}

/// Build the file name for an export.
pub fn export_file_name(key: &str, version: u64, width: u32, height: u32) -> String {
    format!("{key}_v{version}_{width}x{height}.{EXPORT_EXTENSION}")
}

/// Parse an export file name.
///
/// Parsing works from the right, so keys may themselves contain underscores:
/// - `"co2_v3_850x600.svg"` → key="co2", version=3, 850×600
/// - `"a_b_v1_10x20.svg"` → key="a_b", version=1, 10×20
/// - `"co2_v3_850x600.png"` → `None` (wrong extension)
/// - `"co2_3_850x600.svg"` → `None` (version without `v`)
pub fn parse_export_file_name(file_name: &str) -> Option<ParsedExportName> {
    let stem = file_name.strip_suffix(&format!(".{EXPORT_EXTENSION}"))?;

    let mut parts = stem.rsplitn(3, '_');
    let dims = parts.next()?;
    let version = parts.next()?;
    let key = parts.next()?;
    if key.is_empty() {
        return None;
    }

    let version = version.strip_prefix('v')?.parse::<u64>().ok()?;
    let (width, height) = dims.split_once('x')?;

    Some(ParsedExportName {
        key: key.to_string(),
        version,
        width: width.parse().ok()?,
        height: height.parse().ok()?,
    })
}
