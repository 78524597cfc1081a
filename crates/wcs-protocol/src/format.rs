//! Response formats the backend can encode a coverage subset into.

use serde::{Deserialize, Serialize};
use std::fmt;

use wcs_common::{WcsError, WcsResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    NetCdf,
    GeoTiff,
    Jpeg2000,
    Dap2,
}

impl ResponseFormat {
    pub const ALL: [ResponseFormat; 4] = [
        ResponseFormat::NetCdf,
        ResponseFormat::GeoTiff,
        ResponseFormat::Jpeg2000,
        ResponseFormat::Dap2,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ResponseFormat::NetCdf => "netcdf",
            ResponseFormat::GeoTiff => "geotiff",
            ResponseFormat::Jpeg2000 => "jpeg2000",
            ResponseFormat::Dap2 => "dap2",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseFormat::NetCdf => "application/x-netcdf",
            ResponseFormat::GeoTiff => "image/tiff",
            ResponseFormat::Jpeg2000 => "image/jp2",
            ResponseFormat::Dap2 => "application/octet-stream",
        }
    }

    /// Backend response suffix appended to the dataset URL.
    pub fn dap_suffix(&self) -> &'static str {
        match self {
            ResponseFormat::NetCdf => "nc",
            ResponseFormat::GeoTiff => "tiff",
            ResponseFormat::Jpeg2000 => "gmljp2",
            ResponseFormat::Dap2 => "dods",
        }
    }

    /// Extension for downloaded files.
    pub fn file_extension(&self) -> &'static str {
        match self {
            ResponseFormat::NetCdf => "nc",
            ResponseFormat::GeoTiff => "tif",
            ResponseFormat::Jpeg2000 => "jp2",
            ResponseFormat::Dap2 => "dods",
        }
    }

    /// Look up a format by name or MIME type, ignoring case.
    pub fn lookup(s: &str) -> WcsResult<Self> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name().eq_ignore_ascii_case(s) || f.mime_type().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                WcsError::invalid(
                    "format",
                    format!(
                        "Unsupported format '{}'. Supported formats are: {}",
                        s,
                        Self::ALL.iter().map(|f| f.mime_type()).collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }

    /// `Content-Disposition` for a download of this coverage.
    pub fn content_disposition(&self, coverage_id: &str) -> String {
        let base: String = coverage_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "-_.".contains(c) { c } else { '_' })
            .collect();
        format!("attachment; filename=\"{}.{}\"", base, self.file_extension())
    }
}

impl fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `<dataset_url>.<suffix>?<ce>`; the `?` is omitted for an empty expression.
pub fn data_access_url(dataset_url: &str, format: ResponseFormat, constraint: &str) -> String {
    if constraint.is_empty() {
        format!("{}.{}", dataset_url, format.dap_suffix())
    } else {
        format!("{}.{}?{}", dataset_url, format.dap_suffix(), constraint)
    }
}
