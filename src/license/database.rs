use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// SPDX `licenses.json` (license-list-data format) shipped with the crate.
const BUNDLED_LICENSE_LIST: &str = include_str!("../../data/licenses.json");

/// Canonical text URLs for well-known licenses. These replace the generic
/// `spdx.org` reference of the matching database entries.
const CANONICAL_URLS: &[(&str, &str)] = &[
    ("Apache-2.0", "http://www.apache.org/licenses/LICENSE-2.0"),
    ("Artistic-2.0", "http://www.perlfoundation.org/artistic_license_2_0"),
    ("BSL-1.0", "http://www.boost.org/LICENSE_1_0.txt"),
    ("BSD-3-Clause", "http://opensource.org/licenses/BSD-3-Clause"),
    ("CPAL-1.0", "http://opensource.org/licenses/cpal_1.0"),
    ("CC0-1.0", "http://creativecommons.org/publicdomain/zero/1.0/legalcode"),
    ("EPL-1.0", "http://www.eclipse.org/legal/epl-v10.html"),
    ("MIT", "http://www.jclark.com/xml/copying.txt"),
    ("BSD-2-Clause-FreeBSD", "http://www.freebsd.org/copyright/freebsd-license.html"),
    ("GPL-2.0-only", "http://www.gnu.org/licenses/gpl-2.0.html"),
    ("GPL-2.0-or-later", "http://www.gnu.org/licenses/gpl-2.0.html"),
    ("GPL-2.0+", "http://www.gnu.org/licenses/gpl-2.0.html"),
    ("GPL-2.0", "http://www.gnu.org/licenses/gpl-2.0.html"),
    ("GPL-3.0-only", "http://www.gnu.org/licenses/gpl-3.0.html"),
    ("GPL-3.0-or-later", "http://www.gnu.org/licenses/gpl-3.0.html"),
    ("GPL-3.0+", "http://www.gnu.org/licenses/gpl-3.0.html"),
    ("GPL-3.0", "http://www.gnu.org/licenses/gpl-3.0.html"),
    ("LGPL-2.1-only", "http://www.gnu.org/licenses/lgpl-2.1.html"),
    ("LGPL-2.1-or-later", "http://www.gnu.org/licenses/lgpl-2.1.html"),
    ("LGPL-2.1+", "http://www.gnu.org/licenses/lgpl-2.1.html"),
    ("LGPL-2.1", "http://www.gnu.org/licenses/lgpl-2.1.html"),
    ("LGPL-3.0-only", "http://www.gnu.org/licenses/lgpl-3.0.html"),
    ("LGPL-3.0-or-later", "http://www.gnu.org/licenses/lgpl-3.0.html"),
    ("LGPL-3.0+", "http://www.gnu.org/licenses/lgpl-3.0.html"),
    ("LGPL-3.0", "http://www.gnu.org/licenses/lgpl-3.0.html"),
    ("AGPL-3.0-only", "http://www.gnu.org/licenses/agpl-3.0.html"),
    ("AGPL-3.0-or-later", "http://www.gnu.org/licenses/agpl-3.0.html"),
    ("AGPL-3.0+", "http://www.gnu.org/licenses/agpl-3.0.html"),
    ("AGPL-3.0", "http://www.gnu.org/licenses/agpl-3.0.html"),
    ("ISC", "https://www.isc.org/downloads/software-support-policy/isc-license/"),
    ("MPL-2.0", "http://www.mozilla.org/MPL/2.0"),
    ("UPL-1.0", "https://oss.oracle.com/licenses/upl/"),
    ("WTFPL", "http://www.wtfpl.net/txt/copying/"),
    ("Unlicense", "http://unlicense.org/UNLICENSE"),
    ("X11", "http://www.xfree86.org/3.3.6/COPYRIGHT2.html#3"),
    ("XFree86-1.1", "http://www.xfree86.org/current/LICENSE4.html"),
];

#[derive(Debug, Deserialize)]
struct LicenseList {
    #[serde(default)]
    licenses: Vec<LicenseListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicenseListEntry {
    license_id: String,
    #[serde(default)]
    reference: String,
    /// Absent in the SPDX data for licenses the FSF has not classified.
    #[serde(default)]
    is_fsf_libre: bool,
}

/// What the database knows about one license identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct LicenseInfo {
    pub reference: String,
    /// Free according to the FSF.
    pub is_free: bool,
}

/// Read-only table of canonical SPDX identifiers, loaded once per engine.
#[derive(Debug, Clone)]
pub struct LicenseDatabase {
    licenses: HashMap<String, LicenseInfo>,
    /// Lowercased identifier → canonical identifier.
    folded: HashMap<String, String>,
}

impl LicenseDatabase {
    /// The license list embedded in the binary.
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_LICENSE_LIST, "bundled license list")
    }

    /// Load an SPDX `licenses.json` from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::fs("failed to read", path, e))?;
        Self::from_json(&content, &path.display().to_string())
    }

    fn from_json(content: &str, origin: &str) -> Result<Self> {
        let list: LicenseList = serde_json::from_str(content)
            .map_err(|e| Error::Config(format!("invalid license database {}: {}", origin, e)))?;

        let mut licenses = HashMap::with_capacity(list.licenses.len());
        let mut folded = HashMap::with_capacity(list.licenses.len());
        for entry in list.licenses {
            let reference = CANONICAL_URLS
                .iter()
                .find(|(id, _)| *id == entry.license_id)
                .map(|(_, url)| url.to_string())
                .unwrap_or(entry.reference);
            folded.insert(entry.license_id.to_lowercase(), entry.license_id.clone());
            licenses.insert(
                entry.license_id,
                LicenseInfo {
                    reference,
                    is_free: entry.is_fsf_libre,
                },
            );
        }

        Ok(Self { licenses, folded })
    }

    pub fn get(&self, id: &str) -> Option<&LicenseInfo> {
        self.licenses.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.licenses.contains_key(id)
    }

    /// Case-insensitive lookup returning the canonical spelling.
    pub fn canonical_id(&self, candidate: &str) -> Option<&str> {
        self.folded
            .get(&candidate.to_lowercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }
}
