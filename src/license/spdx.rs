use crate::license::database::LicenseDatabase;
use crate::license::expression::{self, Expression, LicenseRef};

/// Informal license names seen in the wild, keyed by their lowercased,
/// whitespace-collapsed spelling.
const ALIASES: &[(&str, &str)] = &[
    ("apache 2", "Apache-2.0"),
    ("apache 2.0", "Apache-2.0"),
    ("apache2", "Apache-2.0"),
    ("apache license 2.0", "Apache-2.0"),
    ("apache license, version 2.0", "Apache-2.0"),
    ("apache license version 2.0", "Apache-2.0"),
    ("apache software license", "Apache-2.0"),
    ("mit license", "MIT"),
    ("the mit license", "MIT"),
    ("mit/x11", "MIT"),
    ("expat", "MIT"),
    ("bsd", "BSD-3-Clause"),
    ("bsd license", "BSD-3-Clause"),
    ("new bsd", "BSD-3-Clause"),
    ("modified bsd", "BSD-3-Clause"),
    ("bsd 3-clause", "BSD-3-Clause"),
    ("bsd-3", "BSD-3-Clause"),
    ("simplified bsd", "BSD-2-Clause"),
    ("freebsd", "BSD-2-Clause"),
    ("bsd 2-clause", "BSD-2-Clause"),
    ("bsd-2", "BSD-2-Clause"),
    ("gpl", "GPL-3.0"),
    ("gpl v2", "GPL-2.0"),
    ("gplv2", "GPL-2.0"),
    ("gpl2", "GPL-2.0"),
    ("gnu gpl v2", "GPL-2.0"),
    ("gnu general public license v2", "GPL-2.0"),
    ("gpl v3", "GPL-3.0"),
    ("gplv3", "GPL-3.0"),
    ("gpl3", "GPL-3.0"),
    ("gnu gpl v3", "GPL-3.0"),
    ("gnu general public license v3", "GPL-3.0"),
    ("lgpl", "LGPL-3.0"),
    ("lgpl v2.1", "LGPL-2.1"),
    ("lgplv2.1", "LGPL-2.1"),
    ("gnu lgpl v2.1", "LGPL-2.1"),
    ("lgpl v3", "LGPL-3.0"),
    ("lgplv3", "LGPL-3.0"),
    ("gnu lgpl v3", "LGPL-3.0"),
    ("agpl", "AGPL-3.0"),
    ("agpl v3", "AGPL-3.0"),
    ("agplv3", "AGPL-3.0"),
    ("gnu agpl v3", "AGPL-3.0"),
    ("mpl 2.0", "MPL-2.0"),
    ("mplv2", "MPL-2.0"),
    ("mpl2", "MPL-2.0"),
    ("mozilla public license 2.0", "MPL-2.0"),
    ("isc license", "ISC"),
    ("cc0", "CC0-1.0"),
    ("public domain", "CC0-1.0"),
    ("the unlicense", "Unlicense"),
    ("boost", "BSL-1.0"),
    ("artistic 2.0", "Artistic-2.0"),
];

/// Identifiers the parser accepts without consulting the database.
fn is_user_defined(id: &str) -> bool {
    id.starts_with("LicenseRef-") || id.starts_with("DocumentRef-")
}

fn is_known(id: &str, db: &LicenseDatabase) -> bool {
    db.contains(id) || is_user_defined(id)
}

/// Correct every leaf of a well-formed expression. Leaves that cannot be
/// corrected are kept as written.
fn correct_leaves(expr: Expression, db: &LicenseDatabase) -> Expression {
    match expr {
        Expression::Leaf(license) => {
            let id = correct_identifier(&license.id, db).unwrap_or(license.id);
            Expression::Leaf(LicenseRef { id, ..license })
        }
        Expression::Binary { op, left, right } => Expression::Binary {
            op,
            left: Box::new(correct_leaves(*left, db)),
            right: Box::new(correct_leaves(*right, db)),
        },
    }
}

fn is_operator(word: &str) -> bool {
    matches!(
        word.to_ascii_uppercase().as_str(),
        "AND" | "OR" | "WITH" | "(" | ")"
    )
}

/// Correct a single informal license name to a canonical identifier.
pub fn correct_identifier(raw: &str, db: &LicenseDatabase) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if is_known(trimmed, db) {
        return Some(trimmed.to_string());
    }
    if let Some(base) = trimmed.strip_suffix('+') {
        if !base.ends_with('+') {
            return correct_identifier(base, db).map(|id| format!("{}+", id));
        }
    }
    if let Some(id) = db.canonical_id(trimmed) {
        return Some(id.to_string());
    }

    let key = trimmed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    if let Some((_, id)) = ALIASES.iter().find(|(alias, _)| *alias == key) {
        return Some(id.to_string());
    }

    // "Apache 2.0" → "apache-2.0", "GPL-3" → "gpl-3.0"
    let dashed = key.replace(' ', "-");
    db.canonical_id(&dashed)
        .or_else(|| db.canonical_id(&format!("{}.0", dashed)))
        .map(str::to_string)
}

/// Turn an informal license string into a well-formed SPDX expression over
/// known identifiers. Returns `None` when the input cannot be corrected.
pub fn correct(raw: &str, db: &LicenseDatabase) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(tree) = expression::parse(trimmed) {
        return Some(correct_leaves(tree, db).to_string());
    }

    if let Some(id) = correct_identifier(trimmed, db) {
        return Some(id);
    }

    // Token-wise: normalize operators, correct each run of words between them.
    // A slash is treated as an OR shorthand ("MIT/Apache-2.0").
    let spaced = trimmed
        .replace('/', " OR ")
        .replace('(', " ( ")
        .replace(')', " ) ");
    let words: Vec<&str> = spaced.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(words.len());
    let mut i = 0;
    while i < words.len() {
        if is_operator(words[i]) {
            out.push(words[i].to_ascii_uppercase());
            i += 1;
            continue;
        }
        let start = i;
        while i < words.len() && !is_operator(words[i]) {
            i += 1;
        }
        let phrase = words[start..i].join(" ");
        if out.last().map(String::as_str) == Some("WITH") {
            // Exception identifiers are not in the license list; keep them.
            if i - start != 1 {
                return None;
            }
            out.push(phrase);
        } else {
            out.push(correct_identifier(&phrase, db)?);
        }
    }

    let corrected = out.join(" ").replace("( ", "(").replace(" )", ")");
    Some(corrected)
}
