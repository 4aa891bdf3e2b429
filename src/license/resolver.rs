use tracing::{info, warn};

use crate::license::database::LicenseDatabase;
use crate::license::expression::{self, Expression};
use crate::license::spdx;
use crate::models::LicenseLabel;

/// Turns raw license strings into manifest labels.
///
/// Never fails: malformed expressions degrade to a single pseudo-license
/// carrying the raw text, unknown identifiers to a label with an empty URL.
/// Both cases are logged.
#[derive(Debug, Clone)]
pub struct LicenseResolver {
    db: LicenseDatabase,
}

impl LicenseResolver {
    pub fn new(db: LicenseDatabase) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &LicenseDatabase {
        &self.db
    }

    /// Correct and parse `raw`. `context` names the package or override the
    /// expression came from and only appears in log lines.
    pub fn parse_expression(&self, raw: &str, context: &str) -> Expression {
        let parsed = spdx::correct(raw, &self.db)
            .ok_or(expression::ParseError::Empty)
            .and_then(|corrected| expression::parse(&corrected));

        match parsed {
            Ok(tree) => {
                if tree.contains_and() {
                    warn!(
                        "the license expression '{}' associated to {} contains an AND operator; \
                         all of its licenses are listed without combination semantics",
                        raw, context
                    );
                }
                tree
            }
            Err(e) => {
                warn!(
                    "unable to parse the license expression '{}' associated to {} ({})",
                    raw, context, e
                );
                warn!("license information for {} may be incomplete in the generated manifest", context);
                Expression::leaf(raw)
            }
        }
    }

    /// Every license referenced by `expr`, in order. AND and OR are both read
    /// as "all of these apply".
    pub fn labels(&self, expr: &Expression) -> Vec<LicenseLabel> {
        expr.license_ids()
            .into_iter()
            .map(|id| self.label(id))
            .collect()
    }

    pub fn label(&self, id: &str) -> LicenseLabel {
        match self.db.get(id) {
            Some(info) => {
                if !info.is_free {
                    info!("license '{}' is not a free license according to the FSF", id);
                }
                LicenseLabel {
                    name: id.to_string(),
                    url: info.reference.clone(),
                }
            }
            None => {
                warn!("unable to associate the license identifier '{}' to a known license", id);
                warn!("license '{}' will be listed without a reference URL", id);
                LicenseLabel {
                    name: id.to_string(),
                    url: String::new(),
                }
            }
        }
    }

    /// `parse_expression` followed by `labels`.
    pub fn resolve(&self, raw: &str, context: &str) -> Vec<LicenseLabel> {
        let tree = self.parse_expression(raw, context);
        self.labels(&tree)
    }
}
