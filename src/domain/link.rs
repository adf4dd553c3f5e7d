use std::{fmt, str::FromStr};

/// A typed, directional satisfaction link between two nodes.
///
/// Link types are written either as a bare kind (`verifies`, `refines`,
/// `implements`, `extern`, ...) or with a partial quota suffix in the form
/// `partly_<kind>(<a>/<b>)`, granting `a/b` of a full credit. The string
/// form is parsed exactly once at build time; propagation works on the
/// parsed variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkType {
    /// A link granting full credit towards `<kind>_link_status`.
    Full(String),
    /// A graded link granting `numerator / denominator` of a full credit.
    Partial {
        /// The link kind the credit counts towards.
        kind: String,
        /// Credit numerator.
        numerator: u32,
        /// Credit denominator (never zero).
        denominator: u32,
    },
}

impl LinkType {
    /// The link kind, without any quota annotation.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Full(kind) | Self::Partial { kind, .. } => kind,
        }
    }

    /// The credit this link contributes to its status key.
    #[must_use]
    pub fn credit(&self) -> f64 {
        match self {
            Self::Full(_) => 1.0,
            Self::Partial {
                numerator,
                denominator,
                ..
            } => f64::from(*numerator) / f64::from(*denominator),
        }
    }

    /// The status map key this link contributes to.
    #[must_use]
    pub fn status_key(&self) -> String {
        format!("{}_link_status", self.kind())
    }

    /// Whether this link crosses the project boundary.
    ///
    /// Targets of extern links are never prefixed; the written identifier
    /// is used verbatim.
    #[must_use]
    pub fn is_extern(&self) -> bool {
        self.kind().contains("extern")
    }

    /// Returns a copy of this link with its credit zeroed.
    ///
    /// Used when attaching failed test outcomes: the structural link is
    /// preserved but contributes no fulfilment.
    #[must_use]
    pub fn zeroed(&self) -> Self {
        Self::Partial {
            kind: self.kind().to_owned(),
            numerator: 0,
            denominator: 1,
        }
    }
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(kind) => write!(f, "{kind}"),
            Self::Partial {
                kind,
                numerator,
                denominator,
            } => write!(f, "partly_{kind}({numerator}/{denominator})"),
        }
    }
}

impl FromStr for LinkType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseError::EmptyType(s.to_owned()));
        }

        let Some(rest) = s.strip_prefix("partly_") else {
            return Ok(Self::Full(s.to_owned()));
        };

        // A `partly_` prefix commits the writer to the quota form.
        let (kind, quota) = rest
            .split_once('(')
            .ok_or_else(|| ParseError::Quota(s.to_owned()))?;
        if kind.is_empty() {
            return Err(ParseError::EmptyType(s.to_owned()));
        }
        let quota = quota
            .strip_suffix(')')
            .ok_or_else(|| ParseError::Quota(s.to_owned()))?;
        let (numerator, denominator) = quota
            .split_once('/')
            .ok_or_else(|| ParseError::Quota(s.to_owned()))?;

        let numerator: u32 = numerator
            .trim()
            .parse()
            .map_err(|_| ParseError::Quota(s.to_owned()))?;
        let denominator: u32 = denominator
            .trim()
            .parse()
            .map_err(|_| ParseError::Quota(s.to_owned()))?;
        if denominator == 0 {
            return Err(ParseError::ZeroDenominator(s.to_owned()));
        }

        Ok(Self::Partial {
            kind: kind.to_owned(),
            numerator,
            denominator,
        })
    }
}

/// The direction a link field points in.
///
/// Link targets written in `downward_links` are satisfied *by* the record;
/// targets written in `upward_links` are satisfied by the target, so the
/// edge is reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkDirection {
    /// Edge from the record to the target.
    Downward,
    /// Edge from the target to the record.
    Upward,
}

impl LinkDirection {
    /// Derives the direction from a link field name.
    #[must_use]
    pub fn of_field(name: &str) -> Self {
        if name.contains("upward") {
            Self::Upward
        } else {
            Self::Downward
        }
    }
}

/// Parses a link field value into `(link type, target)` pairs.
///
/// The value is a comma-separated list of `type:target` entries. Empty
/// entries (from trailing or doubled commas) are skipped.
///
/// # Errors
///
/// Returns a [`ParseError`] if a non-empty entry has no `:` separator, an
/// empty type or target, or a malformed partial quota.
pub fn parse_link_field(value: &str) -> Result<Vec<(LinkType, String)>, ParseError> {
    let mut links = Vec::new();
    for entry in value.split(',') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let (kind, target) = entry
            .split_once(':')
            .ok_or_else(|| ParseError::MissingTarget(entry.to_owned()))?;
        let target = target.trim();
        if target.is_empty() {
            return Err(ParseError::MissingTarget(entry.to_owned()));
        }
        links.push((kind.parse()?, target.to_owned()));
    }
    Ok(links)
}

/// Errors produced while parsing the link mini-language.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// A link entry has no `:` separator or an empty target.
    #[error("link entry '{0}' is not of the form 'type:target'")]
    MissingTarget(String),

    /// A link type is empty.
    #[error("link entry '{0}' has an empty type")]
    EmptyType(String),

    /// A `partly_` link type has a malformed `(<a>/<b>)` quota.
    #[error("malformed partial quota in link type '{0}'")]
    Quota(String),

    /// A partial quota has a zero denominator.
    #[error("partial quota denominator is zero in link type '{0}'")]
    ZeroDenominator(String),
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("verifies"; "plain kind")]
    #[test_case("refines"; "refines")]
    #[test_case("extern"; "extern kind")]
    fn parses_full_link(s: &str) {
        let link: LinkType = s.parse().unwrap();
        assert_eq!(link, LinkType::Full(s.to_owned()));
        assert_eq!(link.kind(), s);
        assert!((link.credit() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_partial_link() {
        let link: LinkType = "partly_verifies(1/2)".parse().unwrap();
        assert_eq!(
            link,
            LinkType::Partial {
                kind: "verifies".to_owned(),
                numerator: 1,
                denominator: 2,
            }
        );
        assert!((link.credit() - 0.5).abs() < f64::EPSILON);
        assert_eq!(link.status_key(), "verifies_link_status");
    }

    #[test_case("partly_verifies"; "missing quota")]
    #[test_case("partly_verifies(1/2"; "unterminated quota")]
    #[test_case("partly_verifies(a/2)"; "non numeric numerator")]
    #[test_case("partly_verifies(1/b)"; "non numeric denominator")]
    #[test_case("partly_verifies(12)"; "missing slash")]
    fn malformed_quota_is_rejected(s: &str) {
        assert!(matches!(s.parse::<LinkType>(), Err(ParseError::Quota(_))));
    }

    #[test]
    fn zero_denominator_is_rejected() {
        assert!(matches!(
            "partly_verifies(1/0)".parse::<LinkType>(),
            Err(ParseError::ZeroDenominator(_))
        ));
    }

    #[test]
    fn empty_type_is_rejected() {
        assert!(matches!(
            "".parse::<LinkType>(),
            Err(ParseError::EmptyType(_))
        ));
        assert!(matches!(
            "partly_(1/2)".parse::<LinkType>(),
            Err(ParseError::EmptyType(_))
        ));
    }

    #[test]
    fn display_round_trips() {
        for s in ["verifies", "partly_refines(3/4)"] {
            let link: LinkType = s.parse().unwrap();
            assert_eq!(link.to_string(), s);
        }
    }

    #[test]
    fn zeroed_keeps_kind_and_drops_credit() {
        let link: LinkType = "partly_verifies(1/2)".parse().unwrap();
        let zeroed = link.zeroed();
        assert_eq!(zeroed.kind(), "verifies");
        assert!(zeroed.credit().abs() < f64::EPSILON);
    }

    #[test]
    fn extern_detection_is_substring_based() {
        assert!("extern".parse::<LinkType>().unwrap().is_extern());
        assert!("extern_verifies".parse::<LinkType>().unwrap().is_extern());
        assert!(!"verifies".parse::<LinkType>().unwrap().is_extern());
    }

    #[test]
    fn parses_link_field_list() {
        let links = parse_link_field("verifies:Test_1, refines:Req_1").unwrap();
        assert_eq!(
            links,
            vec![
                (LinkType::Full("verifies".to_owned()), "Test_1".to_owned()),
                (LinkType::Full("refines".to_owned()), "Req_1".to_owned()),
            ]
        );
    }

    #[test]
    fn empty_entries_are_skipped() {
        let links = parse_link_field("verifies:Test_1,, ").unwrap();
        assert_eq!(links.len(), 1);
        assert!(parse_link_field("").unwrap().is_empty());
    }

    #[test]
    fn entry_without_separator_is_rejected() {
        assert!(matches!(
            parse_link_field("verifies Test_1"),
            Err(ParseError::MissingTarget(_))
        ));
    }

    #[test]
    fn entry_without_target_is_rejected() {
        assert!(matches!(
            parse_link_field("verifies:"),
            Err(ParseError::MissingTarget(_))
        ));
    }

    #[test]
    fn quota_error_propagates_from_field_parse() {
        assert!(matches!(
            parse_link_field("partly_verifies(x/2):Test_1"),
            Err(ParseError::Quota(_))
        ));
    }

    #[test]
    fn direction_from_field_name() {
        assert_eq!(
            LinkDirection::of_field("upward_links"),
            LinkDirection::Upward
        );
        assert_eq!(
            LinkDirection::of_field("downward_links"),
            LinkDirection::Downward
        );
        assert_eq!(
            LinkDirection::of_field("extra_links"),
            LinkDirection::Downward
        );
    }
}
