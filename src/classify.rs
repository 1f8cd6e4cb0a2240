//! Line Classifier
//!
//! Tags each line of vendor-utility output with a closed set of line kinds,
//! independent of any accumulation state. The classifier never looks beyond
//! the current line; look-behind context ("which feature are we inside") is
//! the decoder's job. All patterns are compiled once, so the recognizers are
//! cheap per line and testable in isolation.
//!
//! Vendor output is not a documented grammar. The patterns below are written
//! against literal samples collected from real servers and deliberately
//! tolerate the drift seen across utility versions (optional `v` prefix on
//! version tokens, one- or two-digit date fields, variable display columns)
//! without over-matching the neighboring line shapes.

use regex::Regex;

/// Fixed FlexLM error vocabulary. Matching is by substring; these lines are
/// terminal for FlexLM scanning.
const FLEX_CONNECT_ERROR: &str = "Cannot connect to license server";
const FLEX_READ_ERROR: &str = "Cannot read data";
const FLEX_STATUS_ERROR: &str = "Error getting status";
const FLEX_VENDOR_DOWN: &str = "vendor daemon is down";
const FLEX_NO_SUCH_FEATURE: &str = "No such feature exists.";

const RLM_CONNECT_ERROR: &str = "Error connecting";

/// RLM daemon utilities whose own status banner can superficially match the
/// `name version` feature pattern. Never features.
const RLM_UTILITIES: [&str; 5] = ["rlm", "rlmutil", "rlmstat", "rlmdown", "rlmreread"];

lazy_static::lazy_static! {
    static ref FLEX_SERVER_UP: Regex = Regex::new(
        r"^\s*(?P<host>\S+): license server UP(?P<master> \(MASTER\))? (?P<version>v[\w.]+)"
    ).unwrap();

    // `Users of NX: (Total of 4 licenses issued;  Total of 1 license in use)`;
    // older Siemens/UGS daemons shout "USERS OF".
    static ref FLEX_USAGE_HEADER: Regex = Regex::new(
        r"(?i)^\s*Users of (?P<feature>[^\s:]+):\s+\(Total of\s+(?P<issued>\d+)\s+licenses? issued;\s+Total of\s+(?P<in_use>\d+)\s+licenses? in use\)"
    ).unwrap();

    static ref FLEX_UNCOUNTED: Regex = Regex::new(
        r"(?i)^\s*Users of (?P<feature>[^\s:]+):\s+\(uncounted, node-locked\)"
    ).unwrap();

    // `"MATLAB" v40, vendor: MLM, expiry: 31-jan-2022` (expiry absent on older
    // daemons).
    static ref FLEX_INLINE_FEATURE: Regex = Regex::new(
        r#"^\s*"(?P<feature>[^"]+)"\s+(?P<version>[^,\s]+),\s+vendor:\s+(?P<vendor>[^,\s]+)(?:,\s+expiry:\s+(?P<expiry>.+?))?\s*$"#
    ).unwrap();

    // lmstat -i columns: feature version #licenses vendor expiration. The
    // numeric third column keeps the table header and underline rows out.
    static ref FLEX_POOL_DEFINITION: Regex = Regex::new(
        r"^\s*(?P<feature>\S+)\s+(?P<version>\S+)\s+(?P<total>\d+)\s+(?P<vendor>\S+)\s+(?P<expiry>\S+)\s*$"
    ).unwrap();

    // `joe host1 /dev/pts/2 (v2021.0331) (licserv/27000 2101), start Wed 3/17 10:20`
    // with any number of display columns between the host and the version
    // parenthetical, and an optional trailing ", N licenses" ignored.
    static ref FLEX_CHECKOUT: Regex = Regex::new(
        r"^\s*(?P<user>\S+)\s+(?P<host>\S+)\s+(?:\S+\s+)*?\((?P<version>[vV]?\d[^)\s]*)\)\s+\((?P<server>[^)]*)\),?\s+start\s+(?P<start>[^,(]+)"
    ).unwrap();

    static ref RLM_SERVER_UP: Regex = Regex::new(
        r"^\s*rlm status on (?P<host>\S+)"
    ).unwrap();

    static ref RLM_VERSION: Regex = Regex::new(
        r"^\s*rlm software version (?P<version>\S+)"
    ).unwrap();

    // Rows of the ISV servers table: `foobar  63133  Yes  0`.
    static ref RLM_ISV_STATUS: Regex = Regex::new(
        r"^\s*(?P<name>[A-Za-z][\w\-]*)\s+(?P<port>\d+)\s+(?P<running>\S+)\s+(?P<restarts>\d+)\s*$"
    ).unwrap();

    static ref RLM_ISV_BANNER: Regex = Regex::new(
        r"^\s*(?P<name>\S+) ISV server status on port"
    ).unwrap();

    // `arnold v2018.02, pool: 1` or a bare `name version` pair. Anchored so the
    // sentence-shaped banner lines cannot match; the utility deny-list handles
    // the two-token banners like `rlmutil v12.2`.
    static ref RLM_FEATURE_HEADER: Regex = Regex::new(
        r"^\s*(?P<feature>[A-Za-z][\w.\-+]*)\s+(?P<version>v?\d[\w.\-]*)\s*(?:,\s*pool:?\s*(?P<pool>\d+))?\s*$"
    ).unwrap();

    // `count: 100, # reservations: 0, inuse: 5, exp: 31-dec-2018`
    static ref RLM_POOL_DETAIL: Regex = Regex::new(
        r"count:\s*(?P<count>\d+).*?inuse:\s*(?P<in_use>\d+).*?exp:\s*(?P<exp>\S+)"
    ).unwrap();

    // `arnold v2018.02: user1@host1 5/0 at 09/19 10:21  (handle: 81)`
    static ref RLM_CHECKOUT: Regex = Regex::new(
        r"^\s*(?P<feature>\S+)\s+(?P<version>v?\d[\w.\-]*):\s+(?P<user>[^@\s]+)@(?P<host>\S+)\s+.*?\bat\s+(?P<start>\d{1,2}/\d{1,2}\s+\d{1,2}:\d{2})"
    ).unwrap();
}

/// Which fixed FlexLM error vocabulary entry a status line matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusErrorKind {
    Connection,
    Read,
    Status,
    VendorDown,
}

/// Raw fields of one user-checkout line, before timestamp resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCheckout {
    pub user: String,
    pub host: String,
    /// Client version as printed, leading `v` stripped.
    pub version: String,
    /// Start timestamp text, resolved by the decoder.
    pub start: String,
}

/// One classified line of `lmutil lmstat -i -a` output.
#[derive(Debug, Clone, PartialEq)]
pub enum FlexLmLine {
    ServerUp {
        host: String,
        master: bool,
        version: String,
    },
    /// Terminal for the scan; carries the full line as diagnostic.
    StatusError {
        kind: StatusErrorKind,
        message: String,
    },
    UsageHeader {
        feature: String,
        issued: u32,
        in_use: u32,
    },
    UncountedFeature {
        feature: String,
    },
    InlineFeature {
        feature: String,
        version: String,
        vendor: String,
        expiry: Option<String>,
    },
    PoolDefinition {
        feature: String,
        version: String,
        total: u32,
        vendor: String,
        expiry: String,
    },
    Checkout(RawCheckout),
    NoSuchFeature,
    Other,
}

/// One classified line of `rlmutil rlmstat -a` output.
#[derive(Debug, Clone, PartialEq)]
pub enum RlmLine {
    ServerUp {
        host: String,
    },
    Version {
        version: String,
    },
    /// Row of the ISV servers table; `running` is false for anything but
    /// a literal "Yes".
    IsvStatus {
        name: String,
        running: bool,
    },
    IsvBanner {
        name: String,
    },
    FeatureHeader {
        feature: String,
        version: String,
    },
    PoolDetail {
        count: u32,
        in_use: u32,
        expiry: String,
    },
    Checkout {
        feature: String,
        checkout: RawCheckout,
    },
    ConnectionError {
        message: String,
    },
    Other,
}

/// Strip the optional leading `v` from a version token so pool and client
/// versions compare regardless of which style the utility printed.
pub fn normalize_version(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'));
    match stripped {
        Some(rest) if rest.starts_with(|c: char| c.is_ascii_digit()) => rest.to_string(),
        _ => trimmed.to_string(),
    }
}

pub fn classify_flexlm(line: &str) -> FlexLmLine {
    if line.contains(FLEX_NO_SUCH_FEATURE) {
        return FlexLmLine::NoSuchFeature;
    }
    if let Some(kind) = flexlm_error_kind(line) {
        return FlexLmLine::StatusError {
            kind,
            message: line.trim().to_string(),
        };
    }
    if let Some(caps) = FLEX_USAGE_HEADER.captures(line) {
        if let (Ok(issued), Ok(in_use)) = (caps["issued"].parse(), caps["in_use"].parse()) {
            return FlexLmLine::UsageHeader {
                feature: caps["feature"].to_string(),
                issued,
                in_use,
            };
        }
    }
    if let Some(caps) = FLEX_UNCOUNTED.captures(line) {
        return FlexLmLine::UncountedFeature {
            feature: caps["feature"].to_string(),
        };
    }
    if let Some(caps) = FLEX_INLINE_FEATURE.captures(line) {
        return FlexLmLine::InlineFeature {
            feature: caps["feature"].to_string(),
            version: normalize_version(&caps["version"]),
            vendor: caps["vendor"].to_string(),
            expiry: caps.name("expiry").map(|m| m.as_str().to_string()),
        };
    }
    if let Some(caps) = FLEX_SERVER_UP.captures(line) {
        return FlexLmLine::ServerUp {
            host: caps["host"].to_string(),
            master: caps.name("master").is_some(),
            version: caps["version"].to_string(),
        };
    }
    if let Some(caps) = FLEX_POOL_DEFINITION.captures(line) {
        if let Ok(total) = caps["total"].parse() {
            return FlexLmLine::PoolDefinition {
                feature: caps["feature"].to_string(),
                version: normalize_version(&caps["version"]),
                total,
                vendor: caps["vendor"].to_string(),
                expiry: caps["expiry"].to_string(),
            };
        }
    }
    if let Some(caps) = FLEX_CHECKOUT.captures(line) {
        return FlexLmLine::Checkout(RawCheckout {
            user: caps["user"].to_string(),
            host: caps["host"].to_string(),
            version: normalize_version(&caps["version"]),
            start: caps["start"].trim().to_string(),
        });
    }
    FlexLmLine::Other
}

fn flexlm_error_kind(line: &str) -> Option<StatusErrorKind> {
    if line.contains(FLEX_CONNECT_ERROR) {
        Some(StatusErrorKind::Connection)
    } else if line.contains(FLEX_READ_ERROR) {
        Some(StatusErrorKind::Read)
    } else if line.contains(FLEX_VENDOR_DOWN) {
        Some(StatusErrorKind::VendorDown)
    } else if line.contains(FLEX_STATUS_ERROR) {
        Some(StatusErrorKind::Status)
    } else {
        None
    }
}

pub fn classify_rlm(line: &str) -> RlmLine {
    if line.contains(RLM_CONNECT_ERROR) {
        return RlmLine::ConnectionError {
            message: line.trim().to_string(),
        };
    }
    if let Some(caps) = RLM_SERVER_UP.captures(line) {
        return RlmLine::ServerUp {
            host: caps["host"].to_string(),
        };
    }
    if let Some(caps) = RLM_VERSION.captures(line) {
        return RlmLine::Version {
            version: caps["version"].to_string(),
        };
    }
    if let Some(caps) = RLM_ISV_BANNER.captures(line) {
        return RlmLine::IsvBanner {
            name: caps["name"].to_string(),
        };
    }
    if let Some(caps) = RLM_ISV_STATUS.captures(line) {
        return RlmLine::IsvStatus {
            name: caps["name"].to_string(),
            running: &caps["running"] == "Yes",
        };
    }
    if let Some(caps) = RLM_CHECKOUT.captures(line) {
        let feature = caps["feature"].to_string();
        if !is_rlm_utility(&feature) {
            return RlmLine::Checkout {
                feature,
                checkout: RawCheckout {
                    user: caps["user"].to_string(),
                    host: caps["host"].to_string(),
                    version: normalize_version(&caps["version"]),
                    start: caps["start"].trim().to_string(),
                },
            };
        }
    }
    if let Some(caps) = RLM_FEATURE_HEADER.captures(line) {
        let feature = caps["feature"].to_string();
        if !is_rlm_utility(&feature) {
            return RlmLine::FeatureHeader {
                feature,
                version: normalize_version(&caps["version"]),
            };
        }
        return RlmLine::Other;
    }
    if let Some(caps) = RLM_POOL_DETAIL.captures(line) {
        if let (Ok(count), Ok(in_use)) = (caps["count"].parse(), caps["in_use"].parse()) {
            return RlmLine::PoolDetail {
                count,
                in_use,
                expiry: caps["exp"].to_string(),
            };
        }
    }
    RlmLine::Other
}

fn is_rlm_utility(name: &str) -> bool {
    RLM_UTILITIES.iter().any(|u| name.eq_ignore_ascii_case(u))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flexlm_server_up() {
        let line = "  licserv: license server UP (MASTER) v11.16.2";
        match classify_flexlm(line) {
            FlexLmLine::ServerUp {
                host,
                master,
                version,
            } => {
                assert_eq!(host, "licserv");
                assert!(master);
                assert_eq!(version, "v11.16.2");
            }
            other => panic!("expected ServerUp, got {other:?}"),
        }

        let partner = "  licserv2: license server UP v11.16.2";
        match classify_flexlm(partner) {
            FlexLmLine::ServerUp { master, .. } => assert!(!master),
            other => panic!("expected ServerUp, got {other:?}"),
        }
    }

    #[test]
    fn test_flexlm_error_vocabulary() {
        let cases = [
            (
                "lmgrd is not running: Cannot connect to license server system. (-15,570:111 \"Connection refused\")",
                StatusErrorKind::Connection,
            ),
            (
                "Cannot read data from license server system. (-16,287)",
                StatusErrorKind::Read,
            ),
            (
                "Error getting status: License server machine is down or not responding.",
                StatusErrorKind::Status,
            ),
            (
                "ansyslmd: The desired vendor daemon is down. (-97,121)",
                StatusErrorKind::VendorDown,
            ),
        ];
        for (line, expected) in cases {
            match classify_flexlm(line) {
                FlexLmLine::StatusError { kind, message } => {
                    assert_eq!(kind, expected, "line: {line}");
                    assert_eq!(message, line.trim());
                }
                other => panic!("expected StatusError for {line}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_flexlm_usage_header_case_variants() {
        for line in [
            "Users of MATLAB:  (Total of 5 licenses issued;  Total of 2 licenses in use)",
            "USERS OF MATLAB:  (Total of 5 licenses issued;  Total of 2 licenses in use)",
        ] {
            match classify_flexlm(line) {
                FlexLmLine::UsageHeader {
                    feature,
                    issued,
                    in_use,
                } => {
                    assert_eq!(feature, "MATLAB");
                    assert_eq!((issued, in_use), (5, 2));
                }
                other => panic!("expected UsageHeader, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_flexlm_usage_header_singular_license() {
        let line = "Users of NX: (Total of 4 licenses issued;  Total of 1 license in use)";
        assert!(matches!(
            classify_flexlm(line),
            FlexLmLine::UsageHeader { in_use: 1, .. }
        ));
    }

    #[test]
    fn test_flexlm_uncounted() {
        let line = "Users of render_node:  (uncounted, node-locked)";
        assert_eq!(
            classify_flexlm(line),
            FlexLmLine::UncountedFeature {
                feature: "render_node".to_string()
            }
        );
    }

    #[test]
    fn test_flexlm_inline_feature() {
        let line = "  \"MATLAB\" v40, vendor: MLM, expiry: 31-jan-2022";
        match classify_flexlm(line) {
            FlexLmLine::InlineFeature {
                feature,
                version,
                vendor,
                expiry,
            } => {
                assert_eq!(feature, "MATLAB");
                assert_eq!(version, "40");
                assert_eq!(vendor, "MLM");
                assert_eq!(expiry.as_deref(), Some("31-jan-2022"));
            }
            other => panic!("expected InlineFeature, got {other:?}"),
        }

        let without_expiry = "  \"ansys\" v2021.0331, vendor: ansyslmd";
        match classify_flexlm(without_expiry) {
            FlexLmLine::InlineFeature { expiry, .. } => assert!(expiry.is_none()),
            other => panic!("expected InlineFeature, got {other:?}"),
        }
    }

    #[test]
    fn test_flexlm_pool_definition() {
        let line = "ansys                  2021.0331   10    ansyslmd    31-mar-2021";
        match classify_flexlm(line) {
            FlexLmLine::PoolDefinition {
                feature,
                version,
                total,
                vendor,
                expiry,
            } => {
                assert_eq!(feature, "ansys");
                assert_eq!(version, "2021.0331");
                assert_eq!(total, 10);
                assert_eq!(vendor, "ansyslmd");
                assert_eq!(expiry, "31-mar-2021");
            }
            other => panic!("expected PoolDefinition, got {other:?}"),
        }
    }

    #[test]
    fn test_flexlm_pool_definition_skips_table_header() {
        let header = "Feature                         Version     #licenses    Vendor        Expires";
        let underline = "_______                         _________   _________    ______        ________";
        assert_eq!(classify_flexlm(header), FlexLmLine::Other);
        assert_eq!(classify_flexlm(underline), FlexLmLine::Other);
    }

    #[test]
    fn test_flexlm_checkout_variants() {
        let with_display =
            "    joe host1 /dev/pts/2 (v2021.0331) (licserv/27000 2101), start Wed 3/17 10:20";
        match classify_flexlm(with_display) {
            FlexLmLine::Checkout(c) => {
                assert_eq!(c.user, "joe");
                assert_eq!(c.host, "host1");
                assert_eq!(c.version, "2021.0331");
                assert_eq!(c.start, "Wed 3/17 10:20");
            }
            other => panic!("expected Checkout, got {other:?}"),
        }

        // No leading v, four-digit year, extra display column.
        let drifted =
            "    amy ws12 ws12 /dev/tty (62.0) (licserv/27000 101), start Fri 7/9/2021 14:00";
        match classify_flexlm(drifted) {
            FlexLmLine::Checkout(c) => {
                assert_eq!(c.user, "amy");
                assert_eq!(c.version, "62.0");
                assert_eq!(c.start, "Fri 7/9/2021 14:00");
            }
            other => panic!("expected Checkout, got {other:?}"),
        }

        // Group checkout suffix after the timestamp is ignored.
        let group =
            "    bob host9 /dev/tty (v62.0) (licserv/27000 301), start Fri 7/9 14:00, 2 licenses";
        match classify_flexlm(group) {
            FlexLmLine::Checkout(c) => assert_eq!(c.start, "Fri 7/9 14:00"),
            other => panic!("expected Checkout, got {other:?}"),
        }

        let linger =
            "    eve host3 /dev/tty (v62.0) (licserv/27000 401), start Fri 7/9 14:00 (linger: 3600)";
        match classify_flexlm(linger) {
            FlexLmLine::Checkout(c) => assert_eq!(c.start, "Fri 7/9 14:00"),
            other => panic!("expected Checkout, got {other:?}"),
        }
    }

    #[test]
    fn test_flexlm_header_does_not_match_checkout() {
        let line = "Users of MATLAB:  (Total of 5 licenses issued;  Total of 2 licenses in use)";
        assert!(!matches!(classify_flexlm(line), FlexLmLine::Checkout(_)));
    }

    #[test]
    fn test_flexlm_no_such_feature() {
        let line = "Error getting users of \"ghost\": No such feature exists. (-5,222)";
        assert_eq!(classify_flexlm(line), FlexLmLine::NoSuchFeature);
    }

    #[test]
    fn test_rlm_server_and_version() {
        assert_eq!(
            classify_rlm("\trlm status on licserv (port 5053), up 21d 08:25:38"),
            RlmLine::ServerUp {
                host: "licserv".to_string()
            }
        );
        assert_eq!(
            classify_rlm("\trlm software version v12.2 (build:2)"),
            RlmLine::Version {
                version: "v12.2".to_string()
            }
        );
    }

    #[test]
    fn test_rlm_isv_status_row() {
        match classify_rlm("\tfoobar             63133   Yes      0") {
            RlmLine::IsvStatus { name, running } => {
                assert_eq!(name, "foobar");
                assert!(running);
            }
            other => panic!("expected IsvStatus, got {other:?}"),
        }
        match classify_rlm("\tfoobar             63133   No       2") {
            RlmLine::IsvStatus { running, .. } => assert!(!running),
            other => panic!("expected IsvStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_rlm_feature_header_and_deny_list() {
        match classify_rlm("\tarnold v2018.02, pool: 1") {
            RlmLine::FeatureHeader { feature, version } => {
                assert_eq!(feature, "arnold");
                assert_eq!(version, "2018.02");
            }
            other => panic!("expected FeatureHeader, got {other:?}"),
        }

        // The utility banner matches the name/version shape but must never
        // become a feature.
        assert_eq!(classify_rlm("rlmutil v12.2"), RlmLine::Other);
        for utility in ["rlm v12.2", "rlmstat v12.2", "rlmdown v12.2", "rlmreread v12.2"] {
            assert_eq!(classify_rlm(utility), RlmLine::Other, "line: {utility}");
        }
    }

    #[test]
    fn test_rlm_pool_detail() {
        let line = "\t\tcount: 100, # reservations: 0, inuse: 5, exp: 31-dec-2018";
        assert_eq!(
            classify_rlm(line),
            RlmLine::PoolDetail {
                count: 100,
                in_use: 5,
                expiry: "31-dec-2018".to_string()
            }
        );
    }

    #[test]
    fn test_rlm_checkout() {
        let line = "\tarnold v2018.02: user1@host1 5/0 at 09/19 10:21  (handle: 81)";
        match classify_rlm(line) {
            RlmLine::Checkout { feature, checkout } => {
                assert_eq!(feature, "arnold");
                assert_eq!(checkout.version, "2018.02");
                assert_eq!(checkout.user, "user1");
                assert_eq!(checkout.host, "host1");
                assert_eq!(checkout.start, "09/19 10:21");
            }
            other => panic!("expected Checkout, got {other:?}"),
        }
    }

    #[test]
    fn test_rlm_stats_rows_are_other() {
        for line in [
            "\tMessages:    582 (0/sec)           33562 (0/sec)      1033736 (0/sec)",
            "\tConnections: 463 (0/sec)           26335 (0/sec)      861954 (0/sec)",
            "\t--------- ISV servers ----------",
            "\t   Name           Port Running Restarts",
        ] {
            assert_eq!(classify_rlm(line), RlmLine::Other, "line: {line}");
        }
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("v2021.0331"), "2021.0331");
        assert_eq!(normalize_version("2021.0331"), "2021.0331");
        assert_eq!(normalize_version("V12.2"), "12.2");
        assert_eq!(normalize_version("vista"), "vista");
    }
}
