//! Split a `country area` pair into structured fields.
//!
//! The input is matched as `"{country}:{area}"` against an ordered table
//! of patterns. The first pattern that matches decides the fields; each
//! capture group is appended to the field listed for it. Chinese
//! province/city/district patterns come first, then foreign
//! state/county/village patterns, then a generic `country:carrier`.

use crate::v4::PLACEHOLDER_AREA;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const DEFAULT_COUNTRY: &str = "中国";
const CHINESE_REGIONS: [&str; 3] = ["香港", "澳门", "台湾"];

/// Structured location fields
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct LocationFields {
    /// Country, `中国` unless a pattern names another
    pub country: String,
    /// Province or foreign state
    pub province: String,
    /// City or county
    pub city: String,
    /// District or village
    pub block: String,
    /// Network operator
    pub carrier: String,
    /// Access network type
    pub network: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Country,
    Province,
    City,
    Block,
    Carrier,
    Network,
}

impl LocationFields {
    fn slot(&mut self, field: Field) -> &mut String {
        match field {
            Field::Country => &mut self.country,
            Field::Province => &mut self.province,
            Field::City => &mut self.city,
            Field::Block => &mut self.block,
            Field::Carrier => &mut self.carrier,
            Field::Network => &mut self.network,
        }
    }
}

use Field::*;

struct Rule {
    pattern: Regex,
    /// Target field for each capture group, in group order
    groups: &'static [Field],
}

const RULES: &[(&str, &[Field])] = &[
    // Chinese carriers
    (r"(.+)省(.+)市(.+)区:(.+)", &[Province, City, Block, Carrier]),
    (r"(.+)省(.+)市:(.+)(公司)(.*)", &[Province, City, Carrier, Carrier, Network]),
    (r"(.+)省(.+)市:(.*)(电信|移动|联通)(.*)", &[Province, City, Carrier, Carrier, Network]),
    (r"(.+)省(.+)市:(.+)", &[Province, City, Carrier]),
    (r"(.+)省:(.+)(公众宽带)", &[Province, Carrier, Network]),
    (r"(.+)省:(.+)", &[Province, Carrier]),
    // Foreign carriers
    (
        r"(.+):(.+)州(.+)县(.+)村(.+)(公司)(.*)",
        &[Country, Province, City, Block, Carrier, Carrier, Network],
    ),
    (
        r"(.+):(.+)州(.+)县(.+)市(.+)(公司)(.*)",
        &[Country, Province, City, Block, Carrier, Carrier, Network],
    ),
    (r"(.+):(.+)州(.+)县(.+)村(.+)", &[Country, Province, City, Block, Carrier]),
    (r"(.+):(.+)州(.+)县(.+)(公司)(.*)", &[Country, Province, City, Carrier, Carrier, Network]),
    (r"(.+):(.+)州(.+)市(.+)(公司)(.*)", &[Country, Province, City, Carrier, Carrier, Network]),
    (r"(.+):(.+)州(.+)市(.*)", &[Country, Province, City, Carrier]),
    (r"(.+):(.+)(公司)(.*)", &[Country, Carrier, Carrier, Network]),
    (r"(.+):(.+)州(.*)", &[Country, Province, Carrier]),
    (r"(.+):(.+)", &[Country, Carrier]),
];

fn rules() -> &'static [Rule] {
    static COMPILED: OnceLock<Vec<Rule>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        RULES
            .iter()
            .filter_map(|&(pattern, groups)| match Regex::new(pattern) {
                Ok(pattern) => Some(Rule { pattern, groups }),
                Err(e) => {
                    tracing::error!(error = %e, "invalid splitter pattern");
                    None
                }
            })
            .collect()
    })
}

/// Split a location into fields; `None` when no pattern matches
pub fn split(country: &str, area: &str) -> Option<LocationFields> {
    let joined = format!("{}:{}", country, area);
    let text = joined.strip_prefix(DEFAULT_COUNTRY).unwrap_or(&joined);

    let mut fields = LocationFields {
        country: DEFAULT_COUNTRY.to_string(),
        ..LocationFields::default()
    };

    let (rule, caps) = rules()
        .iter()
        .find_map(|rule| rule.pattern.captures(text).map(|caps| (rule, caps)))?;

    if rule.groups.contains(&Country) {
        fields.country.clear();
    }
    for (i, field) in rule.groups.iter().enumerate() {
        let value = caps.get(i + 1).map_or("", |m| m.as_str());
        fields.slot(*field).push_str(value);
    }

    if CHINESE_REGIONS.contains(&fields.country.as_str()) {
        fields.province = std::mem::replace(&mut fields.country, DEFAULT_COUNTRY.to_string());
    }
    if fields.carrier == PLACEHOLDER_AREA {
        fields.carrier.clear();
    }
    Some(fields)
}
