//! Localised text produced by the engines themselves.
//!
//! Database strings are returned as stored; everything the engines write
//! on their own (placeholders, sentinel values, transition annotations)
//! comes from a [`Labels`] set. Annotation templates use `{ip}` for the
//! dotted IPv4 address and `{location}` for its resolved description.

use serde::{Deserialize, Serialize};

/// Built-in label sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Locale {
    /// English labels
    #[default]
    En,
    /// Simplified Chinese labels, matching the strings used by the
    /// databases' publishers
    ZhCn,
}

impl Locale {
    /// Labels for this locale
    pub fn labels(self) -> Labels {
        match self {
            Locale::En => Labels::english(),
            Locale::ZhCn => Labels::zh_cn(),
        }
    }
}

/// Text emitted by the engines
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    /// Placeholder for undecodable GBK text
    pub unknown: String,
    /// Placeholder for undecodable UTF-8 text
    pub unknown_data: String,
    /// Country for `::1`
    pub loopback: String,
    /// Country for `::ffff:a.b.c.d`
    pub ipv4_mapped: String,
    /// Country of the invalid-address sentinel
    pub invalid_address: String,
    /// Location used when no IPv4 engine can resolve an embedded address
    pub no_ipv4_database: String,
    /// Note for IPv4-mapped and 6to4 addresses
    pub embedded_ipv4: String,
    /// Note for the Teredo server address
    pub teredo_server: String,
    /// Note for the Teredo client address
    pub teredo_client: String,
    /// Note for ISATAP addresses
    pub isatap: String,
    /// Inserted between the area and each note
    pub note_separator: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self::english()
    }
}

impl Labels {
    /// English label set
    pub fn english() -> Self {
        Self {
            unknown: "unknown".to_string(),
            unknown_data: "unknown data".to_string(),
            loopback: "loopback".to_string(),
            ipv4_mapped: "IPv4-mapped address".to_string(),
            invalid_address: "invalid address".to_string(),
            no_ipv4_database: "no IPv4 database available".to_string(),
            embedded_ipv4: "embedded IPv4 address {ip}, located in {location}".to_string(),
            teredo_server: "Teredo server IPv4 address {ip}, located in {location}".to_string(),
            teredo_client: "Teredo client IPv4 address {ip}, located in {location}".to_string(),
            isatap: "ISATAP address, embedded IPv4 address {ip}, located in {location}"
                .to_string(),
            note_separator: "; ".to_string(),
        }
    }

    /// Simplified Chinese label set
    pub fn zh_cn() -> Self {
        Self {
            unknown: "未知".to_string(),
            unknown_data: "未知数据".to_string(),
            loopback: "本机地址".to_string(),
            ipv4_mapped: "IPv4映射地址".to_string(),
            invalid_address: "错误的IP地址".to_string(),
            no_ipv4_database: "无IPv4数据库".to_string(),
            embedded_ipv4: "对应的IPv4地址为{ip}，位置为{location}".to_string(),
            teredo_server: "Teredo服务器的IPv4地址为{ip}，位置为{location}".to_string(),
            teredo_client: "客户端真实的IPv4地址为{ip}，位置为{location}".to_string(),
            isatap: "ISATAP地址，对应的IPv4地址为{ip}，位置为{location}".to_string(),
            note_separator: "<br/>".to_string(),
        }
    }
}

/// Fill an annotation template
pub fn render(template: &str, ip: &str, location: &str) -> String {
    template.replace("{ip}", ip).replace("{location}", location)
}
