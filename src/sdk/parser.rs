use serde::{Deserialize, Serialize};

/// 当前使用版本在 Use 列中的标记
pub const IN_USE_MARKER: &str = ">>>";

const MIN_FIELDS: usize = 6;

/// `sdk list <candidate>` 表格中的一行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// 最近一个供应商分组标签，表头之后尚未出现时为空
    pub vendor: String,
    pub in_use: bool,
    pub version: String,
    pub distribution: String,
    pub status: String,
    /// 传给 `sdk install` 的标识符
    pub identifier: String,
}

impl VersionRecord {
    pub fn use_marker(&self) -> &'static str {
        if self.in_use {
            IN_USE_MARKER
        } else {
            ""
        }
    }
}

/// 解析 `sdk list <candidate>` 的输出
///
/// 单次正向扫描，携带两份状态：当前供应商标签和是否已进入表格。
/// 字段少于 6 个的行被视为装饰性格式直接丢弃。
/// `filter` 非空时只保留 `version` 包含该子串（区分大小写）的记录。
pub fn parse_versions(output: &str, filter: Option<&str>) -> Vec<VersionRecord> {
    let filter = filter.filter(|f| !f.is_empty());
    let mut records = Vec::new();
    let mut current_vendor = String::new();
    let mut in_table = false;

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if is_rule_line(line) {
            if is_header(line) {
                in_table = true;
            }
            continue;
        }

        if !in_table {
            if is_header(line) {
                in_table = true;
            }
            continue;
        }

        if !line.contains('|') {
            current_vendor = line.to_string();
            continue;
        }

        let parts: Vec<&str> = line.split('|').map(str::trim).collect();
        if parts.len() < MIN_FIELDS {
            continue;
        }

        let record = VersionRecord {
            vendor: current_vendor.clone(),
            in_use: parts[1].contains(IN_USE_MARKER),
            version: parts[2].to_string(),
            distribution: parts[3].to_string(),
            status: parts[4].to_string(),
            identifier: parts[5].to_string(),
        };

        if filter.map_or(true, |f| record.version.contains(f)) {
            records.push(record);
        }
    }

    records
}

fn is_rule_line(line: &str) -> bool {
    line.starts_with("==") || line.starts_with("--")
}

fn is_header(line: &str) -> bool {
    line.contains("Vendor") && line.contains("Version")
}
