/// 节点温度数据解析

use serde_json::{Map, Value};

use crate::models::cluster::Thermal;
use crate::models::constants::{CORE_TEMP_PREFIX, PACKAGE_TEMP_KEY};

impl Thermal {
    /// 从节点状态中的 `thermalstate` 构建温度数据
    ///
    /// 只提取封装温度与各核心温度，原始数据由调用方另行透传
    pub fn from_thermalstate(raw: &Map<String, Value>) -> Self {
        let package_temp = raw.get(PACKAGE_TEMP_KEY).and_then(parse_temperature);

        let core_temps = raw
            .iter()
            .filter(|(key, _)| key.starts_with(CORE_TEMP_PREFIX))
            .filter_map(|(_, value)| parse_temperature(value))
            .collect();

        Self {
            package_temp,
            core_temps,
        }
    }
}

/// 解析温度值，截断为整数
///
/// 字符串只取开头的数字部分，例如 "55.8" 和 "55°C" 都解析为 55
pub fn parse_temperature(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let text = s.trim();
            let end = text
                .char_indices()
                .take_while(|(i, c)| c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+')))
                .map(|(i, c)| i + c.len_utf8())
                .last()?;
            text[..end].parse().ok()
        }
        _ => None,
    }
}
