// ==========================================
// 通用数据导入引擎 - 字符编码归一
// ==========================================
// 职责: 单元格文本统一转 UTF-8（强制字符集 / 逐格自动识别）
// 说明: 表格文件常因复制粘贴混入遗留编码，识别必须逐格进行
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use encoding_rs::{Encoding, WINDOWS_1252};

/// 解析运行级「强制字符集」选项；未知标签属配置错误
pub fn resolve_charset(label: Option<&str>) -> ImportResult<Option<&'static Encoding>> {
    match label {
        None => Ok(None),
        Some(raw) => Encoding::for_label(raw.trim().as_bytes())
            .map(Some)
            .ok_or_else(|| ImportError::Configuration(format!("未知的强制字符集: {}", raw))),
    }
}

/// 将一个单元格的原始字节归一为 UTF-8 字符串
///
/// - 指定了强制字符集：一律经该字符集解码
/// - 未指定：逐格自动识别 —— 本身是合法 UTF-8 则原样保留，
///   否则按 Windows-1252（遗留编码）转码
pub fn normalize_cell(bytes: &[u8], forced: Option<&'static Encoding>) -> String {
    match forced {
        Some(encoding) => {
            let (text, _, _) = encoding.decode(bytes);
            text.into_owned()
        }
        None => match std::str::from_utf8(bytes) {
            Ok(valid) => valid.to_string(),
            Err(_) => {
                let (text, _, _) = WINDOWS_1252.decode(bytes);
                text.into_owned()
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_utf8_kept() {
        assert_eq!(normalize_cell("Société".as_bytes(), None), "Société");
    }

    #[test]
    fn test_legacy_bytes_transcoded() {
        // "Société" 的 Windows-1252 编码（é = 0xE9）
        let legacy = b"Soci\xe9t\xe9";
        assert_eq!(normalize_cell(legacy, None), "Société");
    }

    #[test]
    fn test_forced_charset() {
        let enc = resolve_charset(Some("windows-1252")).unwrap().unwrap();
        assert_eq!(normalize_cell(b"Soci\xe9t\xe9", Some(enc)), "Société");
    }

    #[test]
    fn test_unknown_charset_is_configuration_error() {
        assert!(matches!(
            resolve_charset(Some("klingon-8")),
            Err(ImportError::Configuration(_))
        ));
    }
}
