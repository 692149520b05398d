use crate::utils::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::io::Read;
use std::path::Path;

pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// 依副檔名（不分大小寫）決定 MIME 類型
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("tiff") | Some("tif") => "image/tiff",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// 讀完整個 stream，轉成 `data:<mime>;base64,<payload>`
pub fn stream_to_base64<R: Read>(mut stream: R, file_name: &str) -> Result<String> {
    let mut buffer = Vec::new();
    stream.read_to_end(&mut buffer)?;
    Ok(to_data_url(&buffer, file_name))
}

pub fn to_data_url(bytes: &[u8], file_name: &str) -> String {
    format!("data:{};base64,{}", mime_type_for(file_name), base64_encode(bytes))
}

pub fn base64_encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// 解碼前先去掉 `data:...;base64,` 前綴（第一個逗號之前的內容）
pub fn base64_decode(content: &str) -> Result<Vec<u8>> {
    let payload = if content.starts_with("data:") {
        content.split_once(',').map(|(_, data)| data).unwrap_or("")
    } else {
        content
    };
    Ok(STANDARD.decode(payload.trim())?)
}
