use std::path::Path;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

/// Serialize `value` as 4-space indented JSON with non-ASCII text written
/// literally, replacing whatever is at `path`.
pub fn write_json_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser).map_err(std::io::Error::other)?;

    std::fs::write(path, buf)
}
