//! Page rendering

use std::fmt::Write;

use html_escape::encode_text;

use super::notice::Notice;
use crate::ledger::FileRecord;

const STYLE: &str = "body{font-family:sans-serif;max-width:60rem;margin:2rem auto;padding:0 1rem}\
table{border-collapse:collapse;width:100%}td,th{border:1px solid #ccc;padding:.3rem .5rem;text-align:left}\
code{font-size:.8rem;word-break:break-all}.notice{padding:.5rem;margin:.5rem 0;border-radius:4px}\
.info{background:#e8f0fe}.success{background:#e6f4ea}.error{background:#fce8e6}";

fn layout(title: &str, notices: &[Notice], body: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{}</title><style>{}</style></head><body>",
        encode_text(title),
        STYLE
    );
    let _ = write!(
        html,
        "<nav><a href=\"/\">Upload</a> | <a href=\"/files\">Recorded files</a></nav><h1>{}</h1>",
        encode_text(title)
    );
    for notice in notices {
        let _ = write!(
            html,
            "<div class=\"notice {}\">{}</div>",
            notice.level.as_str(),
            encode_text(&notice.text)
        );
    }
    html.push_str(body);
    html.push_str("</body></html>");
    html
}

/// Human-readable size: whole MiB, else KiB, else bytes
fn format_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * KIB;
    if bytes >= MIB {
        let tenths = (bytes % MIB) * 10 / MIB;
        if tenths == 0 {
            format!("{} MiB", bytes / MIB)
        } else {
            format!("{}.{} MiB", bytes / MIB, tenths)
        }
    } else if bytes >= KIB {
        format!("{} KiB", bytes / KIB)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Landing page: record count and upload form. `count` is `None` when it
/// could not be read.
pub fn landing(count: Option<u64>, max_upload_bytes: usize, notices: &[Notice]) -> String {
    let count = count
        .map(|c| c.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let body = format!(
        "<p>Files recorded on chain: <strong id=\"file-count\">{}</strong></p>\
         <form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"file\"> <button type=\"submit\">Upload</button></form>\
         <p><small>Maximum upload size: {}</small></p>",
        count,
        format_size(max_upload_bytes)
    );
    layout("File integrity ledger", notices, &body)
}

/// Listing page, one row per record in ledger order
pub fn file_list(records: &[FileRecord], notices: &[Notice]) -> String {
    let mut body = String::new();

    if records.is_empty() {
        body.push_str("<p>No files recorded yet.</p>");
    } else {
        body.push_str(
            "<table><thead><tr><th>#</th><th>Filename</th><th>SHA-256</th>\
             <th>Recorded</th><th>Uploader</th><th></th></tr></thead><tbody>",
        );
        for record in records {
            let recorded = record
                .recorded_at()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| record.timestamp.to_string());
            let _ = write!(
                body,
                "<tr><td>{index}</td><td>{name}</td><td><code>{hash}</code></td><td>{recorded}</td>\
                 <td><code>{uploader}</code></td><td><a href=\"/verify/{index}\">Verify</a></td></tr>",
                index = record.index,
                name = encode_text(&record.filename),
                hash = encode_text(&record.file_hash),
                recorded = recorded,
                uploader = encode_text(&record.uploader),
            );
        }
        body.push_str("</tbody></table>");
    }

    layout("Recorded files", notices, &body)
}

/// Bare page around a single notice
pub fn message_page(title: &str, notice: &Notice) -> String {
    layout(title, std::slice::from_ref(notice), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::html::Level;

    #[test]
    fn test_landing_count() {
        let page = landing(Some(3), 50 * 1024 * 1024, &[]);
        assert!(page.contains("<strong id=\"file-count\">3</strong>"));
        assert!(page.contains("50 MiB"));

        let page = landing(None, 1024 * 1024, &[Notice::error("node down")]);
        assert!(page.contains(">N/A<"));
        assert!(page.contains("notice error"));
    }

    #[test]
    fn test_small_limits_are_not_rounded_to_zero() {
        assert!(landing(Some(0), 512 * 1024, &[]).contains("512 KiB"));
        assert_eq!(format_size(300), "300 bytes");
        assert_eq!(format_size(1024), "1 KiB");
        assert_eq!(format_size(3 * 1024 * 1024 / 2), "1.5 MiB");
        assert_eq!(format_size(50 * 1024 * 1024), "50 MiB");
    }

    #[test]
    fn test_list_escapes_and_links() {
        let records = vec![FileRecord {
            index: 0,
            filename: "<script>.txt".to_string(),
            file_hash: "ab".repeat(32),
            timestamp: 0,
            uploader: "0xAbC".to_string(),
        }];
        let page = file_list(&records, &[Notice::new(Level::Success, "ok")]);
        assert!(page.contains("&lt;script&gt;.txt"));
        assert!(!page.contains("<script>"));
        assert!(page.contains("href=\"/verify/0\""));
        assert!(page.contains("1970-01-01 00:00:00 UTC"));
    }

    #[test]
    fn test_empty_list() {
        assert!(file_list(&[], &[]).contains("No files recorded yet."));
    }
}
