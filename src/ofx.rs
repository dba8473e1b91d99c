use crate::models::{FileFormat, RawRow, RawTable};

/// Column names of the rows produced by [`read_ofx`], in order.
pub const OFX_COLUMNS: &[&str] = &["DTPOSTED", "TRNAMT", "NAME", "MEMO", "FITID", "TRNTYPE"];

pub fn is_ofx(text: &str) -> bool {
    let head: String = text.chars().take(4096).collect::<String>().to_ascii_uppercase();
    head.contains("OFXHEADER") || head.contains("<OFX>") || text.to_ascii_uppercase().contains("<STMTTRN>")
}

/// Quicken's flavour carries an Intuit bank id.
pub fn is_qfx(text: &str) -> bool {
    text.to_ascii_uppercase().contains("<INTU.BID>")
}

/// Institution name from `<FI><ORG>`, when present.
pub fn institution(text: &str) -> Option<String> {
    extract_tag_value(text, "ORG")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read `STMTTRN` records from OFX 1.x SGML (unclosed leaf tags) or OFX 2.x XML.
pub fn read_ofx(text: &str, format: FileFormat) -> RawTable {
    let account_id = extract_tag_value(text, "ACCTID")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let mut rows = Vec::new();
    for (offset, block) in extract_blocks(text, "STMTTRN") {
        let values = OFX_COLUMNS
            .iter()
            .map(|tag| {
                extract_tag_value(block, tag)
                    .map(|v| unescape(v.trim()))
                    .unwrap_or_default()
            })
            .collect();
        let line = text[..offset].matches('\n').count() as u64 + 1;
        rows.push(RawRow { line, values });
    }

    RawTable {
        format,
        headers: OFX_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows,
        account_id,
        unreadable: Vec::new(),
    }
}

/// Every `<TAG>...` block with its byte offset. A block ends at `</TAG>`, or
/// at the next `<TAG>` / enclosing list end for SGML files that omit it.
fn extract_blocks<'a>(text: &'a str, tag: &str) -> Vec<(usize, &'a str)> {
    let upper = text.to_ascii_uppercase();
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(found) = upper[cursor..].find(&open) {
        let start = cursor + found + open.len();
        let rest = &upper[start..];
        let end = [rest.find(&close), rest.find(&open), rest.find("</BANKTRANLIST>")]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(rest.len());
        blocks.push((cursor + found, &text[start..start + end]));
        cursor = start + end;
    }
    blocks
}

/// Value of the first `<TAG>` in `text`: everything up to the next tag or line end.
fn extract_tag_value<'a>(text: &'a str, tag: &str) -> Option<&'a str> {
    let upper = text.to_ascii_uppercase();
    let open = format!("<{tag}>");
    let start = upper.find(&open)? + open.len();
    let rest = &text[start..];
    let end = rest.find(['<', '\r', '\n']).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn unescape(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
}
