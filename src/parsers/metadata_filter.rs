use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::path::Path;

use super::{get_attr, local_name};
use crate::error::FilterParseError;
use crate::model::trust_relationship::MetadataFilter;

/// Parse one stored `<MetadataFilter xsi:type="...">` blob.
///
/// The whole blob must be one well-formed element: it is spliced verbatim
/// into `metadata-providers.xml`.
pub fn parse_str(xml: &str) -> Result<MetadataFilter, FilterParseError> {
    let mut reader = Reader::from_str(xml);
    let mut filter: Option<MetadataFilter> = None;
    let mut depth = 0usize;

    loop {
        let closed = filter.is_some() && depth == 0;
        match reader.read_event() {
            Ok(Event::Start(_)) | Ok(Event::Empty(_)) | Ok(Event::End(_)) | Ok(Event::CData(_))
                if closed =>
            {
                return Err(FilterParseError(format!(
                    "content after root element at position {}",
                    reader.buffer_position()
                )));
            }
            Ok(Event::Text(t))
                if (closed || depth == 0) && !t.iter().all(u8::is_ascii_whitespace) =>
            {
                return Err(FilterParseError(format!(
                    "text outside root element at position {}",
                    reader.buffer_position()
                )));
            }
            Ok(Event::Start(e)) if filter.is_none() => {
                filter = Some(root_filter(&e, xml)?);
                depth = 1;
            }
            Ok(Event::Empty(e)) if filter.is_none() => {
                filter = Some(root_filter(&e, xml)?);
            }
            Ok(Event::Start(_)) => depth += 1,
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => {
                return match filter {
                    Some(_) if depth > 0 => {
                        Err(FilterParseError("unclosed root element".to_string()))
                    }
                    Some(filter) => Ok(filter),
                    None => Err(FilterParseError("empty filter definition".to_string())),
                };
            }
            Err(e) => {
                return Err(FilterParseError(format!(
                    "XML error at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }
}

fn root_filter(e: &BytesStart, xml: &str) -> Result<MetadataFilter, FilterParseError> {
    let element = local_name(e);
    let filter_type = get_attr(e, "type")
        .map(|t| t.rsplit(':').next().unwrap_or(&t).trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| FilterParseError(format!("<{}> has no xsi:type discriminator", element)))?;
    let certificate_file = get_attr(e, "certificateFile")
        .or_else(|| get_attr(e, "certificate"))
        .and_then(|c| {
            Path::new(c.trim())
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
        });
    Ok(MetadataFilter {
        name: lower_camel(&filter_type),
        filter_type,
        certificate_file,
        xml: xml.trim().to_string(),
    })
}

/// `SignatureValidation` → `signatureValidation`.
fn lower_camel(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
