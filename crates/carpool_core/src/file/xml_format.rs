//! Markup format: one root element per collection, one child element per entity.
//!
//! ```text
//! <?xml version="1.0" encoding="UTF-8"?>
//! <users>
//!   <user><id>..</id><first_name>..</first_name>..</user>
//! </users>
//! ```
//!
//! Absent optional fields have no element at all; an empty element is an
//! empty string. Leading and trailing whitespace of a value is written as
//! character references, which the reader never trims.

use super::FileFormat;
use crate::error::{Backend, Cause};
use crate::model::entity::Entity;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde_json::Value;

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormat;

impl FileFormat for XmlFormat {
    const BACKEND: Backend = Backend::Xml;
    const EXTENSION: &'static str = "xml";

    fn encode<T: Entity>(items: &[T]) -> Result<Vec<u8>, Cause> {
        let mut out = String::new();
        out.push_str(XML_DECLARATION);
        out.push('\n');
        out.push_str(&format!("<{}>\n", T::COLLECTION));
        for item in items {
            let Value::Object(fields) = serde_json::to_value(item)? else {
                return Err(format!("{} does not serialize to named fields", T::NAME).into());
            };
            out.push_str(&format!("  <{}>", T::NAME));
            for name in T::FIELDS {
                let text = match fields.get(*name) {
                    None | Some(Value::Null) => continue,
                    Some(Value::String(text)) => escape_text(text),
                    Some(other) => other.to_string(),
                };
                out.push_str(&format!("<{name}>{text}</{name}>"));
            }
            out.push_str(&format!("</{}>\n", T::NAME));
        }
        out.push_str(&format!("</{}>\n", T::COLLECTION));
        Ok(out.into_bytes())
    }

    fn decode<T: Entity>(bytes: &[u8]) -> Result<Vec<T>, Cause> {
        let text = std::str::from_utf8(bytes)?;
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = Reader::from_str(text);
        let mut items = Vec::new();
        let mut root_opened = false;
        let mut root_closed = false;

        loop {
            let element_start = reader.buffer_position();
            match reader.read_event()? {
                Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
                Event::Text(content) => {
                    if !content.iter().all(u8::is_ascii_whitespace) {
                        return Err(format!(
                            "unexpected text outside of <{}> elements",
                            T::NAME
                        )
                        .into());
                    }
                }
                Event::Start(start) | Event::Empty(start) if root_closed => {
                    return Err(format!(
                        "unexpected element <{}> after the collection root",
                        String::from_utf8_lossy(start.name().as_ref())
                    )
                    .into());
                }
                Event::Start(start) if !root_opened => {
                    expect_name(start.name().as_ref(), T::COLLECTION)?;
                    root_opened = true;
                }
                Event::Empty(start) if !root_opened => {
                    expect_name(start.name().as_ref(), T::COLLECTION)?;
                    root_opened = true;
                    root_closed = true;
                }
                Event::Start(start) => {
                    expect_name(start.name().as_ref(), T::NAME)?;
                    let end = start.to_end().into_owned();
                    reader.read_to_end(end.name())?;
                    let fragment = &text[element_start..reader.buffer_position()];
                    items.push(quick_xml::de::from_str::<T>(fragment)?);
                }
                Event::Empty(start) => {
                    expect_name(start.name().as_ref(), T::NAME)?;
                    let fragment = &text[element_start..reader.buffer_position()];
                    items.push(quick_xml::de::from_str::<T>(fragment)?);
                }
                Event::End(_) => {
                    root_closed = true;
                }
                Event::CData(_) => {
                    return Err("unexpected CDATA section outside of an entity".into());
                }
                Event::Eof => break,
            }
        }

        if !root_closed {
            return Err(format!("missing or unterminated <{}> root", T::COLLECTION).into());
        }
        Ok(items)
    }
}

/// Escapes markup characters and turns edge whitespace into character
/// references.
fn escape_text(value: &str) -> String {
    let core = value.trim();
    let leading = &value[..value.len() - value.trim_start().len()];
    let trailing = &value[value.trim_end().len()..];
    if core.is_empty() {
        return char_refs(value);
    }
    format!("{}{}{}", char_refs(leading), escape(core), char_refs(trailing))
}

fn char_refs(whitespace: &str) -> String {
    whitespace
        .chars()
        .map(|ch| format!("&#x{:X};", u32::from(ch)))
        .collect()
}

fn expect_name(actual: &[u8], expected: &str) -> Result<(), Cause> {
    if actual == expected.as_bytes() {
        return Ok(());
    }
    Err(format!(
        "unexpected element <{}>; expected <{expected}>",
        String::from_utf8_lossy(actual)
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::XmlFormat;
    use crate::file::FileFormat;
    use crate::model::route::Route;
    use crate::model::trip::{Trip, TripStatus};
    use crate::model::user::User;

    #[test]
    fn empty_collection_is_a_bare_root() {
        let bytes = XmlFormat::encode::<Route>(&[]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("<routes>"));
        assert!(text.contains("</routes>"));
        assert!(XmlFormat::decode::<Route>(&bytes).unwrap().is_empty());
    }

    #[test]
    fn self_closing_root_decodes_as_empty() {
        let decoded = XmlFormat::decode::<Route>(b"<routes/>").unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn trips_keep_order_and_fields() {
        let mut first = Trip::new("driver-1", "route-1", 1_000, 3, 1_500);
        first.id = Some("trip-1".to_string());
        let mut second = Trip::new("driver-2", "route-1", 2_000, 4, 900);
        second.id = Some("trip-2".to_string());
        second.status = TripStatus::InProgress;

        let bytes = XmlFormat::encode(&[first.clone(), second.clone()]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.contains("<status>in_progress</status>"));

        let decoded = XmlFormat::decode::<Trip>(&bytes).unwrap();
        assert_eq!(decoded, vec![first, second]);
    }

    #[test]
    fn absent_optionals_have_no_element_and_edge_whitespace_survives() {
        let mut plain = User::new("  Ada ", "Love\tlace", "ada@example.com", "h");
        plain.id = Some("u-1".to_string());
        let mut blank = User::new("\n", "<Byron> & co", "b@example.com", "h").with_phone("");
        blank.id = Some("u-2".to_string());

        let bytes = XmlFormat::encode(&[plain.clone(), blank.clone()]).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(!text.contains("<phone/>"));
        assert!(text.contains("<first_name>&#x20;&#x20;Ada&#x20;</first_name>"));
        assert!(text.contains("<phone></phone>"));

        let decoded = XmlFormat::decode::<User>(&bytes).unwrap();
        assert_eq!(decoded, vec![plain, blank]);
    }

    #[test]
    fn wrong_root_is_rejected() {
        assert!(XmlFormat::decode::<Route>(b"<users></users>").is_err());
    }

    #[test]
    fn truncated_document_is_rejected() {
        assert!(XmlFormat::decode::<Route>(b"<routes><route><id>r</id>").is_err());
    }
}
