//! `META-INF/container.xml` parsing.

use anyhow::{Context, Result, bail};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::PACKAGE_MEDIA_TYPE;

/// Return the `full-path` of every `rootfile` listed in the container, in
/// document order.
///
/// Each rootfile must declare the OPF package media type.
pub fn parse_container_xml(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rootfiles = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.local_name().as_ref() == b"rootfile" => {
                let path = parse_rootfile(&e).context("failed to parse META-INF/container.xml")?;
                rootfiles.push(path);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => bail!("META-INF/container.xml is not well-formed XML: {e}"),
        }
    }

    Ok(rootfiles)
}

fn parse_rootfile(element: &BytesStart<'_>) -> Result<String> {
    let mut media_type = None;
    let mut full_path = None;

    for attr in element.attributes() {
        let attr = attr?;
        match attr.key.local_name().as_ref() {
            b"media-type" => media_type = Some(attr.unescape_value()?.trim().to_string()),
            b"full-path" => full_path = Some(attr.unescape_value()?.trim().to_string()),
            _ => {}
        }
    }

    let Some(media_type) = media_type else {
        bail!("rootfile has no media-type attribute");
    };
    if media_type != PACKAGE_MEDIA_TYPE {
        bail!("rootfile media-type is {media_type:?}, expected {PACKAGE_MEDIA_TYPE:?}");
    }

    full_path.context("rootfile has no full-path attribute")
}
