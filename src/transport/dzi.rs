//! Deep Zoom Image (DZI) descriptor parsing.
//!
//! The image server describes every page with a DZI descriptor:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
//!        TileSize="256"
//!        Overlap="1"
//!        Format="jpg">
//!   <Size Width="5120" Height="7168" />
//! </Image>
//! ```

use std::str::FromStr;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::model::ManuscriptPageMetadata;

/// Parse a DZI descriptor into the geometry of page `page_id`.
///
/// Returns a human-readable message when the document is malformed or an
/// attribute is missing.
pub fn parse_dzi_descriptor(page_id: &str, xml: &str) -> Result<ManuscriptPageMetadata, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut tile_size = None;
    let mut overlap = None;
    let mut format = None;
    let mut width = None;
    let mut height = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) | Ok(Event::Empty(element)) => {
                let is_image = element.local_name().as_ref() == b"Image";
                let is_size = element.local_name().as_ref() == b"Size";
                if !is_image && !is_size {
                    continue;
                }

                for attribute in element.attributes() {
                    let attribute = attribute.map_err(|e| e.to_string())?;
                    let value = attribute.unescape_value().map_err(|e| e.to_string())?;

                    match (is_image, attribute.key.local_name().as_ref()) {
                        (true, b"TileSize") => tile_size = Some(parse_attr("TileSize", &value)?),
                        (true, b"Overlap") => overlap = Some(parse_attr("Overlap", &value)?),
                        (true, b"Format") => format = Some(value.into_owned()),
                        (false, b"Width") => width = Some(parse_attr("Width", &value)?),
                        (false, b"Height") => height = Some(parse_attr("Height", &value)?),
                        _ => {}
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed XML at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
            _ => {}
        }
    }

    let tile_size: u32 = tile_size.ok_or_else(|| missing("TileSize"))?;
    if tile_size == 0 {
        return Err("TileSize must be greater than 0".to_string());
    }

    Ok(ManuscriptPageMetadata {
        id: page_id.to_string(),
        width: width.ok_or_else(|| missing("Width"))?,
        height: height.ok_or_else(|| missing("Height"))?,
        tile_size,
        format: format.ok_or_else(|| missing("Format"))?,
        tile_overlap: overlap.ok_or_else(|| missing("Overlap"))?,
    })
}

fn parse_attr<T: FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("attribute {} is not a valid number: {:?}", name, value))
}

fn missing(name: &str) -> String {
    format!("missing {} attribute", name)
}
