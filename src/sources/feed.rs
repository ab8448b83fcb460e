/// RSS feed of newly published episodes
use crate::error::{Result, StrmError};
use crate::links::rewrite_host;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::{Deserialize, Serialize};

/// One `<item>` of the feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
}

/// Parse the feed document into entries, rewriting links to the playback host.
///
/// Missing `<title>`/`<link>` children default to empty strings. Malformed
/// XML is an error, and so is a body without a root element or one that ends
/// before every element is closed.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FeedEntry> = None;
    let mut field: Option<Field> = None;
    let mut depth: usize = 0;
    let mut has_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                has_root = true;
                match e.name().as_ref() {
                    b"item" => current = Some(FeedEntry { title: String::new(), link: String::new() }),
                    b"title" if current.is_some() => field = Some(Field::Title),
                    b"link" if current.is_some() => field = Some(Field::Link),
                    _ => field = None,
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                if e.name().as_ref() == b"item" {
                    if let Some(mut entry) = current.take() {
                        entry.link = rewrite_host(&entry.link);
                        entries.push(entry);
                    }
                }
                field = None;
            }
            Event::Empty(e) => {
                has_root = true;
                if e.name().as_ref() == b"item" {
                    entries.push(FeedEntry { title: String::new(), link: String::new() });
                }
            }
            Event::Text(e) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                    let text = e.unescape()?;
                    push_text(entry, field, &text);
                }
            }
            Event::CData(e) => {
                if let (Some(entry), Some(field)) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    push_text(entry, field, &text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !has_root {
        return Err(StrmError::IncompleteFeed("no root element".to_string()));
    }
    if depth > 0 {
        return Err(StrmError::IncompleteFeed(format!(
            "document ended with {} open elements",
            depth
        )));
    }

    Ok(entries)
}

fn push_text(entry: &mut FeedEntry, field: Field, text: &str) {
    match field {
        Field::Title => entry.title.push_str(text),
        Field::Link => entry.link.push_str(text),
    }
}
