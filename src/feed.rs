/*!
 * Feed index: episode metadata read from the podcast's `rss.xml`.
 *
 * The index keeps the original document text next to the parsed episodes.
 * Edits splice the document at the byte offsets recorded while parsing and
 * the result is re-indexed, so persisting never loses content this module
 * does not model (namespaces, channel elements, comments, CDATA...).
 */

use std::collections::HashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use log::debug;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::FeedError;
use crate::naming;

const CHANNEL_TAG: &[u8] = b"channel";
const ITEM_TAG: &[u8] = b"item";
const TITLE_TAG: &[u8] = b"title";
const ENCLOSURE_TAG: &[u8] = b"enclosure";
const DURATION_TAG: &str = "itunes:duration";

/// One feed entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    /// Human readable title
    pub title: String,
    /// Basename of the enclosure URL, unique within the feed
    pub canonical_filename: String,
    /// `itunes:duration` value, usually `HH:MM:SS`
    pub duration: Option<String>,
}

// Byte offsets of an item inside the document
#[derive(Debug, Clone)]
struct ItemLayout {
    duration_span: Option<Range<usize>>,
    close_tag_offset: usize,
}

/// Episodes of a feed document, keyed by canonical filename
#[derive(Debug, Clone)]
pub struct FeedIndex {
    document: String,
    origin: Option<PathBuf>,
    episodes: Vec<Episode>,
    layouts: Vec<ItemLayout>,
    by_filename: HashMap<String, usize>,
}

impl FeedIndex {
    /// Parse a feed document held in memory
    pub fn load(document: &str) -> Result<Self, FeedError> {
        Self::parse(document.to_string(), None)
    }

    /// Read and parse a feed file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, FeedError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(document, Some(path.to_path_buf()))
    }

    /// Find the episode whose canonical filename is the final component of `filename`
    pub fn lookup(&self, filename: &str) -> Result<&Episode, FeedError> {
        self.position(filename).map(|index| &self.episodes[index])
    }

    /// Duration recorded for an episode, if any
    pub fn duration(&self, filename: &str) -> Result<Option<&str>, FeedError> {
        Ok(self.lookup(filename)?.duration.as_deref())
    }

    /// Replace, or insert, the `itunes:duration` of an episode
    pub fn set_duration(&mut self, filename: &str, formatted_duration: &str) -> Result<(), FeedError> {
        let index = self.position(filename)?;
        let layout = &self.layouts[index];
        let element = format!("<{tag}>{}</{tag}>", escape(formatted_duration), tag = DURATION_TAG);

        let mut document = String::with_capacity(self.document.len() + element.len());
        match &layout.duration_span {
            Some(span) => {
                document.push_str(&self.document[..span.start]);
                document.push_str(&element);
                document.push_str(&self.document[span.end..]);
            }
            None => {
                document.push_str(&self.document[..layout.close_tag_offset]);
                document.push_str(&element);
                document.push_str(&self.document[layout.close_tag_offset..]);
            }
        }

        debug!("Duration of {} set to {}", self.episodes[index].canonical_filename, formatted_duration);
        *self = Self::parse(document, self.origin.clone())?;
        Ok(())
    }

    /// Write the document, including any edits, to `path`
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<(), FeedError> {
        let path = path.as_ref();
        fs::write(path, &self.document).map_err(|source| FeedError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Current document text
    pub fn to_xml(&self) -> &str {
        &self.document
    }

    /// Episodes in document order
    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    /// Number of episodes listed
    pub fn len(&self) -> usize {
        self.episodes.len()
    }

    /// True when the feed lists no episode
    pub fn is_empty(&self) -> bool {
        self.episodes.is_empty()
    }

    fn position(&self, filename: &str) -> Result<usize, FeedError> {
        let key = naming::basename(filename);
        self.by_filename
            .get(key)
            .copied()
            .ok_or_else(|| FeedError::EpisodeNotFound(key.to_string()))
    }

    fn parse(document: String, origin: Option<PathBuf>) -> Result<Self, FeedError> {
        let malformed = |message: String| FeedError::MalformedFeed {
            origin: origin
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<document>".to_string()),
            message,
        };

        let (episodes, layouts) = scan_items(&document).map_err(&malformed)?;

        let mut by_filename = HashMap::with_capacity(episodes.len());
        for (index, episode) in episodes.iter().enumerate() {
            if by_filename.insert(episode.canonical_filename.clone(), index).is_some() {
                return Err(malformed(format!(
                    "enclosure filename '{}' appears in more than one item",
                    episode.canonical_filename
                )));
            }
        }

        Ok(Self {
            document,
            origin,
            episodes,
            layouts,
            by_filename,
        })
    }
}

#[derive(Default)]
struct ItemBuilder {
    title: Option<String>,
    enclosure_url: Option<String>,
    duration: Option<String>,
    duration_start: Option<usize>,
    duration_span: Option<Range<usize>>,
}

impl ItemBuilder {
    fn finish(self, item_number: usize, close_tag_offset: usize) -> Result<(Episode, ItemLayout), String> {
        let title = self
            .title
            .ok_or_else(|| format!("item {} has no title", item_number))?;
        let url = self
            .enclosure_url
            .ok_or_else(|| format!("item {} ('{}') has no enclosure url", item_number, title))?;
        let canonical_filename = naming::canonical_filename(&url);
        if canonical_filename.is_empty() {
            return Err(format!("item {} ('{}') has an enclosure url without filename: {}", item_number, title, url));
        }

        Ok((
            Episode {
                title: title.trim().to_string(),
                canonical_filename,
                duration: self.duration.map(|d| d.trim().to_string()),
            },
            ItemLayout {
                duration_span: self.duration_span,
                close_tag_offset,
            },
        ))
    }
}

// Text capture target inside an item
enum Capture {
    None,
    Title,
    Duration,
}

fn scan_items(document: &str) -> Result<(Vec<Episode>, Vec<ItemLayout>), String> {
    let mut reader = Reader::from_str(document);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut saw_channel = false;
    let mut item: Option<ItemBuilder> = None;
    let mut capture = Capture::None;
    let mut text = String::new();
    let mut episodes = Vec::new();
    let mut layouts = Vec::new();

    loop {
        let event_start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| format!("XML error at byte {}: {}", reader.buffer_position(), e))?;
        let event_end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => {
                let name = e.name().as_ref().to_vec();
                let depth = stack.len();

                if depth == 1 && name == CHANNEL_TAG {
                    saw_channel = true;
                } else if depth == 2 && name == ITEM_TAG && stack[1] == CHANNEL_TAG {
                    item = Some(ItemBuilder::default());
                } else if depth == 3 {
                    if let Some(builder) = item.as_mut() {
                        match name.as_slice() {
                            TITLE_TAG => {
                                capture = Capture::Title;
                                text.clear();
                            }
                            ENCLOSURE_TAG => builder.enclosure_url = enclosure_url(&e)?,
                            n if n == DURATION_TAG.as_bytes() => {
                                capture = Capture::Duration;
                                builder.duration_start = Some(event_start);
                                text.clear();
                            }
                            _ => {}
                        }
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if stack.len() == 3 {
                    if let Some(builder) = item.as_mut() {
                        let name = e.name();
                        if name.as_ref() == ENCLOSURE_TAG {
                            builder.enclosure_url = enclosure_url(&e)?;
                        } else if name.as_ref() == DURATION_TAG.as_bytes() {
                            builder.duration = Some(String::new());
                            builder.duration_span = Some(event_start..event_end);
                        } else if name.as_ref() == TITLE_TAG {
                            builder.title = Some(String::new());
                        }
                    }
                }
            }
            Event::Text(t) => {
                if !matches!(capture, Capture::None) {
                    let decoded = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    text.push_str(&decoded);
                }
            }
            Event::CData(c) => {
                if !matches!(capture, Capture::None) {
                    text.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => {
                let name = e.name().as_ref().to_vec();
                stack.pop();
                let depth = stack.len();

                if depth == 3 {
                    if let Some(builder) = item.as_mut() {
                        match capture {
                            Capture::Title if name == TITLE_TAG => {
                                builder.title = Some(std::mem::take(&mut text));
                                capture = Capture::None;
                            }
                            Capture::Duration if name == DURATION_TAG.as_bytes() => {
                                builder.duration = Some(std::mem::take(&mut text));
                                builder.duration_span = builder.duration_start.map(|start| start..event_end);
                                capture = Capture::None;
                            }
                            _ => {}
                        }
                    }
                } else if depth == 2 && name == ITEM_TAG {
                    if let Some(builder) = item.take() {
                        let (episode, layout) = builder.finish(episodes.len() + 1, event_start)?;
                        episodes.push(episode);
                        layouts.push(layout);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err("document ends inside an element".to_string());
    }
    if !saw_channel {
        return Err("no <channel> element under the document root".to_string());
    }
    Ok((episodes, layouts))
}

fn enclosure_url(element: &BytesStart) -> Result<Option<String>, String> {
    let attribute = element
        .try_get_attribute("url")
        .map_err(|e| format!("invalid enclosure attribute: {}", e))?;
    match attribute {
        Some(attr) => attr
            .unescape_value()
            .map(|value| Some(value.into_owned()))
            .map_err(|e| format!("invalid enclosure url: {}", e)),
        None => Ok(None),
    }
}

/// Format a duration in seconds as `HH:MM:SS`, dropping the fraction
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}
