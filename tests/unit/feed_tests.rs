/*!
 * Tests for the feed index
 */

use anyhow::Result;
use std::fs;
use podsplit::errors::FeedError;
use podsplit::feed::FeedIndex;
use crate::common;

const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Les chroniques</title>
    <atom:link href="https://example.org/rss.xml" rel="self"/>
    <itunes:author>Radio &amp; Co</itunes:author>
    <!-- keep this comment -->
    <item>
      <title>Histoire &amp; géographie</title>
      <description><![CDATA[<p>Notes</p>]]></description>
      <enclosure url="https://cdn.example.org/ep/histoire.mp3?token=abc" length="1" type="audio/mpeg"/>
      <itunes:duration>00:41:00</itunes:duration>
    </item>
    <item>
      <title>Sciences</title>
      <enclosure url="https://cdn.example.org/ep/sciences.mp3" type="audio/mpeg"/>
    </item>
  </channel>
</rss>
"#;

/// Test that persisting an unedited feed writes the same bytes
#[test]
fn test_persist_withoutEdits_shouldRoundTripBytes() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "rss.xml", FEED)?;

    let feed = FeedIndex::open(&path)?;
    let copy = temp_dir.path().join("copy.xml");
    feed.persist(&copy)?;

    assert_eq!(fs::read_to_string(&copy)?, FEED);
    Ok(())
}

/// Test that an edit only touches the duration elements
#[test]
fn test_persist_afterEdits_shouldPreserveUnrelatedContent() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(temp_dir.path(), "rss.xml", FEED)?;

    let mut feed = FeedIndex::open(&path)?;
    feed.set_duration("histoire.mp3", "00:42:17")?;
    feed.set_duration("sciences.mp3", "01:00:00")?;
    feed.persist(&path)?;

    let expected = FEED.replace("00:41:00", "00:42:17").replace(
        "type=\"audio/mpeg\"/>\n    </item>\n  </channel>",
        "type=\"audio/mpeg\"/>\n    <itunes:duration>01:00:00</itunes:duration></item>\n  </channel>",
    );
    assert_eq!(fs::read_to_string(&path)?, expected);

    let reloaded = FeedIndex::open(&path)?;
    assert_eq!(reloaded.duration("histoire.mp3")?, Some("00:42:17"));
    assert_eq!(reloaded.duration("sciences.mp3")?, Some("01:00:00"));
    Ok(())
}

/// Test that entities are decoded and query strings ignored
#[test]
fn test_load_shouldDecodeTitlesAndCanonicalizeUrls() -> Result<()> {
    let feed = FeedIndex::load(FEED)?;

    let episode = feed.lookup("histoire.mp3")?;
    assert_eq!(episode.title, "Histoire & géographie");
    assert_eq!(episode.canonical_filename, "histoire.mp3");
    assert_eq!(feed.lookup("/var/podcasts/sciences.mp3")?.title, "Sciences");
    Ok(())
}

/// Test that unknown episodes are reported by name
#[test]
fn test_lookup_withUnknownFile_shouldFailWithEpisodeNotFound() -> Result<()> {
    let mut feed = FeedIndex::load(FEED)?;

    assert!(matches!(feed.lookup("maths.mp3"), Err(FeedError::EpisodeNotFound(ref name)) if name == "maths.mp3"));
    assert!(matches!(feed.set_duration("maths.mp3", "00:01:00"), Err(FeedError::EpisodeNotFound(_))));
    assert_eq!(feed.to_xml(), FEED);
    Ok(())
}

/// Test that broken documents are rejected with their file name
#[test]
fn test_open_withBrokenXml_shouldFailWithMalformedFeed() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "rss.xml",
        "<rss><channel><item><title>A</title></channel></rss>",
    )?;

    match FeedIndex::open(&path) {
        Err(err @ FeedError::MalformedFeed { .. }) => assert!(err.to_string().contains("rss.xml")),
        other => panic!("expected MalformedFeed, got {:?}", other.map(|f| f.len())),
    }
    Ok(())
}

/// Test that a document without channel is rejected
#[test]
fn test_load_withoutChannel_shouldFail() {
    assert!(matches!(
        FeedIndex::load("<rss><item><title>A</title></item></rss>"),
        Err(FeedError::MalformedFeed { .. })
    ));
}

/// Test that a missing file is an I/O error
#[test]
fn test_open_withMissingFile_shouldFailWithIo() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    assert!(matches!(FeedIndex::open(temp_dir.path().join("rss.xml")), Err(FeedError::Io { .. })));
    Ok(())
}
